use helper_functions::{
    error::SignatureKind,
    signing::{self, block_signing_root, vote_signing_root},
};
use pqsig::PublicKeyBytes;
use ssz::SszHash as _;
use types::{
    containers::{Block, SignedBlock},
    state::State,
};

use crate::{block_processing, error::Error, slot_processing};

/// Whether to compare the computed post-state root against the one the
/// block carries. Locally built blocks are trusted; everything else is
/// verified.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StateRootPolicy {
    Verify,
    Trust,
}

impl StateRootPolicy {
    fn verify(self, state: &State, block: &Block) -> Result<(), Error> {
        if self == Self::Verify {
            let computed = state.hash_tree_root();

            if computed != block.state_root {
                return Err(Error::InvalidPostState {
                    computed,
                    in_block: block.state_root,
                });
            }
        }

        Ok(())
    }
}

/// The state transition function: advances `state` to the block's slot and
/// applies the block.
///
/// `validator_pubkeys` enables signature verification; `None` trusts the
/// caller to have verified (or produced) the signatures.
pub fn state_transition(
    state: &mut State,
    signed_block: &SignedBlock,
    validator_pubkeys: Option<&[PublicKeyBytes]>,
    state_root_policy: StateRootPolicy,
) -> Result<(), Error> {
    let block = &signed_block.message;

    if let Some(pubkeys) = validator_pubkeys {
        verify_signatures(signed_block, pubkeys)?;
    }

    // > Process slots (including those with no blocks) since the block.
    if state.slot < block.slot {
        slot_processing::process_slots(state, block.slot)?;
    }

    block_processing::process_block(state, block)?;

    state_root_policy.verify(state, block)
}

/// Applies a locally built block and writes the computed post-state root
/// back into it, completing the proposal.
pub fn process_block_for_proposal(state: &mut State, block: &mut Block) -> Result<(), Error> {
    if state.slot < block.slot {
        slot_processing::process_slots(state, block.slot)?;
    }

    block_processing::process_block(state, block)?;

    block.state_root = state.hash_tree_root();

    Ok(())
}

pub fn verify_signatures(
    signed_block: &SignedBlock,
    validator_pubkeys: &[PublicKeyBytes],
) -> Result<(), Error> {
    let block = &signed_block.message;
    let num_validators = validator_pubkeys.len() as u64;

    let proposer_pubkey = validator_pubkeys
        .get(usize::try_from(block.proposer_index).unwrap_or(usize::MAX))
        .ok_or(Error::InvalidValidatorId {
            validator_id: block.proposer_index,
            num_validators,
        })?;

    let epoch = signing::signature_epoch(block.slot).map_err(|_| Error::InvalidBlockSignatures {
        kind: SignatureKind::Block,
        validator_id: block.proposer_index,
    })?;

    proposer_pubkey
        .verify(block_signing_root(block), epoch, &signed_block.signature)
        .map_err(|_| Error::InvalidBlockSignatures {
            kind: SignatureKind::Block,
            validator_id: block.proposer_index,
        })?;

    for vote in block.body.attestations.iter() {
        let pubkey = validator_pubkeys
            .get(usize::try_from(vote.validator_id).unwrap_or(usize::MAX))
            .ok_or(Error::InvalidValidatorId {
                validator_id: vote.validator_id,
                num_validators,
            })?;

        let epoch =
            signing::signature_epoch(vote.data.slot).map_err(|_| Error::InvalidBlockSignatures {
                kind: SignatureKind::Vote,
                validator_id: vote.validator_id,
            })?;

        pubkey
            .verify(vote_signing_root(&vote.data), epoch, &vote.signature)
            .map_err(|_| Error::InvalidBlockSignatures {
                kind: SignatureKind::Vote,
                validator_id: vote.validator_id,
            })?;
    }

    Ok(())
}
