use helper_functions::misc;
use ssz::SszHash as _;
use types::{
    consts::ZERO_HASH,
    containers::{Block, Checkpoint, SignedVote},
    primitives::Slot,
    state::State,
};

use crate::error::Error;

pub fn process_block(state: &mut State, block: &Block) -> Result<(), Error> {
    process_block_header(state, block)?;
    process_attestations(state, &block.body.attestations, block.slot)?;
    Ok(())
}

fn process_block_header(state: &mut State, block: &Block) -> Result<(), Error> {
    // `state_transition` advances the state first, so a mismatch here means
    // the block is older than the state.
    if block.slot != state.slot {
        return Err(Error::InvalidPreState {
            current: state.slot,
            target: block.slot,
        });
    }

    if state.latest_block_header.slot >= block.slot {
        return Err(Error::InvalidLatestBlockHeader {
            header_slot: state.latest_block_header.slot,
            block_slot: block.slot,
        });
    }

    let computed = misc::proposer_index(state.config.num_validators, block.slot);

    if block.proposer_index != computed {
        return Err(Error::InvalidProposer {
            computed,
            in_block: block.proposer_index,
        });
    }

    let parent_root = state.latest_block_header.hash_tree_root();

    if block.parent_root != parent_root {
        return Err(Error::InvalidParentRoot {
            computed: parent_root,
            in_block: block.parent_root,
        });
    }

    // > Track the parent in history. The genesis block is justified by
    // > definition; everything else starts out unjustified.
    let parent_is_genesis = state.latest_block_header.slot == 0;

    state
        .historical_block_hashes
        .push(block.parent_root)
        .expect("the history limit exceeds any reachable slot");
    state
        .justified_slots
        .push(parent_is_genesis)
        .expect("the history limit exceeds any reachable slot");

    // > The genesis checkpoints carry a zero root placeholder until the
    // > first child reveals the genesis block root.
    if parent_is_genesis {
        let genesis = Checkpoint {
            root: block.parent_root,
            slot: 0,
        };

        state.latest_justified = genesis;
        state.latest_finalized = genesis;
    }

    // > Backfill zero roots for the skipped slots.
    for _ in state.latest_block_header.slot + 1..block.slot {
        state
            .historical_block_hashes
            .push(ZERO_HASH)
            .expect("the history limit exceeds any reachable slot");
        state
            .justified_slots
            .push(false)
            .expect("the history limit exceeds any reachable slot");
    }

    state.latest_block_header = block.to_header();

    Ok(())
}

/// Applies the votes carried in a block included at `inclusion_slot`.
///
/// Votes that do not chain from the latest justified checkpoint, name an
/// unjustifiable or unknown target, or arrive out of order are skipped
/// silently; only a structurally invalid validator id fails the block.
pub fn process_attestations(
    state: &mut State,
    attestations: &[SignedVote],
    inclusion_slot: Slot,
) -> Result<(), Error> {
    let num_validators = state.config.num_validators;
    let quorum = state.quorum();

    let mut justifications = state.justifications();
    let mut changed = false;

    for vote in attestations {
        let data = vote.data;

        if vote.validator_id >= num_validators {
            return Err(Error::InvalidValidatorId {
                validator_id: vote.validator_id,
                num_validators,
            });
        }

        // > Justifications always chain from the latest justified checkpoint.
        if data.source != state.latest_justified {
            continue;
        }

        // > The target must be a known historical block at a justifiable
        // > slot strictly after the source and not after the including block.
        let justifiable = misc::is_justifiable_slot(state.latest_finalized.slot, data.target.slot)
            .unwrap_or(false);

        let target_slot = usize::try_from(data.target.slot)
            .expect("the history limit bounds slots well below usize::MAX");

        if !justifiable
            || data.target.slot > inclusion_slot
            || data.source.slot >= data.target.slot
            || target_slot >= state.historical_block_hashes.len()
            || state.historical_block_hashes[target_slot] != data.target.root
            || state.justified_slots.get(target_slot)
        {
            continue;
        }

        let tally = justifications
            .entry(data.target.root)
            .or_insert_with(|| ssz::BitList::with_length(state.validator_count()));

        let validator_bit = usize::try_from(vote.validator_id)
            .expect("the registry limit bounds validator ids well below usize::MAX");

        if tally.get(validator_bit) {
            continue;
        }

        tally.set(validator_bit, true);
        changed = true;

        // > A 2/3 supermajority justifies the target; the tally is retired.
        if tally.count_ones() >= quorum {
            justifications.remove(&data.target.root);

            state.latest_justified = data.target;
            state.justified_slots.set(target_slot, true);

            // > The source finalizes when the target is the next justifiable
            // > slot after it.
            let any_justifiable_between = (data.source.slot + 1..data.target.slot).any(|slot| {
                misc::is_justifiable_slot(state.latest_finalized.slot, slot).unwrap_or(false)
            });

            if !any_justifiable_between {
                state.latest_finalized = data.source;
            }
        }
    }

    if changed {
        state.set_justifications(justifications);
    }

    Ok(())
}
