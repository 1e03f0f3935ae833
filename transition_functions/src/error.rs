use thiserror::Error;

use helper_functions::error::SignatureKind;
use types::primitives::{Slot, ValidatorIndex, H256};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("target slot {target} precedes pre-state slot {current}")]
    InvalidPreState { current: Slot, target: Slot },
    #[error("block at slot {block_slot} is not newer than the latest block header at slot {header_slot}")]
    InvalidLatestBlockHeader { header_slot: Slot, block_slot: Slot },
    #[error("proposer index is incorrect (in_block: {in_block}, computed: {computed})")]
    InvalidProposer {
        computed: ValidatorIndex,
        in_block: ValidatorIndex,
    },
    #[error("block parent root ({in_block:?}) does not match the latest block header ({computed:?})")]
    InvalidParentRoot { computed: H256, in_block: H256 },
    #[error("state root in block ({in_block:?}) does not match the computed post-state ({computed:?})")]
    InvalidPostState { computed: H256, in_block: H256 },
    #[error("justification candidate slot {candidate} precedes finalized slot {finalized}")]
    InvalidJustifiableSlot { finalized: Slot, candidate: Slot },
    #[error("validator {validator_id} is out of range for a registry of {num_validators}")]
    InvalidValidatorId {
        validator_id: ValidatorIndex,
        num_validators: u64,
    },
    #[error("{kind} signature by validator {validator_id} is invalid")]
    InvalidBlockSignatures {
        kind: SignatureKind,
        validator_id: ValidatorIndex,
    },
}
