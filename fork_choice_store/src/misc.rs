use types::{
    containers::Checkpoint,
    primitives::{Slot, H256},
};

/// The lightweight fork-choice view of a block. Created on insertion and
/// never mutated; full blocks and states stay in storage.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ProtoBlock {
    pub slot: Slot,
    pub block_root: H256,
    pub parent_root: H256,
    pub state_root: H256,
    /// Whether the block arrived before the attest-interval deadline of its
    /// own slot. Votes cast in that slot only count for timely blocks.
    pub timely: bool,
}

/// The latest vote known from a validator. Replaced only when a newer vote
/// has a strictly higher target slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct VoteRecord {
    /// The head the validator attested to.
    pub head: Checkpoint,
    pub target_slot: Slot,
    /// The slot the vote was cast in, for the timeliness rule.
    pub slot: Slot,
}
