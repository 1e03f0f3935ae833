use pqsig::Signature;
use ssz::{ContiguousList, SszHash as _};

use crate::{
    preset::ValidatorRegistryLimit,
    primitives::{Slot, ValidatorIndex, H256},
};

/// A (root, slot) pair summarizing a block as a justification or
/// finalization anchor. The genesis checkpoint is `(zero, 0)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Checkpoint {
    pub root: H256,
    pub slot: Slot,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct BlockHeader {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub body_root: H256,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct AttestationData {
    pub slot: Slot,
    pub head: Checkpoint,
    pub target: Checkpoint,
    pub source: Checkpoint,
}

/// A vote by a single validator. The signature covers
/// `hash_tree_root(data)` at epoch `data.slot`.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct SignedVote {
    pub validator_id: ValidatorIndex,
    pub data: AttestationData,
    pub signature: Signature,
}

#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct BlockBody {
    pub attestations: ContiguousList<SignedVote, ValidatorRegistryLimit>,
}

#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct Block {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub body: BlockBody,
}

impl Block {
    /// The header form installed into the state. The state root stays zero
    /// until the next `process_slot` closes it.
    #[must_use]
    pub fn to_header(&self) -> BlockHeader {
        BlockHeader {
            slot: self.slot,
            proposer_index: self.proposer_index,
            parent_root: self.parent_root,
            state_root: H256::zero(),
            body_root: self.body.hash_tree_root(),
        }
    }
}

/// A block with the proposer's signature over `hash_tree_root(message)` at
/// epoch `message.slot`.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct SignedBlock {
    pub message: Block,
    pub signature: Signature,
}

/// The chain constants embedded in (and tree-hashed with) the state.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct ChainConfig {
    pub num_validators: u64,
    pub genesis_time: u64,
}
