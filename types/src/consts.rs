use ethereum_types::H256;

use crate::primitives::Slot;

pub const GENESIS_SLOT: Slot = 0;

/// Propose, attest, aggregate.
pub const INTERVALS_PER_SLOT: u64 = 3;

pub const ZERO_HASH: H256 = H256::zero();
