//! Signing roots and epochs.
//!
//! The lean protocol has no signing domains: messages sign over their plain
//! tree-hash root, and the signature epoch is the slot the message belongs
//! to (block slot for blocks, vote slot for votes).

use ssz::SszHash as _;
use types::{
    containers::{AttestationData, Block},
    primitives::{SignatureEpoch, Slot, H256},
};

use crate::error::Error;

pub fn signature_epoch(slot: Slot) -> Result<SignatureEpoch, Error> {
    slot.try_into().map_err(|_| Error::SlotNotAnEpoch { slot })
}

#[must_use]
pub fn block_signing_root(block: &Block) -> H256 {
    block.hash_tree_root()
}

#[must_use]
pub fn vote_signing_root(data: &AttestationData) -> H256 {
    data.hash_tree_root()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epochs_are_slots_that_fit_in_32_bits() {
        assert_eq!(signature_epoch(0), Ok(0));
        assert_eq!(signature_epoch(u64::from(u32::MAX)), Ok(u32::MAX));
        assert_eq!(
            signature_epoch(u64::from(u32::MAX) + 1),
            Err(Error::SlotNotAnEpoch {
                slot: u64::from(u32::MAX) + 1,
            }),
        );
    }
}
