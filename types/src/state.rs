use std::collections::BTreeMap;

use ssz::{BitList, ContiguousList};

use crate::{
    containers::{BlockHeader, ChainConfig, Checkpoint},
    preset::{HistoricalRootsLimit, JustificationBitsLimit, ValidatorRegistryLimit},
    primitives::{Slot, H256},
};

/// Per-root vote tallies, keyed ascending by root bytes. The in-memory form
/// of the flat `justifications_roots`/`justifications_validators` pair.
pub type Justifications = BTreeMap<H256, BitList<ValidatorRegistryLimit>>;

/// The replicated state. Mutated only by the state transition function; a
/// post-state is stored per block root.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct State {
    pub config: ChainConfig,
    pub slot: Slot,
    pub latest_block_header: BlockHeader,
    pub latest_justified: Checkpoint,
    pub latest_finalized: Checkpoint,
    /// One root per slot of history; zero for slots without a block.
    pub historical_block_hashes: ContiguousList<H256, HistoricalRootsLimit>,
    /// Parallel to `historical_block_hashes`.
    pub justified_slots: BitList<HistoricalRootsLimit>,
    pub justifications_roots: ContiguousList<H256, HistoricalRootsLimit>,
    /// `num_validators` bits per tracked root, in root order.
    pub justifications_validators: BitList<JustificationBitsLimit>,
}

impl State {
    /// Expands the flat justification lists into the per-root map.
    ///
    /// Panics if the flat form violates its shape invariant; states are
    /// produced only by genesis and the state transition function, which
    /// maintain it.
    #[must_use]
    pub fn justifications(&self) -> Justifications {
        let num_validators = self.validator_count();

        assert_eq!(
            self.justifications_validators.len(),
            self.justifications_roots.len() * num_validators,
            "the flat justification bits must hold num_validators bits per root",
        );

        let mut bits = self.justifications_validators.iter();

        self.justifications_roots
            .iter()
            .map(|root| {
                let mut tally = BitList::with_length(num_validators);

                for index in 0..num_validators {
                    if bits.next().expect("the bit count was checked above") {
                        tally.set(index, true);
                    }
                }

                (*root, tally)
            })
            .collect()
    }

    /// Materializes the per-root map back into the flat lists, roots in
    /// ascending byte order.
    pub fn set_justifications(&mut self, justifications: Justifications) {
        for tally in justifications.values() {
            assert_eq!(
                tally.len(),
                self.validator_count(),
                "every tally must hold one bit per validator",
            );
        }

        self.justifications_roots = ContiguousList::try_from_iter(justifications.keys().copied())
            .expect("at most one tracked root per historical slot");

        self.justifications_validators = BitList::concatenate(justifications.values())
            .expect("the flat bit list limit is the root limit times the validator limit");
    }

    #[must_use]
    pub fn validator_count(&self) -> usize {
        usize::try_from(self.config.num_validators)
            .expect("the validator registry limit fits in usize")
    }

    /// 2/3 supermajority, rounded up.
    #[must_use]
    pub fn quorum(&self) -> usize {
        (2 * self.validator_count()).div_ceil(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_validators(num_validators: u64) -> State {
        State {
            config: ChainConfig {
                num_validators,
                genesis_time: 0,
            },
            ..State::default()
        }
    }

    #[test]
    fn justifications_round_trip_through_the_flat_form() {
        let mut state = state_with_validators(3);

        let low_root = H256::repeat_byte(0x01);
        let high_root = H256::repeat_byte(0x02);

        let mut justifications = Justifications::new();

        let mut tally = BitList::with_length(3);
        tally.set(2, true);
        justifications.insert(high_root, tally);

        let mut tally = BitList::with_length(3);
        tally.set(0, true);
        tally.set(1, true);
        justifications.insert(low_root, tally);

        state.set_justifications(justifications.clone());

        assert_eq!(
            state.justifications_roots.as_ref(),
            [low_root, high_root],
            "roots must be stored in ascending byte order",
        );
        assert_eq!(state.justifications_validators.len(), 6);
        assert_eq!(state.justifications(), justifications);
    }

    #[test]
    fn quorum_is_two_thirds_rounded_up() {
        assert_eq!(state_with_validators(1).quorum(), 1);
        assert_eq!(state_with_validators(2).quorum(), 2);
        assert_eq!(state_with_validators(3).quorum(), 2);
        assert_eq!(state_with_validators(4).quorum(), 3);
        assert_eq!(state_with_validators(6).quorum(), 4);
        assert_eq!(state_with_validators(10).quorum(), 7);
    }
}
