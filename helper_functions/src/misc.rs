use types::primitives::{Slot, ValidatorIndex};

use crate::error::Error;

/// Proposers rotate round-robin.
#[must_use]
pub const fn proposer_index(num_validators: u64, slot: Slot) -> ValidatorIndex {
    slot % num_validators
}

#[must_use]
pub const fn is_proposer(validator_index: ValidatorIndex, num_validators: u64, slot: Slot) -> bool {
    proposer_index(num_validators, slot) == validator_index
}

/// Whether `candidate` may serve as a justification target given the current
/// finalized slot.
///
/// With `Δ = candidate - finalized`, the eligible offsets are `Δ ≤ 5`, the
/// perfect squares and the pronic numbers `k·(k+1)`. The reference phrases
/// the last two through floating-point square roots (`√Δ` integral,
/// `√(Δ + 0.25)` with fractional part one half); integer square roots give
/// the same predicate for every non-negative `Δ` without rounding hazards.
pub const fn is_justifiable_slot(finalized: Slot, candidate: Slot) -> Result<bool, Error> {
    if candidate < finalized {
        return Err(Error::CandidateBeforeFinalized {
            finalized,
            candidate,
        });
    }

    let delta = candidate - finalized;
    let root = integer_square_root(delta);

    Ok(delta <= 5 || root * root == delta || root * (root + 1) == delta)
}

/// The greatest justifiable slot at or below `upper_bound`.
///
/// Always defined when `upper_bound ≥ finalized`: the finalized slot itself
/// is justifiable (`Δ = 0`).
pub fn latest_justifiable_slot(finalized: Slot, upper_bound: Slot) -> Result<Slot, Error> {
    let mut candidate = upper_bound;

    loop {
        if is_justifiable_slot(finalized, candidate)? {
            return Ok(candidate);
        }

        candidate -= 1;
    }
}

const fn integer_square_root(value: u64) -> u64 {
    if value == 0 {
        return 0;
    }

    let mut x = value;
    let mut y = (x + 1) / 2;

    while y < x {
        x = y;
        y = (x + value / x) / 2;
    }

    x
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn proposers_rotate_round_robin() {
        assert_eq!(proposer_index(2, 0), 0);
        assert_eq!(proposer_index(2, 1), 1);
        assert_eq!(proposer_index(2, 2), 0);
        assert_eq!(proposer_index(3, 7), 1);

        assert!(is_proposer(1, 2, 1));
        assert!(!is_proposer(0, 2, 1));
    }

    // Boundary cases called out by the protocol.
    #[test_case(10, 10 => true; "zero delta is justifiable")]
    #[test_case(0, 9 => true; "perfect square")]
    #[test_case(0, 7 => false; "seven is neither small nor square nor pronic")]
    #[test_case(0, 6 => true; "pronic")]
    #[test_case(5, 10 => true; "delta five")]
    #[test_case(5, 11 => true; "pronic relative to finalized")]
    #[test_case(5, 12 => false; "delta seven relative to finalized")]
    fn justifiable_slot_boundaries(finalized: Slot, candidate: Slot) -> bool {
        is_justifiable_slot(finalized, candidate).expect("candidate is not before finalized")
    }

    #[test]
    fn candidates_before_finalized_are_rejected() {
        assert_eq!(
            is_justifiable_slot(10, 9),
            Err(Error::CandidateBeforeFinalized {
                finalized: 10,
                candidate: 9,
            }),
        );
    }

    /// The full table for `Δ ∈ 0..=100`: small deltas, perfect squares and
    /// pronic numbers.
    #[test]
    fn justifiable_deltas_up_to_one_hundred() {
        let expected = [
            0, 1, 2, 3, 4, 5, // Δ ≤ 5
            6, 12, 20, 30, 42, 56, 72, 90, // k·(k+1)
            9, 16, 25, 36, 49, 64, 81, 100, // k²
        ];

        for delta in 0..=100 {
            assert_eq!(
                is_justifiable_slot(0, delta).expect("deltas are non-negative"),
                expected.contains(&delta),
                "disagreement at delta {delta}",
            );
        }
    }

    #[test]
    fn integer_square_root_agrees_with_floating_point() {
        for value in 0..10_000 {
            assert_eq!(integer_square_root(value), (value as f64).sqrt() as u64);
        }
    }

    #[test]
    fn latest_justifiable_slot_walks_down_to_an_eligible_slot() {
        assert_eq!(latest_justifiable_slot(0, 7).expect("bound is above finalized"), 6);
        assert_eq!(latest_justifiable_slot(0, 9).expect("bound is above finalized"), 9);
        assert_eq!(latest_justifiable_slot(3, 3).expect("bound is above finalized"), 3);
        assert_eq!(latest_justifiable_slot(0, 11).expect("bound is above finalized"), 9);
    }
}
