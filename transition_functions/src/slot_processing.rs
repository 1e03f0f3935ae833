use ssz::SszHash as _;
use types::{primitives::Slot, state::State};

use crate::error::Error;

/// Advances the state to `target_slot` without applying a block.
///
/// A target equal to the current slot is a no-op; a target in the past is
/// an [`Error::InvalidPreState`].
pub fn process_slots(state: &mut State, target_slot: Slot) -> Result<(), Error> {
    if target_slot < state.slot {
        return Err(Error::InvalidPreState {
            current: state.slot,
            target: target_slot,
        });
    }

    while state.slot < target_slot {
        process_slot(state);
        state.slot += 1;
    }

    Ok(())
}

fn process_slot(state: &mut State) {
    // > Cache the previous block's state root once it is known.
    //
    // The root is computed with the header's state root still zeroed, which
    // is what closes the previous block's header.
    if state.latest_block_header.state_root.is_zero() {
        state.latest_block_header.state_root = state.hash_tree_root();
    }
}
