pub use crate::{
    block_processing::{process_attestations, process_block},
    error::Error,
    slot_processing::process_slots,
    state_transition::{process_block_for_proposal, state_transition, StateRootPolicy},
};

mod block_processing;
mod error;
mod slot_processing;
mod state_transition;
