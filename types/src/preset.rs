//! Type-level collection limits shared by every preset.
//!
//! Unlike the beacon chain, the lean protocol fixes its registry and history
//! limits; presets only vary timing (see [`crate::config::Config`]).

use typenum::{Prod, U131072, U262144, U4096};

/// 2¹⁸ slots of block history.
pub type HistoricalRootsLimit = U262144;

/// 2¹² validators.
pub type ValidatorRegistryLimit = U4096;

/// The flat justification bit list holds `num_validators` bits per tracked
/// root, so its limit is the product of the other two.
pub type JustificationBitsLimit = Prod<HistoricalRootsLimit, ValidatorRegistryLimit>;

/// 2¹⁷ fork-choice nodes.
pub type NodeListLimit = U131072;
