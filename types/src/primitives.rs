pub use ethereum_types::H256;

pub type Slot = u64;
pub type ValidatorIndex = u64;
pub type UnixSeconds = u64;

/// Signing epochs are bound 1-to-1 with slots but the signature scheme
/// indexes them as `u32` (`LOG_LIFETIME` is 32).
pub type SignatureEpoch = u32;
