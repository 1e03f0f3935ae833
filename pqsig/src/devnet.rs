//! Deterministic key material for coordinated devnet starts, in the spirit
//! of the interop mocked-start rules: every validator index maps to a fixed
//! seed, so all nodes derive the same genesis pubkeys without exchanging
//! any key material.

use ethereum_types::H256;
use sha2::{Digest as _, Sha256};

use crate::{error::Error, public_key_bytes::PublicKeyBytes, secret_key::SecretKey};

/// Epochs covered by a devnet key. 2¹⁰ slots outlives any devnet run while
/// keeping key generation instant.
pub const DEVNET_ACTIVE_EPOCHS: u32 = 1 << 10;

#[must_use]
pub fn seed(validator_index: u64) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update(b"leanode-validator");
    hasher.update(validator_index.to_le_bytes());
    H256::from_slice(hasher.finalize().as_slice())
}

pub fn secret_key(validator_index: u64) -> Result<SecretKey, Error> {
    SecretKey::generate(seed(validator_index), 0, DEVNET_ACTIVE_EPOCHS)
}

pub fn public_key(validator_index: u64) -> Result<PublicKeyBytes, Error> {
    secret_key(validator_index).map(|secret_key| secret_key.to_public_key())
}
