//! Winternitz chain arithmetic shared by key generation, signing and
//! verification. Chains are tweaked by the public parameter, the epoch, the
//! chain index and the step index; the signature randomizer `rho` enters
//! only the message encoding, so chain ends are message-independent and the
//! per-epoch leaves can be precomputed at key generation.

use ethereum_types::H256;
use sha2::{Digest as _, Sha256};

use crate::consts::{
    CHAIN_LENGTH, CHECKSUM_CHAINS, CHUNK_BITS, HASH_BYTES, MESSAGE_CHAINS, NUM_CHAINS,
    PARAMETER_BYTES, RAND_BYTES,
};

/// Maps a randomized message digest to one step count per chain. Message
/// chunks are followed by the chunks of the Winternitz checksum; every value
/// is in `0..=CHAIN_LENGTH`.
pub fn digest_steps(rho: &[u8; RAND_BYTES], message_root: H256) -> [u8; NUM_CHAINS] {
    let mut hasher = Sha256::new();
    hasher.update(rho);
    hasher.update(message_root.as_bytes());
    let digest = hasher.finalize();

    debug_assert_eq!(digest.len(), HASH_BYTES);

    let mut steps = [0; NUM_CHAINS];

    for (index, byte) in digest.iter().enumerate() {
        steps[2 * index] = byte >> CHUNK_BITS;
        steps[2 * index + 1] = byte & CHAIN_LENGTH;
    }

    let checksum: u16 = steps[..MESSAGE_CHAINS]
        .iter()
        .map(|step| u16::from(CHAIN_LENGTH - step))
        .sum();

    for index in 0..CHECKSUM_CHAINS {
        steps[MESSAGE_CHAINS + index] = (checksum >> (CHUNK_BITS * index)) as u8 & CHAIN_LENGTH;
    }

    steps
}

/// One tweakable chain step. Parameter, epoch, chain index and step index
/// are all bound into the hash so no two positions in the whole scheme share
/// a compression function input.
pub fn chain_step(
    parameter: &[u8; PARAMETER_BYTES],
    epoch: u32,
    chain: usize,
    step: u8,
    value: H256,
) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update(parameter);
    hasher.update(epoch.to_le_bytes());
    hasher.update((chain as u32).to_le_bytes());
    hasher.update([step]);
    hasher.update(value.as_bytes());
    H256::from_slice(hasher.finalize().as_slice())
}

/// Advances `value` along chain `chain` from step `from` (exclusive) to
/// step `to` (inclusive).
pub fn advance_chain(
    parameter: &[u8; PARAMETER_BYTES],
    epoch: u32,
    chain: usize,
    from: u8,
    to: u8,
    mut value: H256,
) -> H256 {
    for step in from + 1..=to {
        value = chain_step(parameter, epoch, chain, step, value);
    }

    value
}

/// Hashes the chain ends into the one-time public key for an epoch.
pub fn leaf_hash(parameter: &[u8; PARAMETER_BYTES], epoch: u32, chain_ends: &[H256]) -> H256 {
    debug_assert_eq!(chain_ends.len(), NUM_CHAINS);

    let mut hasher = Sha256::new();
    hasher.update(parameter);
    hasher.update(b"leaf");
    hasher.update(epoch.to_le_bytes());

    for end in chain_ends {
        hasher.update(end.as_bytes());
    }

    H256::from_slice(hasher.finalize().as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_steps_include_a_consistent_checksum() {
        let steps = digest_steps(&[0; RAND_BYTES], H256::zero());

        let checksum: u16 = steps[..MESSAGE_CHAINS]
            .iter()
            .map(|step| u16::from(CHAIN_LENGTH - step))
            .sum();

        let encoded = u16::from(steps[MESSAGE_CHAINS])
            | u16::from(steps[MESSAGE_CHAINS + 1]) << CHUNK_BITS
            | u16::from(steps[MESSAGE_CHAINS + 2]) << (2 * CHUNK_BITS);

        assert_eq!(encoded, checksum);
    }

    #[test]
    fn advance_chain_composes() {
        let parameter = [7; PARAMETER_BYTES];
        let start = H256::repeat_byte(0x55);

        let direct = advance_chain(&parameter, 3, 1, 0, CHAIN_LENGTH, start);
        let first = advance_chain(&parameter, 3, 1, 0, 6, start);
        let second = advance_chain(&parameter, 3, 1, 6, CHAIN_LENGTH, first);

        assert_eq!(direct, second);
    }
}
