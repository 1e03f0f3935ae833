//! Merkleization over chunks with zero-subtree padding.
//!
//! A collection with limit `L` merkleizes as a balanced binary tree of
//! depth `⌈log₂(chunk count of L)⌉` whose missing subtrees are zero
//! subtrees. Lists and bit lists then mix their length into the root.

use ethereum_types::H256;
use hashing::ZERO_HASHES;

use crate::consts::BYTES_PER_CHUNK;

/// `⌈log₂(limit)⌉` for a collection of `limit` composite elements.
#[must_use]
pub const fn depth_for_elements(limit: u64) -> usize {
    ceil_log2(limit)
}

/// Depth of the chunk tree backing a bit list with `limit` bits.
#[must_use]
pub const fn depth_for_bits(limit: u64) -> usize {
    ceil_log2(limit.div_ceil(BYTES_PER_CHUNK as u64 * 8))
}

/// Depth of the chunk tree backing a byte vector of `length` bytes.
#[must_use]
pub const fn depth_for_bytes(length: u64) -> usize {
    ceil_log2(length.div_ceil(BYTES_PER_CHUNK as u64))
}

const fn ceil_log2(value: u64) -> usize {
    if value <= 1 {
        0
    } else {
        (u64::BITS - (value - 1).leading_zeros()) as usize
    }
}

#[must_use]
pub fn mix_in_length(root: H256, length: usize) -> H256 {
    let mut length_chunk = H256::zero();
    length_chunk.as_bytes_mut()[..8].copy_from_slice(&(length as u64).to_le_bytes());
    hashing::hash_256_256(root, length_chunk)
}

/// Root of the balanced tree of the given depth over `chunks`, right-padded
/// with zero subtrees. Empty input yields `ZERO_HASHES[depth]`.
#[must_use]
pub fn merkleize_chunks(chunks: impl IntoIterator<Item = H256>, depth: usize) -> H256 {
    let mut layer = chunks.into_iter().collect::<Vec<_>>();

    assert!(
        depth < ZERO_HASHES.len(),
        "no container in the protocol merkleizes deeper than the zero hash table",
    );
    assert!(
        depth >= usize::BITS as usize || layer.len() <= 1 << depth,
        "chunk count {} exceeds tree of depth {depth}",
        layer.len(),
    );

    if layer.is_empty() {
        return ZERO_HASHES[depth];
    }

    for height in 0..depth {
        layer = layer
            .chunks(2)
            .map(|pair| {
                let left = pair[0];
                let right = pair.get(1).copied().unwrap_or(ZERO_HASHES[height]);
                hashing::hash_256_256(left, right)
            })
            .collect();
    }

    layer[0]
}

/// Packs `bytes` into zero-padded chunks and merkleizes them.
#[must_use]
pub fn merkleize_bytes(bytes: impl AsRef<[u8]>, depth: usize) -> H256 {
    let chunks = bytes.as_ref().chunks(BYTES_PER_CHUNK).map(|partial_chunk| {
        let mut chunk = H256::zero();
        chunk.as_bytes_mut()[..partial_chunk.len()].copy_from_slice(partial_chunk);
        chunk
    });

    merkleize_chunks(chunks, depth)
}

/// Root of a container: its field roots in a balanced tree of the minimal depth.
#[must_use]
pub fn merkleize_container<const FIELDS: usize>(field_roots: [H256; FIELDS]) -> H256 {
    merkleize_chunks(field_roots, depth_for_elements(FIELDS as u64))
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn depths_match_chunk_counts() {
        assert_eq!(depth_for_elements(1), 0);
        assert_eq!(depth_for_elements(2), 1);
        assert_eq!(depth_for_elements(5), 3);
        assert_eq!(depth_for_elements(1 << 18), 18);
        assert_eq!(depth_for_bits(4096), 4);
        assert_eq!(depth_for_bits(1 << 30), 22);
        assert_eq!(depth_for_bits(1 << 18), 10);
        assert_eq!(depth_for_bytes(28), 0);
        assert_eq!(depth_for_bytes(52), 1);
    }

    #[test]
    fn empty_input_merkleizes_to_zero_subtree() {
        assert_eq!(merkleize_chunks([], 0), ZERO_HASHES[0]);
        assert_eq!(merkleize_chunks([], 10), ZERO_HASHES[10]);
    }

    #[test]
    fn single_chunk_at_depth_zero_is_itself() {
        let chunk = H256(hex!(
            "2a00000000000000000000000000000000000000000000000000000000000000"
        ));
        assert_eq!(merkleize_chunks([chunk], 0), chunk);
    }

    #[test]
    fn odd_chunk_counts_pad_with_zero_subtrees() {
        let chunk = H256::repeat_byte(0x11);

        let expected = hashing::hash_256_256(
            hashing::hash_256_256(chunk, chunk),
            hashing::hash_256_256(chunk, ZERO_HASHES[0]),
        );

        assert_eq!(merkleize_chunks([chunk, chunk, chunk], 2), expected);
    }

    #[test]
    fn mix_in_length_hashes_little_endian_length() {
        let root = H256::repeat_byte(0xab);
        let mut length_chunk = H256::zero();
        length_chunk.as_bytes_mut()[0] = 3;

        assert_eq!(
            mix_in_length(root, 3),
            hashing::hash_256_256(root, length_chunk),
        );
    }
}
