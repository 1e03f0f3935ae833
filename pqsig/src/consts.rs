/// Upper bound on the length of a merkle authentication path, which also
/// bounds the lifetime of a key to `2³²` epochs.
pub const LOG_LIFETIME: usize = 32;

/// Field elements in the signature randomizer. Field elements are 4 bytes.
pub const RAND_LEN_FE: usize = 7;

/// Field elements per hash digest carried in a signature.
pub const HASH_LEN_FE: usize = 8;

pub const FIELD_ELEMENT_BYTES: usize = 4;

/// 32-byte key root followed by the 20-byte public parameter.
pub const PUBLIC_KEY_BYTES: usize = 52;

pub const RAND_BYTES: usize = RAND_LEN_FE * FIELD_ELEMENT_BYTES;

/// Bytes per hash digest carried in a signature (`HASH_LEN_FE` field
/// elements), which is also the width of the randomized message digest.
pub const HASH_BYTES: usize = HASH_LEN_FE * FIELD_ELEMENT_BYTES;

pub const PARAMETER_BYTES: usize = PUBLIC_KEY_BYTES - 32;

/// Bits of the message digest consumed by one Winternitz chain.
pub(crate) const CHUNK_BITS: usize = 4;

/// Number of steps from a chain start to its end.
pub(crate) const CHAIN_LENGTH: u8 = (1 << CHUNK_BITS) - 1;

/// One chain per digest chunk.
pub(crate) const MESSAGE_CHAINS: usize = HASH_BYTES * 8 / CHUNK_BITS;

/// The checksum is at most `64 * 15`, which fits in three 4-bit chunks.
pub(crate) const CHECKSUM_CHAINS: usize = 3;

pub(crate) const NUM_CHAINS: usize = MESSAGE_CHAINS + CHECKSUM_CHAINS;
