use ethereum_types::H256;
use typenum::{U128, U28, U32};

use ssz::{
    merkleize_container, read_offset, subslice, write_offset, ByteVector, ContiguousList,
    ReadError, Size, SszHash, SszRead, SszSize, SszWrite, WriteError, BYTES_PER_LENGTH_OFFSET,
};

use crate::{
    chains,
    consts::{CHAIN_LENGTH, LOG_LIFETIME, NUM_CHAINS, RAND_BYTES},
    error::Error,
    public_key_bytes::PublicKeyBytes,
};

/// Maximum number of merkle authentication path nodes.
pub type AuthPathDepth = U32;

/// Upper bound on the number of hash chains a signature carries.
pub type MaxHashChains = U128;

// The path limit is the key lifetime exponent, and every signature's chain
// list must fit under its limit.
const _: () = assert!(<AuthPathDepth as typenum::Unsigned>::USIZE == LOG_LIFETIME);
const _: () = assert!(NUM_CHAINS <= <MaxHashChains as typenum::Unsigned>::USIZE);

/// The composite signature container. Its tree-hash root is the container
/// root over the three fields, never a hash of the flat encoding.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct Signature {
    pub auth_path: ContiguousList<H256, AuthPathDepth>,
    pub rho: ByteVector<U28>,
    pub hashes: ContiguousList<H256, MaxHashChains>,
}

// auth_path offset + rho + hashes offset
const FIXED_PART: usize = BYTES_PER_LENGTH_OFFSET + RAND_BYTES + BYTES_PER_LENGTH_OFFSET;

impl SszSize for Signature {
    const SIZE: Size = Size::Variable {
        minimum_size: FIXED_PART,
    };
}

impl SszRead for Signature {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        let auth_path_offset = read_offset(bytes, 0)?;
        let rho = ByteVector::from_ssz(subslice(bytes, 4..4 + RAND_BYTES)?)?;
        let hashes_offset = read_offset(bytes, 4 + RAND_BYTES)?;

        if auth_path_offset != FIXED_PART {
            return Err(ReadError::ContainerFirstOffsetMismatch {
                expected: FIXED_PART,
                actual: auth_path_offset,
            });
        }

        if hashes_offset < auth_path_offset {
            return Err(ReadError::OffsetsNotIncreasing {
                previous: auth_path_offset,
                next: hashes_offset,
            });
        }

        let auth_path = ContiguousList::from_ssz(subslice(bytes, auth_path_offset..hashes_offset)?)?;
        let hashes = ContiguousList::from_ssz(subslice(bytes, hashes_offset..bytes.len())?)?;

        Ok(Self {
            auth_path,
            rho,
            hashes,
        })
    }
}

impl SszWrite for Signature {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        let length_before = bytes.len();

        bytes.resize(length_before + FIXED_PART, 0);

        let offset = bytes.len() - length_before;
        write_offset(bytes, length_before, offset)?;
        self.auth_path.write_variable(bytes)?;

        self.rho
            .write_fixed(&mut bytes[length_before + 4..length_before + 4 + RAND_BYTES]);

        let offset = bytes.len() - length_before;
        write_offset(bytes, length_before + 4 + RAND_BYTES, offset)?;
        self.hashes.write_variable(bytes)?;

        Ok(())
    }
}

impl SszHash for Signature {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        merkleize_container([
            self.auth_path.hash_tree_root(),
            self.rho.hash_tree_root(),
            self.hashes.hash_tree_root(),
        ])
    }
}

impl Signature {
    pub(crate) fn verify_against(
        &self,
        public_key: PublicKeyBytes,
        message_root: H256,
        epoch: u32,
    ) -> Result<(), Error> {
        if self.hashes.len() != NUM_CHAINS {
            return Err(Error::WrongChainCount {
                expected: NUM_CHAINS,
                actual: self.hashes.len(),
            });
        }

        let parameter = public_key.parameter();
        let rho = rho_array(&self.rho);
        let steps = chains::digest_steps(&rho, message_root);

        let chain_ends = self
            .hashes
            .iter()
            .zip(steps)
            .enumerate()
            .map(|(chain, (value, step))| {
                chains::advance_chain(&parameter, epoch, chain, step, CHAIN_LENGTH, *value)
            })
            .collect::<Vec<_>>();

        let mut node = chains::leaf_hash(&parameter, epoch, &chain_ends);
        let mut index = epoch;

        for sibling in self.auth_path.iter() {
            node = if index & 1 == 0 {
                hashing::hash_256_256(node, *sibling)
            } else {
                hashing::hash_256_256(*sibling, node)
            };
            index >>= 1;
        }

        if node != public_key.root() {
            return Err(Error::RootMismatch);
        }

        Ok(())
    }
}

pub(crate) fn rho_array(rho: &ByteVector<U28>) -> [u8; RAND_BYTES] {
    rho.as_bytes()
        .try_into()
        .expect("the randomizer is always 28 bytes")
}
