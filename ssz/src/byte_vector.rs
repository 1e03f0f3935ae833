use ethereum_types::H256;
use generic_array::{ArrayLength, GenericArray};
use typenum::U1;

use crate::{
    error::ReadError,
    merkle,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// A fixed-length SSZ byte vector.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct ByteVector<N: ArrayLength<u8>> {
    bytes: GenericArray<u8, N>,
}

impl<N: ArrayLength<u8>> AsRef<[u8]> for ByteVector<N> {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<N: ArrayLength<u8>> From<GenericArray<u8, N>> for ByteVector<N> {
    fn from(bytes: GenericArray<u8, N>) -> Self {
        Self { bytes }
    }
}

impl<N: ArrayLength<u8>> TryFrom<&[u8]> for ByteVector<N> {
    type Error = ReadError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        if slice.len() != N::USIZE {
            return Err(ReadError::FixedSizeMismatch {
                expected: N::USIZE,
                actual: slice.len(),
            });
        }

        Ok(Self {
            bytes: GenericArray::clone_from_slice(slice),
        })
    }
}

impl<N: ArrayLength<u8>> SszSize for ByteVector<N> {
    const SIZE: Size = Size::Fixed { size: N::USIZE };
}

impl<N: ArrayLength<u8>> SszRead for ByteVector<N> {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Self {
            bytes: GenericArray::clone_from_slice(bytes),
        })
    }
}

impl<N: ArrayLength<u8>> SszWrite for ByteVector<N> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(&self.bytes);
    }
}

impl<N: ArrayLength<u8>> SszHash for ByteVector<N> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        merkle::merkleize_bytes(&self.bytes, merkle::depth_for_bytes(N::U64))
    }
}

impl<N: ArrayLength<u8>> ByteVector<N> {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}
