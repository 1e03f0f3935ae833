use byteorder::ByteOrder as _;
use ethereum_types::H256;
use typenum::{U1, U32, U4, U8};

use crate::{
    consts::Endianness,
    error::ReadError,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

impl SszSize for bool {
    const SIZE: Size = Size::Fixed { size: 1 };
}

impl SszRead for bool {
    #[inline]
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        match bytes[0] {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(ReadError::BooleanInvalid { value }),
        }
    }
}

impl SszWrite for bool {
    #[inline]
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes[0] = (*self).into();
    }
}

impl SszHash for bool {
    type PackingFactor = U32;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        let mut hash = H256::zero();
        hash.as_mut()[0] = (*self).into();
        hash
    }
}

impl SszSize for u8 {
    const SIZE: Size = Size::Fixed { size: 1 };
}

impl SszRead for u8 {
    #[inline]
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(bytes[0])
    }
}

impl SszWrite for u8 {
    #[inline]
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes[0] = *self;
    }
}

impl SszHash for u8 {
    type PackingFactor = U32;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        let mut hash = H256::zero();
        hash.as_mut()[0] = *self;
        hash
    }
}

impl SszSize for u32 {
    const SIZE: Size = Size::Fixed { size: 4 };
}

impl SszRead for u32 {
    #[inline]
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Endianness::read_u32(bytes))
    }
}

impl SszWrite for u32 {
    #[inline]
    fn write_fixed(&self, bytes: &mut [u8]) {
        Endianness::write_u32(bytes, *self);
    }
}

impl SszHash for u32 {
    type PackingFactor = U8;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        let mut hash = H256::zero();
        self.write_fixed(&mut hash.as_bytes_mut()[..4]);
        hash
    }
}

impl SszSize for u64 {
    const SIZE: Size = Size::Fixed { size: 8 };
}

impl SszRead for u64 {
    #[inline]
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Endianness::read_u64(bytes))
    }
}

impl SszWrite for u64 {
    #[inline]
    fn write_fixed(&self, bytes: &mut [u8]) {
        Endianness::write_u64(bytes, *self);
    }
}

impl SszHash for u64 {
    // Note that this is not the same as `H256::from_low_u64_le`.
    type PackingFactor = U4;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        let mut hash = H256::zero();
        self.write_fixed(&mut hash.as_bytes_mut()[..8]);
        hash
    }
}

impl SszSize for H256 {
    const SIZE: Size = Size::Fixed { size: 32 };
}

impl SszRead for H256 {
    #[inline]
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Self::from_slice(bytes))
    }
}

impl SszWrite for H256 {
    #[inline]
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(self.as_bytes());
    }
}

impl SszHash for H256 {
    type PackingFactor = U1;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        *self
    }
}
