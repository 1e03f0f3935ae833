use core::{
    fmt::{Debug, Formatter, Result as FmtResult},
    marker::PhantomData,
};

use bitvec::{order::Lsb0, vec::BitVec};
use ethereum_types::H256;
use typenum::Unsigned;

use crate::{
    consts::BITS_PER_BYTE,
    error::{PushError, ReadError, WriteError},
    merkle,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// A variable-length SSZ bit list with a type-level bit limit.
///
/// The delimiting bit required by the wire encoding is not stored; it is
/// added on write and stripped on read.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct BitList<N> {
    // `bitvec::order::Lsb0` matches the SSZ bit numbering within bytes.
    bits: BitVec<u8, Lsb0>,
    phantom: PhantomData<N>,
}

impl<N> Debug for BitList<N> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str("0b")?;

        for bit in self.iter() {
            formatter.write_str(if bit { "1" } else { "0" })?;
        }

        Ok(())
    }
}

impl<N: Unsigned> TryFrom<Vec<bool>> for BitList<N> {
    type Error = ReadError;

    fn try_from(bits: Vec<bool>) -> Result<Self, Self::Error> {
        Self::validate_length(bits.len())?;

        let mut bit_list = Self::with_length(bits.len());

        for (index, bit) in bits.into_iter().enumerate() {
            bit_list.set(index, bit);
        }

        Ok(bit_list)
    }
}

impl<N> SszSize for BitList<N> {
    const SIZE: Size = Size::Variable { minimum_size: 1 };
}

impl<N: Unsigned> SszRead for BitList<N> {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        let length = Self::measure_length(bytes)?;
        let data_bytes = bytes[..length.div_ceil(BITS_PER_BYTE)].to_vec();

        let mut bits = BitVec::from_vec(data_bytes);
        bits.truncate(length);
        bits.set_uninitialized(false);

        Ok(Self {
            bits,
            phantom: PhantomData,
        })
    }
}

impl<N> SszWrite for BitList<N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        let length = self.len();
        let delimited_length = (length + 1).div_ceil(BITS_PER_BYTE);

        let mut data = self.to_raw_bytes();
        data.resize(delimited_length, 0);
        data[length / BITS_PER_BYTE] |= 1 << (length % BITS_PER_BYTE);

        bytes.extend_from_slice(&data);

        Ok(())
    }
}

impl<N: Unsigned> SszHash for BitList<N> {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        let root = merkle::merkleize_bytes(self.to_raw_bytes(), merkle::depth_for_bits(N::U64));
        merkle::mix_in_length(root, self.len())
    }
}

impl<N> BitList<N> {
    #[must_use]
    pub fn with_length(length: usize) -> Self
    where
        N: Unsigned,
    {
        Self::new(false, length)
    }

    #[must_use]
    pub fn new(value: bool, length: usize) -> Self
    where
        N: Unsigned,
    {
        assert!(length <= N::USIZE);

        let mut bits = BitVec::repeat(value, length);
        bits.set_uninitialized(false);

        Self {
            bits,
            phantom: PhantomData,
        }
    }

    /// Joins bit lists end to end. The sources may have a different limit
    /// than the result; only the combined length is checked.
    pub fn concatenate<'lists, M: 'lists>(
        bit_lists: impl IntoIterator<Item = &'lists BitList<M>>,
    ) -> Result<Self, ReadError>
    where
        N: Unsigned,
    {
        let mut bits = BitVec::new();

        for bit_list in bit_lists {
            bits.extend_from_bitslice(&bit_list.bits);
        }

        let maximum = N::USIZE;
        let actual = bits.len();

        if actual > maximum {
            return Err(ReadError::BitListTooLong { maximum, actual });
        }

        bits.set_uninitialized(false);

        Ok(Self {
            bits,
            phantom: PhantomData,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Panics if `index` is out of bounds, like slice indexing.
    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        self.bits[index]
    }

    pub fn set(&mut self, index: usize, value: bool) {
        self.bits.set(index, value);
    }

    pub fn push(&mut self, value: bool) -> Result<(), PushError>
    where
        N: Unsigned,
    {
        if self.len() >= N::USIZE {
            return Err(PushError::ListFull);
        }

        self.bits.push(value);
        Ok(())
    }

    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = bool> + ExactSizeIterator + '_ {
        self.bits.iter().by_vals()
    }

    /// The data bytes without the delimiting bit. Unused bits are zero.
    #[must_use]
    pub fn to_raw_bytes(&self) -> Vec<u8> {
        let mut bits = self.bits.clone();
        bits.set_uninitialized(false);
        bits.into_vec()
    }

    fn measure_length(bytes: &[u8]) -> Result<usize, ReadError>
    where
        N: Unsigned,
    {
        let leading_zeros_in_last_byte = bytes
            .last()
            .ok_or(ReadError::BitListEmptySlice)?
            .leading_zeros() as usize;

        let data_bits_in_last_byte = (BITS_PER_BYTE - 1)
            .checked_sub(leading_zeros_in_last_byte)
            .ok_or(ReadError::BitListNoDelimitingBit)?;

        let maximum = N::USIZE;
        let actual = (bytes.len() - 1) * BITS_PER_BYTE + data_bits_in_last_byte;

        if actual > maximum {
            return Err(ReadError::BitListTooLong { maximum, actual });
        }

        Ok(actual)
    }

    const fn validate_length(actual: usize) -> Result<(), ReadError>
    where
        N: Unsigned,
    {
        let maximum = N::USIZE;

        if actual > maximum {
            return Err(ReadError::BitListTooLong { maximum, actual });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use typenum::{U1, U2, U8};

    use super::*;

    #[test]
    fn new_with_true_clears_unused_bits() {
        assert_eq!(BitList::<U1>::new(true, 1).to_raw_bytes(), [1]);
    }

    #[test]
    fn pushed_bits_survive_the_wire_encoding() {
        let mut bit_list = BitList::<U8>::default();
        bit_list.push(true).expect("limit is 8 bits");
        bit_list.push(false).expect("limit is 8 bits");
        bit_list.push(true).expect("limit is 8 bits");

        let bytes = bit_list.to_ssz().expect("bit lists are always writable");
        assert_eq!(bytes, [0b0000_1101]);

        assert_eq!(
            BitList::<U8>::from_ssz(bytes).expect("encoding round-trips"),
            bit_list,
        );
    }

    #[test]
    fn concatenation_respects_the_limit() -> Result<(), ReadError> {
        let ones: BitList<U2> = vec![true, true].try_into()?;

        assert_eq!(
            BitList::<U2>::concatenate([&ones, &ones]),
            Err(ReadError::BitListTooLong {
                maximum: 2,
                actual: 4,
            }),
        );

        Ok(())
    }

    #[test]
    fn concatenation_may_widen_the_limit() -> Result<(), ReadError> {
        let ones: BitList<U2> = vec![true, true].try_into()?;

        let wide = BitList::<U8>::concatenate([&ones, &ones])?;

        assert_eq!(wide.len(), 4);
        assert_eq!(wide.count_ones(), 4);

        Ok(())
    }

    #[test]
    fn a_full_byte_of_data_takes_two_bytes_on_the_wire() {
        let bit_list = BitList::<U8>::new(true, 8);

        let bytes = bit_list.to_ssz().expect("bit lists are always writable");
        assert_eq!(bytes, [0xff, 0x01]);

        assert_eq!(
            BitList::<U8>::from_ssz(bytes).expect("encoding round-trips"),
            bit_list,
        );
    }
}
