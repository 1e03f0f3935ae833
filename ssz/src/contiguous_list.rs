use core::{marker::PhantomData, ops::Deref};

use ethereum_types::H256;
use typenum::Unsigned;

use crate::{
    error::{PushError, ReadError, WriteError},
    merkle,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    shared,
    size::Size,
};

/// A variable-length SSZ list with a type-level element limit.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ContiguousList<T, N> {
    elements: Vec<T>,
    phantom: PhantomData<N>,
}

impl<T, N> Default for ContiguousList<T, N> {
    fn default() -> Self {
        Self::new_unchecked(vec![])
    }
}

impl<T, N> Deref for ContiguousList<T, N> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.elements
    }
}

impl<T, N> AsRef<[T]> for ContiguousList<T, N> {
    fn as_ref(&self) -> &[T] {
        &self.elements
    }
}

impl<T, N: Unsigned> TryFrom<Vec<T>> for ContiguousList<T, N> {
    type Error = ReadError;

    fn try_from(elements: Vec<T>) -> Result<Self, Self::Error> {
        Self::validate_length(elements.len())?;
        Ok(Self::new_unchecked(elements))
    }
}

impl<T, N> IntoIterator for ContiguousList<T, N> {
    type Item = T;
    type IntoIter = <Vec<T> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'list, T, N> IntoIterator for &'list ContiguousList<T, N> {
    type Item = &'list T;
    type IntoIter = <&'list [T] as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: SszSize, N> SszSize for ContiguousList<T, N> {
    const SIZE: Size = Size::Variable { minimum_size: 0 };
}

impl<T: SszRead, N: Unsigned> SszRead for ContiguousList<T, N> {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        shared::read_list(bytes)?.try_into()
    }
}

impl<T: SszWrite, N> SszWrite for ContiguousList<T, N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        shared::write_list(bytes, self)
    }
}

impl<T: SszHash + SszWrite, N: Unsigned> SszHash for ContiguousList<T, N> {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        let packing_factor = T::PackingFactor::U64;

        let root = if packing_factor == 1 {
            let chunks = self.iter().map(SszHash::hash_tree_root);
            merkle::merkleize_chunks(chunks, merkle::depth_for_elements(N::U64))
        } else {
            let size = T::SIZE.fixed_part();
            let mut bytes = vec![0; self.len() * size];

            for (element, subslice) in self.iter().zip(bytes.chunks_exact_mut(size)) {
                element.write_fixed(subslice);
            }

            let depth = merkle::depth_for_elements(N::U64.div_ceil(packing_factor));
            merkle::merkleize_bytes(bytes, depth)
        };

        merkle::mix_in_length(root, self.len())
    }
}

impl<T, N> ContiguousList<T, N> {
    pub fn try_from_iter(elements: impl IntoIterator<Item = T>) -> Result<Self, ReadError>
    where
        N: Unsigned,
    {
        elements.into_iter().collect::<Vec<_>>().try_into()
    }

    pub fn push(&mut self, element: T) -> Result<(), PushError>
    where
        N: Unsigned,
    {
        if self.len() >= N::USIZE {
            return Err(PushError::ListFull);
        }

        self.elements.push(element);
        Ok(())
    }

    #[must_use]
    pub fn map<U>(self, function: impl FnMut(T) -> U) -> ContiguousList<U, N> {
        ContiguousList::new_unchecked(self.into_iter().map(function).collect())
    }

    const fn validate_length(actual: usize) -> Result<(), ReadError>
    where
        N: Unsigned,
    {
        let maximum = N::USIZE;

        if actual > maximum {
            return Err(ReadError::ListTooLong { maximum, actual });
        }

        Ok(())
    }

    fn new_unchecked(elements: Vec<T>) -> Self {
        Self {
            elements,
            phantom: PhantomData,
        }
    }
}
