// <https://notes.ethereum.org/ruKvDXl6QOW3gnqVYb8ezA> describes some of the
// validations that SSZ decoders need to perform.

use core::ops::Range;

use itertools::Itertools as _;

use crate::{
    consts::{Offset, BYTES_PER_LENGTH_OFFSET},
    error::{ReadError, WriteError},
    porcelain::{SszRead, SszWrite},
    size::Size,
};

#[inline]
pub fn subslice(bytes: &[u8], range: Range<usize>) -> Result<&[u8], ReadError> {
    let Range { start, end } = range;
    bytes
        .get(start..end)
        .ok_or(ReadError::OffsetsNotValidSubsliceBounds {
            start,
            end,
            length: bytes.len(),
        })
}

#[inline]
pub fn read_offset(bytes: &[u8], position: usize) -> Result<usize, ReadError> {
    let subslice = subslice(bytes, position..position + BYTES_PER_LENGTH_OFFSET)?;
    let offset = Offset::from_ssz_unchecked(subslice)?;
    offset
        .try_into()
        .map_err(|_| ReadError::OffsetDoesNotFitInUsize { offset })
}

#[inline]
pub fn write_offset(bytes: &mut [u8], destination: usize, offset: usize) -> Result<(), WriteError> {
    let offset = Offset::try_from(offset).map_err(|_| WriteError::OffsetTooBig { offset })?;
    offset.write_fixed(&mut bytes[destination..destination + BYTES_PER_LENGTH_OFFSET]);
    Ok(())
}

#[inline]
pub fn read_list<T: SszRead>(bytes: &[u8]) -> Result<Vec<T>, ReadError> {
    if let Size::Fixed { size } = T::SIZE {
        let remainder = bytes.len() % size;

        if remainder != 0 {
            return Err(ReadError::ListTrailingBytes { remainder });
        }

        return bytes.chunks(size).map(T::from_ssz_unchecked).collect();
    }

    if bytes.is_empty() {
        return Ok(vec![]);
    }

    let first_offset = read_offset(bytes, 0)?;

    if first_offset % BYTES_PER_LENGTH_OFFSET != 0 {
        return Err(ReadError::ListFirstOffsetUnaligned { first_offset });
    }

    subslice(bytes, 0..first_offset)?
        .chunks_exact(BYTES_PER_LENGTH_OFFSET)
        .enumerate()
        .map(|(index, _)| read_offset(bytes, index * BYTES_PER_LENGTH_OFFSET))
        .chain(core::iter::once(Ok(bytes.len())))
        .tuple_windows()
        .map(|(start_result, end_result)| {
            let start = start_result?;
            let end = end_result?;

            if end < start {
                return Err(ReadError::OffsetsNotIncreasing {
                    previous: start,
                    next: end,
                });
            }

            T::from_ssz(subslice(bytes, start..end)?)
        })
        .collect()
}

#[inline]
pub fn write_list<'elements, T: SszWrite + 'elements>(
    bytes: &mut Vec<u8>,
    elements: impl IntoIterator<IntoIter = impl ExactSizeIterator<Item = &'elements T>>,
) -> Result<(), WriteError> {
    let elements = elements.into_iter();

    match T::SIZE {
        Size::Fixed { size } => write_fixed_elements(bytes, elements, size),
        Size::Variable { .. } => write_variable_elements(bytes, elements),
    }
}

#[inline]
fn write_fixed_elements<'elements, T: SszWrite + 'elements>(
    bytes: &mut Vec<u8>,
    elements: impl ExactSizeIterator<Item = &'elements T>,
    size: usize,
) -> Result<(), WriteError> {
    bytes.reserve(elements.len() * size);

    for element in elements {
        let position = bytes.len();
        bytes.resize(position + size, 0);
        element.write_fixed(&mut bytes[position..]);
    }

    Ok(())
}

/// Variable-size elements are laid out as a table of offsets followed by
/// the element payloads, every offset relative to the start of the table.
#[inline]
fn write_variable_elements<'elements, T: SszWrite + 'elements>(
    bytes: &mut Vec<u8>,
    elements: impl ExactSizeIterator<Item = &'elements T>,
) -> Result<(), WriteError> {
    let table_start = bytes.len();

    bytes.resize(table_start + elements.len() * BYTES_PER_LENGTH_OFFSET, 0);

    for (index, element) in elements.enumerate() {
        let offset = bytes.len() - table_start;

        write_offset(bytes, table_start + index * BYTES_PER_LENGTH_OFFSET, offset)?;

        element.write_variable(bytes)?;
    }

    Ok(())
}
