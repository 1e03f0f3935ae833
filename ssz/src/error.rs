use thiserror::Error;

use crate::consts::{Offset, BYTES_PER_LENGTH_OFFSET};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum ReadError {
    #[error("expected fixed-size value of {expected} bytes, found {actual} bytes")]
    FixedSizeMismatch { expected: usize, actual: usize },
    #[error("offset {offset} does not fit in usize")]
    OffsetDoesNotFitInUsize { offset: Offset },
    #[error(
        "offsets {start} and {end} are not valid subslice bounds for slice of length {length}"
    )]
    OffsetsNotValidSubsliceBounds {
        start: usize,
        end: usize,
        length: usize,
    },
    #[error("offsets are not increasing ({previous} followed by {next})")]
    OffsetsNotIncreasing { previous: usize, next: usize },
    #[error("expected boolean to be 0 or 1, found {value}")]
    BooleanInvalid { value: u8 },
    #[error("first offset of list is not aligned")]
    ListFirstOffsetUnaligned { first_offset: usize },
    #[error("expected list to have no more than {maximum} elements, found {actual} elements")]
    ListTooLong { maximum: usize, actual: usize },
    #[error("list of fixed-size elements has {remainder} trailing bytes")]
    ListTrailingBytes { remainder: usize },
    #[error("empty slice is not a valid bit list")]
    BitListEmptySlice,
    #[error("last byte of slice has no delimiting bit")]
    BitListNoDelimitingBit,
    #[error("expected bit list to have no more than {maximum} bits, found {actual} bits")]
    BitListTooLong { maximum: usize, actual: usize },
    #[error("expected container to have {expected} as the first offset, found {actual}")]
    ContainerFirstOffsetMismatch { expected: usize, actual: usize },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum WriteError {
    #[error("offset {offset} does not fit in {BYTES_PER_LENGTH_OFFSET} bytes")]
    OffsetTooBig { offset: usize },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum PushError {
    #[error("list is full")]
    ListFull,
}
