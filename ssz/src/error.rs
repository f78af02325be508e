use ethereum_types::H256;
use thiserror::Error;

use crate::consts::{Offset, BYTES_PER_LENGTH_OFFSET};

/// Reasons a byte string is not a valid encoding.
///
/// Every variant is a kind of malformed encoding. Decoding never accepts partial data.
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
    #[error("expected boolean to be 0 or 1, found {value}")]
    BooleanInvalid { value: u8 },
    #[error(
        "expected vector of variable-size elements to have \
         {expected} as the first offset, found {actual}"
    )]
    VectorFirstOffsetMismatch { expected: usize, actual: usize },
    #[error("expected vector to have {expected} elements, found {actual} elements")]
    VectorSizeMismatch { expected: usize, actual: usize },
    #[error("first offset of list ({first_offset}) is zero or not aligned")]
    ListFirstOffsetInvalid { first_offset: usize },
    #[error("expected list to have no more than {maximum} elements, found {actual} elements")]
    ListTooLong { maximum: usize, actual: usize },
    #[error("bit vector of {expected} bits has bits set past its length")]
    BitVectorPaddingNotZero { expected: usize },
    #[error("empty slice is not a valid bit list")]
    BitListEmptySlice,
    #[error("last byte of slice has no delimiting bit")]
    BitListNoDelimitingBit,
    #[error("expected bit list to have no more than {maximum} bits, found {actual} bits")]
    BitListTooLong { maximum: usize, actual: usize },
    #[error("expected container to have {expected} as the first offset, found {actual}")]
    ContainerFirstOffsetMismatch { expected: usize, actual: usize },
    #[error("decoded value has root {actual:?}, expected {expected:?}")]
    RootMismatch { expected: H256, actual: H256 },
    #[error("{message}")]
    Custom { message: &'static str },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum WriteError {
    #[error("offset {offset} does not fit in {BYTES_PER_LENGTH_OFFSET} bytes")]
    OffsetTooBig { offset: usize },
}
