// <https://notes.ethereum.org/ruKvDXl6QOW3gnqVYb8ezA> describes some of the validations that SSZ
// decoders need to perform.

use core::ops::Range;

use byteorder::ByteOrder as _;
use itertools::{Either, Itertools as _};

use crate::{
    consts::{Endianness, Offset, BYTES_PER_LENGTH_OFFSET},
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
pub fn read_offset_unchecked(bytes: &[u8]) -> Result<usize, ReadError> {
    let offset = Endianness::read_u32(subslice(bytes, 0..BYTES_PER_LENGTH_OFFSET)?);
    offset
        .try_into()
        .map_err(|_| ReadError::OffsetDoesNotFitInUsize { offset })
}

#[inline]
pub fn write_offset(bytes: &mut [u8], destination: usize, offset: usize) -> Result<(), WriteError> {
    let offset = Offset::try_from(offset).map_err(|_| WriteError::OffsetTooBig { offset })?;
    Endianness::write_u32(
        &mut bytes[destination..destination + BYTES_PER_LENGTH_OFFSET],
        offset,
    );
    Ok(())
}

pub fn read_vector<'all, T: SszRead + 'all>(
    bytes: &'all [u8],
    length: usize,
) -> Result<impl Iterator<Item = Result<T, ReadError>> + 'all, ReadError> {
    if let Size::Fixed { size } = T::SIZE {
        let results = bytes
            .chunks_exact(size)
            .map(|chunk| T::from_ssz_unchecked(chunk));

        Ok(Either::Left(results))
    } else {
        let expected = length * BYTES_PER_LENGTH_OFFSET;
        let actual = read_offset_unchecked(bytes)?;

        if actual != expected {
            return Err(ReadError::VectorFirstOffsetMismatch { expected, actual });
        }

        let results = read_variable_elements(bytes, expected)?;

        Ok(Either::Right(results))
    }
}

pub fn read_list<'all, T: SszRead + 'all>(
    bytes: &'all [u8],
) -> Result<impl Iterator<Item = Result<T, ReadError>> + 'all, ReadError> {
    if let Size::Fixed { size } = T::SIZE {
        let results = bytes.chunks(size).map(T::from_ssz);

        Ok(Either::Left(results))
    } else if bytes.is_empty() {
        let results = read_variable_elements(bytes, 0)?;

        Ok(Either::Right(results))
    } else {
        let first_offset = read_offset_unchecked(bytes)?;

        if first_offset == 0 || first_offset % BYTES_PER_LENGTH_OFFSET != 0 {
            return Err(ReadError::ListFirstOffsetInvalid { first_offset });
        }

        let results = read_variable_elements(bytes, first_offset)?;

        Ok(Either::Right(results))
    }
}

pub fn write_fixed_vector<'all, T: SszWrite + 'all>(
    bytes: &mut [u8],
    elements: impl IntoIterator<Item = &'all T>,
) {
    let size = T::SIZE.fixed_part();

    for (element, subslice) in elements.into_iter().zip(bytes.chunks_exact_mut(size)) {
        element.write_fixed(subslice);
    }
}

pub fn write_list<'all, T: SszWrite + 'all>(
    bytes: &mut Vec<u8>,
    elements: impl IntoIterator<IntoIter = impl ExactSizeIterator<Item = &'all T>>,
) -> Result<(), WriteError> {
    let elements = elements.into_iter();
    let element_count = elements.len();
    let length_before = bytes.len();

    if let Size::Fixed { size } = T::SIZE {
        bytes.resize(length_before + element_count * size, 0);

        let new_bytes = &mut bytes[length_before..];

        for (element, subslice) in elements.zip(new_bytes.chunks_exact_mut(size)) {
            element.write_fixed(subslice);
        }
    } else {
        bytes.resize(length_before + element_count * BYTES_PER_LENGTH_OFFSET, 0);

        for (index, element) in elements.enumerate() {
            let destination = length_before + index * BYTES_PER_LENGTH_OFFSET;
            let offset = bytes.len() - length_before;

            write_offset(bytes, destination, offset)?;

            element.write_variable(bytes)?;
        }
    }

    Ok(())
}

// Offsets must be nondecreasing and within bounds. `subslice` rejects both kinds of violations.
fn read_variable_elements<T: SszRead>(
    bytes: &[u8],
    first_offset: usize,
) -> Result<impl Iterator<Item = Result<T, ReadError>> + '_, ReadError> {
    let results = subslice(bytes, 0..first_offset)?
        .chunks_exact(BYTES_PER_LENGTH_OFFSET)
        .map(read_offset_unchecked)
        .chain(core::iter::once(Ok(bytes.len())))
        .tuple_windows()
        .map(move |(start_result, end_result)| {
            let start = start_result?;
            let end = end_result?;
            T::from_ssz(subslice(bytes, start..end)?)
        });

    Ok(results)
}
