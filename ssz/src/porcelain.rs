use easy_ext::ext;
use ethereum_types::H256;

use crate::{
    error::{ReadError, WriteError},
    size::Size,
};

pub trait SszSize {
    const SIZE: Size;
}

pub trait SszRead: SszSize + Sized {
    /// Attempts to deserialize `bytes` into `Self` without checking the length of `bytes`.
    ///
    /// This may panic if called directly on a slice of the wrong length.
    /// Outside of [`SszRead`] impls use [`SszRead::from_ssz`] instead.
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError>;

    /// Attempts to deserialize `bytes` into `Self` with full validation.
    fn from_ssz(bytes: impl AsRef<[u8]>) -> Result<Self, ReadError> {
        let bytes = bytes.as_ref();

        match Self::SIZE {
            Size::Fixed { size: expected } => {
                let actual = bytes.len();

                if actual != expected {
                    return Err(ReadError::FixedSizeMismatch { expected, actual });
                }
            }
            Size::Variable { minimum_size } => {
                if bytes.len() < minimum_size {
                    return Err(ReadError::OffsetsNotValidSubsliceBounds {
                        start: 0,
                        end: minimum_size,
                        length: bytes.len(),
                    });
                }
            }
        }

        Self::from_ssz_unchecked(bytes)
    }
}

#[ext(SszReadExt)]
pub impl<T: SszRead + SszHash> T {
    /// Deserializes `bytes` and checks that the result commits to `expected_root`.
    ///
    /// Used when loading values stored under their own `hash_tree_root`.
    fn from_ssz_with_root(bytes: impl AsRef<[u8]>, expected_root: H256) -> Result<Self, ReadError> {
        let value = Self::from_ssz(bytes)?;
        let actual = value.hash_tree_root();

        if actual != expected_root {
            return Err(ReadError::RootMismatch {
                expected: expected_root,
                actual,
            });
        }

        Ok(value)
    }
}

pub trait SszWrite: SszSize {
    // The panics could be avoided with some type-level programming, but it's not worth the trouble.
    fn write_fixed(&self, _bytes: &mut [u8]) {
        panic!("SszWrite::write_fixed must be implemented for fixed-size types");
    }

    fn write_variable(&self, _bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        panic!("SszWrite::write_variable must be implemented for variable-size types");
    }

    fn to_ssz(&self) -> Result<Vec<u8>, WriteError> {
        match Self::SIZE {
            Size::Fixed { size } => {
                let mut bytes = vec![0; size];
                self.write_fixed(bytes.as_mut_slice());
                Ok(bytes)
            }
            Size::Variable { minimum_size } => {
                let mut bytes = Vec::with_capacity(minimum_size);
                self.write_variable(&mut bytes)?;
                Ok(bytes)
            }
        }
    }
}

pub trait SszHash {
    /// Number of values of this type that fit in a single chunk.
    ///
    /// Basic types are packed. Everything else occupies a chunk of its own.
    const PACKING_FACTOR: usize = 1;

    fn hash_tree_root(&self) -> H256;
}
