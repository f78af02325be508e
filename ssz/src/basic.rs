use byteorder::ByteOrder as _;
use ethereum_types::H256;

use crate::{
    consts::{Endianness, BYTES_PER_CHUNK},
    error::ReadError,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

impl SszSize for bool {
    const SIZE: Size = Size::Fixed {
        size: size_of::<Self>(),
    };
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
    const PACKING_FACTOR: usize = BYTES_PER_CHUNK;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        let mut hash = H256::zero();
        hash.as_bytes_mut()[0] = (*self).into();
        hash
    }
}

impl SszSize for u8 {
    const SIZE: Size = Size::Fixed {
        size: size_of::<Self>(),
    };
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
    const PACKING_FACTOR: usize = BYTES_PER_CHUNK;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        let mut hash = H256::zero();
        hash.as_bytes_mut()[0] = *self;
        hash
    }
}

macro_rules! impl_for_unsigned {
    ($type: ty, $read: ident, $write: ident) => {
        impl SszSize for $type {
            const SIZE: Size = Size::Fixed {
                size: size_of::<Self>(),
            };
        }

        impl SszRead for $type {
            #[inline]
            fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
                Ok(Endianness::$read(bytes))
            }
        }

        impl SszWrite for $type {
            #[inline]
            fn write_fixed(&self, bytes: &mut [u8]) {
                Endianness::$write(bytes, *self);
            }
        }

        impl SszHash for $type {
            const PACKING_FACTOR: usize = BYTES_PER_CHUNK / size_of::<Self>();

            // Note that this is not the same as `H256::from_low_u64_le`.
            // `H256::from_low_u64_le(1)` puts the 1 in the 25th byte.
            #[inline]
            fn hash_tree_root(&self) -> H256 {
                let mut hash = H256::zero();
                self.write_fixed(&mut hash[..size_of::<Self>()]);
                hash
            }
        }
    };
}

impl_for_unsigned!(u16, read_u16, write_u16);
impl_for_unsigned!(u32, read_u32, write_u32);
impl_for_unsigned!(u64, read_u64, write_u64);

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use test_case::test_case;

    use super::*;

    #[test_case(0x0123_4567_89ab_cdef, hex!("efcdab8967452301"))]
    #[test_case(1, hex!("0100000000000000"))]
    #[test_case(u64::MAX, hex!("ffffffffffffffff"))]
    fn u64_is_little_endian(value: u64, expected: [u8; 8]) -> Result<(), ReadError> {
        let bytes = value.to_ssz().expect("u64 is fixed-size");

        assert_eq!(bytes, expected);
        assert_eq!(u64::from_ssz(bytes)?, value);

        Ok(())
    }

    #[test]
    fn u64_root_is_value_in_first_bytes_of_chunk() {
        let root = 1_u64.hash_tree_root();

        assert_eq!(root[0], 1);
        assert!(root[1..].iter().all(|byte| *byte == 0));
    }

    #[test_case(&[2]; "invalid value")]
    #[test_case(&[0xff]; "all bits set")]
    fn bool_rejects_values_other_than_0_and_1(bytes: &[u8]) {
        assert_eq!(
            bool::from_ssz(bytes),
            Err(ReadError::BooleanInvalid { value: bytes[0] }),
        );
    }

    #[test]
    fn truncated_integer_is_rejected() {
        assert_eq!(
            u64::from_ssz([1, 2, 3]),
            Err(ReadError::FixedSizeMismatch {
                expected: 8,
                actual: 3,
            }),
        );
    }
}
