use core::{
    fmt::{Debug, Formatter, Result as FmtResult},
    marker::PhantomData,
};

use bitvec::{bitbox, boxed::BitBox, order::Lsb0, vec::BitVec};
use derivative::Derivative;
use derive_more::{Deref, DerefMut};
use ethereum_types::H256;
use serde::{de::Error as _, ser::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use typenum::Unsigned;

use crate::{
    consts::{BITS_PER_BYTE, BITS_PER_CHUNK},
    error::{ReadError, WriteError},
    merkle_tree::{self, MerkleTree},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// A list of at most `N` bits.
///
/// Encoded as its bits followed by a single delimiting `1` bit.
#[derive(Deref, DerefMut, Derivative)]
#[derivative(
    Clone(bound = ""),
    PartialEq(bound = ""),
    Eq(bound = ""),
    Hash(bound = ""),
    Default(bound = "")
)]
pub struct BitList<N> {
    // Bits in the unused part of the last byte are always zero.
    #[deref]
    #[deref_mut]
    bits: BitBox<u8, Lsb0>,
    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    phantom: PhantomData<N>,
}

impl<N: Unsigned> TryFrom<Vec<bool>> for BitList<N> {
    type Error = ReadError;

    fn try_from(bits: Vec<bool>) -> Result<Self, Self::Error> {
        let maximum = N::USIZE;
        let actual = bits.len();

        if actual > maximum {
            return Err(ReadError::BitListTooLong { maximum, actual });
        }

        let bits = bits.into_iter().collect::<BitVec<u8, Lsb0>>();
        Ok(Self::from_bit_box(bits.into_boxed_bitslice()))
    }
}

impl<N> Debug for BitList<N> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str("0b")?;

        for bit in self.iter().by_vals() {
            formatter.write_str(if bit { "1" } else { "0" })?;
        }

        Ok(())
    }
}

// `BitBox` serializes itself as a struct with multiple fields.
// Use the SSZ encoding instead, like other implementations do.
impl<N> Serialize for BitList<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut ssz_bytes = vec![];
        self.write_variable(&mut ssz_bytes)
            .map_err(S::Error::custom)?;
        serde_utils::prefixed_hex_or_bytes_slice::serialize(ssz_bytes, serializer)
    }
}

impl<'de, N: Unsigned> Deserialize<'de> for BitList<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = serde_utils::prefixed_hex_or_bytes_cow::deserialize(deserializer)?;
        Self::from_ssz_unchecked(bytes.as_ref()).map_err(D::Error::custom)
    }
}

impl<N> SszSize for BitList<N> {
    const SIZE: Size = Size::Variable { minimum_size: 1 };
}

impl<N: Unsigned> SszRead for BitList<N> {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        let length = Self::measure_length(bytes)?;
        let mut bits = BitVec::from_slice(bytes);
        bits.truncate(length);
        Ok(Self::from_bit_box(bits.into_boxed_bitslice()))
    }
}

impl<N> SszWrite for BitList<N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        let length_before = bytes.len();
        let length_after = length_before + bytes_with_delimiting_bit(self.len());

        bytes.resize(length_after, 0);

        let new_bytes = &mut bytes[length_before..];

        new_bytes[..bytes_without_delimiting_bit(self.len())].copy_from_slice(self.as_raw_slice());
        set_bit(new_bytes, self.len());

        Ok(())
    }
}

impl<N: Unsigned> SszHash for BitList<N> {
    fn hash_tree_root(&self) -> H256 {
        let chunk_count = N::USIZE.div_ceil(BITS_PER_CHUNK);
        let depth = merkle_tree::depth_for_chunk_count(chunk_count);
        let root = MerkleTree::merkleize_bytes(depth, self.as_raw_slice());
        merkle_tree::mix_in_length(root, self.len())
    }
}

impl<N> BitList<N> {
    #[must_use]
    pub fn with_length(length: usize) -> Self
    where
        N: Unsigned,
    {
        assert!(length <= N::USIZE);

        Self::from_bit_box(bitbox![u8, Lsb0; 0; length])
    }

    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }

    fn measure_length(bytes: &[u8]) -> Result<usize, ReadError>
    where
        N: Unsigned,
    {
        let last_byte = *bytes.last().ok_or(ReadError::BitListEmptySlice)?;

        if last_byte == 0 {
            return Err(ReadError::BitListNoDelimitingBit);
        }

        let data_bits_in_last_byte = BITS_PER_BYTE - 1 - last_byte.leading_zeros() as usize;

        let maximum = N::USIZE;
        let actual = (bytes.len() - 1) * BITS_PER_BYTE + data_bits_in_last_byte;

        if actual > maximum {
            return Err(ReadError::BitListTooLong { maximum, actual });
        }

        Ok(actual)
    }

    fn from_bit_box(mut bits: BitBox<u8, Lsb0>) -> Self {
        bits.fill_uninitialized(false);

        Self {
            bits,
            phantom: PhantomData,
        }
    }
}

fn set_bit(bytes: &mut [u8], index: usize) {
    bytes[index / BITS_PER_BYTE] |= 1 << (index % BITS_PER_BYTE);
}

const fn bytes_without_delimiting_bit(length: usize) -> usize {
    length.div_ceil(BITS_PER_BYTE)
}

const fn bytes_with_delimiting_bit(length: usize) -> usize {
    length.saturating_add(1).div_ceil(BITS_PER_BYTE)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use typenum::{U1, U16, U2048, U8};

    use super::*;

    #[test]
    fn with_length_clears_unused_bits() {
        assert_eq!(BitList::<U1>::with_length(1).bits.as_raw_slice(), [0]);
    }

    #[test]
    fn empty_bit_list_is_a_single_delimiting_bit() {
        assert_eq!(BitList::<U8>::default().to_ssz(), Ok(vec![0b1]));
    }

    #[test]
    fn bit_list_round_trips_through_ssz() {
        let bit_list =
            BitList::<U16>::try_from(vec![true, false, true, true, false, false, false, false, true])
                .expect("fits");

        let bytes = bit_list.to_ssz().expect("bit lists have no offsets");

        assert_eq!(bytes, hex!("0d03"));
        assert_eq!(BitList::from_ssz(bytes), Ok(bit_list));
    }

    #[test]
    fn full_byte_gets_delimiting_bit_in_next_byte() {
        let bit_list = BitList::<U8>::try_from(vec![true; 8]).expect("fits");

        assert_eq!(bit_list.to_ssz(), Ok(hex!("ff01").to_vec()));
    }

    #[test]
    fn decoding_rejects_missing_delimiting_bit() {
        assert_eq!(
            BitList::<U16>::from_ssz([0xff, 0x00]),
            Err(ReadError::BitListNoDelimitingBit),
        );
    }

    #[test]
    fn decoding_rejects_too_many_bits() {
        assert_eq!(
            BitList::<U1>::from_ssz([0b100]),
            Err(ReadError::BitListTooLong {
                maximum: 1,
                actual: 2,
            }),
        );
    }

    #[test]
    fn root_of_empty_bit_list() {
        let expected = merkle_tree::mix_in_length(hashing::ZERO_HASHES[3], 0);

        assert_eq!(BitList::<U2048>::default().hash_tree_root(), expected);
    }

    #[test]
    fn serializes_to_ssz_hex() {
        let bit_list = BitList::<U8>::try_from(vec![true, true]).expect("fits");

        assert_eq!(
            serde_json::to_string(&bit_list).expect("serialization succeeds"),
            r#""0x07""#,
        );
    }
}
