use core::{fmt::Debug, hash::Hash, marker::PhantomData};

use derivative::Derivative;
use derive_more::{Deref, DerefMut};
use ethereum_types::H256;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use typenum::Unsigned;

use crate::{
    consts::BYTES_PER_CHUNK,
    error::{ReadError, WriteError},
    merkle_tree::{self, MerkleTree},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    shared,
    size::Size,
};

/// A list with at most `N` elements.
#[derive(Deref, DerefMut, Derivative, Serialize)]
#[derivative(
    Clone(bound = "T: Clone"),
    PartialEq(bound = "T: PartialEq"),
    Eq(bound = "T: Eq"),
    Hash(bound = "T: Hash"),
    Default(bound = ""),
    Debug(bound = "T: Debug", transparent = "true")
)]
#[serde(transparent)]
pub struct ContiguousList<T, N> {
    #[deref]
    #[deref_mut]
    elements: Box<[T]>,
    #[derivative(Debug = "ignore")]
    #[serde(skip)]
    phantom: PhantomData<N>,
}

impl<T, N> AsRef<[T]> for ContiguousList<T, N> {
    fn as_ref(&self) -> &[T] {
        self.elements.as_ref()
    }
}

impl<T, N: Unsigned> TryFrom<Vec<T>> for ContiguousList<T, N> {
    type Error = ReadError;

    fn try_from(vec: Vec<T>) -> Result<Self, Self::Error> {
        Self::validate_length(vec.len())?;
        Ok(Self::new_unchecked(vec.into()))
    }
}

impl<T, N> IntoIterator for ContiguousList<T, N> {
    type Item = T;
    type IntoIter = <Vec<T> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_vec().into_iter()
    }
}

impl<'list, T, N> IntoIterator for &'list ContiguousList<T, N> {
    type Item = &'list T;
    type IntoIter = <&'list [T] as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'de, T: Deserialize<'de>, N: Unsigned> Deserialize<'de> for ContiguousList<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let elements = Vec::deserialize(deserializer)?;
        elements.try_into().map_err(D::Error::custom)
    }
}

impl<T: SszSize, N> SszSize for ContiguousList<T, N> {
    const SIZE: Size = Size::Variable { minimum_size: 0 };
}

impl<T: SszRead, N: Unsigned> SszRead for ContiguousList<T, N> {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        let results = shared::read_list(bytes)?;
        itertools::process_results(results, |elements| Self::try_from_iter(elements))?
    }
}

impl<T: SszWrite, N> SszWrite for ContiguousList<T, N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        shared::write_list(bytes, self)
    }
}

impl<T: SszHash + SszWrite, N: Unsigned> SszHash for ContiguousList<T, N> {
    fn hash_tree_root(&self) -> H256 {
        let root = if T::PACKING_FACTOR == 1 {
            let depth = merkle_tree::depth_for_chunk_count(N::USIZE);
            let chunks = self.iter().map(SszHash::hash_tree_root).collect::<Vec<_>>();
            MerkleTree::merkleize_chunks(depth, chunks)
        } else {
            let chunk_count = (N::USIZE * T::SIZE.fixed_part()).div_ceil(BYTES_PER_CHUNK);
            let depth = merkle_tree::depth_for_chunk_count(chunk_count);
            MerkleTree::merkleize_packed(depth, self)
        };

        merkle_tree::mix_in_length(root, self.len())
    }
}

impl<T, N> ContiguousList<T, N> {
    pub fn try_from_iter(elements: impl IntoIterator<Item = T>) -> Result<Self, ReadError>
    where
        N: Unsigned,
    {
        let elements = Box::from_iter(elements);
        Self::validate_length(elements.len())?;
        Ok(Self::new_unchecked(elements))
    }

    /// Appends `element`, failing if the list is already full.
    pub fn push(&mut self, element: T) -> Result<(), ReadError>
    where
        N: Unsigned,
    {
        Self::validate_length(self.elements.len() + 1)?;

        let mut elements = core::mem::take(&mut self.elements).into_vec();
        elements.push(element);
        self.elements = elements.into_boxed_slice();

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

    fn new_unchecked(elements: Box<[T]>) -> Self {
        Self {
            elements,
            phantom: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use quickcheck_macros::quickcheck;
    use typenum::{U2, U4, U64, U8};

    use super::*;

    #[quickcheck]
    fn list_of_u32_survives_encoding(mut values: Vec<u32>) -> bool {
        values.truncate(64);

        let Ok(list) = ContiguousList::<u32, U64>::try_from(values) else {
            return false;
        };

        list.to_ssz()
            .map(ContiguousList::from_ssz)
            .is_ok_and(|decoded| decoded.as_ref() == Ok(&list))
    }

    #[test]
    fn list_of_u16_is_encoded_without_offsets() {
        let list = ContiguousList::<u16, U4>::try_from(vec![1, 2, 3]).expect("fits");

        assert_eq!(list.to_ssz(), Ok(hex!("010002000300").to_vec()));
    }

    #[test]
    fn list_of_lists_is_encoded_with_offsets() {
        let inner_1 = ContiguousList::<u8, U4>::try_from(vec![1, 2]).expect("fits");
        let inner_2 = ContiguousList::<u8, U4>::try_from(vec![3]).expect("fits");
        let outer = ContiguousList::<_, U2>::try_from(vec![inner_1, inner_2]).expect("fits");

        let bytes = outer.to_ssz().expect("offsets fit");

        assert_eq!(bytes, hex!("08000000 0a000000 0102 03"));
        assert_eq!(ContiguousList::from_ssz(bytes), Ok(outer));
    }

    #[test]
    fn decoding_rejects_too_many_elements() {
        assert_eq!(
            ContiguousList::<u8, U2>::from_ssz([1, 2, 3]),
            Err(ReadError::ListTooLong {
                maximum: 2,
                actual: 3,
            }),
        );
    }

    #[test]
    fn decoding_rejects_trailing_partial_element() {
        assert!(ContiguousList::<u16, U8>::from_ssz([1, 0, 2]).is_err());
    }

    #[test]
    fn decoding_rejects_zero_first_offset() {
        assert_eq!(
            ContiguousList::<ContiguousList<u8, U4>, U2>::from_ssz([0, 0, 0, 0, 7]),
            Err(ReadError::ListFirstOffsetInvalid { first_offset: 0 }),
        );
    }

    #[test]
    fn decoding_rejects_decreasing_offsets() {
        let bytes = hex!("08000000 07000000 01");

        assert!(ContiguousList::<ContiguousList<u8, U4>, U2>::from_ssz(bytes).is_err());
    }

    #[test]
    fn push_respects_maximum_length() {
        let mut list = ContiguousList::<u8, U2>::default();

        assert_eq!(list.push(1), Ok(()));
        assert_eq!(list.push(2), Ok(()));
        assert_eq!(
            list.push(3),
            Err(ReadError::ListTooLong {
                maximum: 2,
                actual: 3,
            }),
        );
        assert_eq!(list.as_ref(), [1, 2]);
    }

    #[test]
    fn empty_list_root_mixes_in_zero_length() {
        let list = ContiguousList::<u64, U8>::default();

        // 8 `u64`s pack into 2 chunks, so the tree has depth 1.
        let expected = merkle_tree::mix_in_length(hashing::ZERO_HASHES[1], 0);

        assert_eq!(list.hash_tree_root(), expected);
    }

    #[test]
    fn packed_list_root_matches_manual_computation() {
        let list = ContiguousList::<u64, U8>::try_from(vec![1, 2]).expect("fits");

        let mut chunk = H256::zero();
        chunk[..16].copy_from_slice(&hex!("0100000000000000 0200000000000000"));

        let expected = merkle_tree::mix_in_length(
            hashing::hash_256_256(chunk, H256::zero()),
            2,
        );

        assert_eq!(list.hash_tree_root(), expected);
    }

    #[test]
    fn list_of_hashes_uses_element_roots() {
        let elements = vec![H256::repeat_byte(1), H256::repeat_byte(2), H256::repeat_byte(3)];
        let list = ContiguousList::<H256, U4>::try_from(elements).expect("fits");

        let expected = merkle_tree::mix_in_length(
            hashing::hash_256_256(
                hashing::hash_256_256(H256::repeat_byte(1), H256::repeat_byte(2)),
                hashing::hash_256_256(H256::repeat_byte(3), H256::zero()),
            ),
            3,
        );

        assert_eq!(list.hash_tree_root(), expected);
    }
}
