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

/// A sequence of exactly `N` elements.
#[derive(Deref, DerefMut, Derivative, Serialize)]
#[derivative(
    Clone(bound = "T: Clone"),
    PartialEq(bound = "T: PartialEq"),
    Eq(bound = "T: Eq"),
    Hash(bound = "T: Hash"),
    Debug(bound = "T: Debug", transparent = "true")
)]
#[serde(bound(serialize = "T: Serialize"), transparent)]
pub struct ContiguousVector<T, N> {
    #[deref]
    #[deref_mut]
    elements: Box<[T]>,
    #[derivative(Debug = "ignore")]
    #[serde(skip)]
    phantom: PhantomData<N>,
}

impl<T: Default + Clone, N: Unsigned> Default for ContiguousVector<T, N> {
    fn default() -> Self {
        Self::repeat_element(T::default())
    }
}

impl<T, N> AsRef<[T]> for ContiguousVector<T, N> {
    fn as_ref(&self) -> &[T] {
        self.elements.as_ref()
    }
}

impl<T, N: Unsigned> TryFrom<Vec<T>> for ContiguousVector<T, N> {
    type Error = ReadError;

    fn try_from(vec: Vec<T>) -> Result<Self, Self::Error> {
        Self::try_from_iter(vec)
    }
}

impl<T, N> IntoIterator for ContiguousVector<T, N> {
    type Item = T;
    type IntoIter = <Vec<T> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_vec().into_iter()
    }
}

impl<'vector, T, N> IntoIterator for &'vector ContiguousVector<T, N> {
    type Item = &'vector T;
    type IntoIter = <&'vector [T] as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'de, T: Deserialize<'de>, N: Unsigned> Deserialize<'de> for ContiguousVector<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let elements = Vec::deserialize(deserializer)?;
        Self::try_from_iter(elements).map_err(D::Error::custom)
    }
}

impl<T: SszSize, N: Unsigned> SszSize for ContiguousVector<T, N> {
    const SIZE: Size = T::SIZE.mul(N::USIZE);
}

impl<T: SszRead, N: Unsigned> SszRead for ContiguousVector<T, N> {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        let results = shared::read_vector(bytes, N::USIZE)?;
        itertools::process_results(results, |elements| Self::try_from_iter(elements))?
    }
}

impl<T: SszWrite, N: Unsigned> SszWrite for ContiguousVector<T, N> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        shared::write_fixed_vector(bytes, self);
    }

    // A vector of variable-size elements is laid out the same way as a list.
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        shared::write_list(bytes, self)
    }
}

impl<T: SszHash + SszWrite, N: Unsigned> SszHash for ContiguousVector<T, N> {
    fn hash_tree_root(&self) -> H256 {
        if T::PACKING_FACTOR == 1 {
            let depth = merkle_tree::depth_for_chunk_count(N::USIZE);
            let chunks = self.iter().map(SszHash::hash_tree_root).collect::<Vec<_>>();
            MerkleTree::merkleize_chunks(depth, chunks)
        } else {
            let chunk_count = (N::USIZE * T::SIZE.fixed_part()).div_ceil(BYTES_PER_CHUNK);
            let depth = merkle_tree::depth_for_chunk_count(chunk_count);
            MerkleTree::merkleize_packed(depth, self)
        }
    }
}

impl<T, N: Unsigned> ContiguousVector<T, N> {
    pub fn try_from_iter(elements: impl IntoIterator<Item = T>) -> Result<Self, ReadError> {
        let elements = Box::from_iter(elements);

        let expected = N::USIZE;
        let actual = elements.len();

        if actual != expected {
            return Err(ReadError::VectorSizeMismatch { expected, actual });
        }

        Ok(Self {
            elements,
            phantom: PhantomData,
        })
    }

    #[must_use]
    pub fn repeat_element(element: T) -> Self
    where
        T: Clone,
    {
        Self {
            elements: vec![element; N::USIZE].into_boxed_slice(),
            phantom: PhantomData,
        }
    }

    /// Returns the element at `index` modulo `N`.
    ///
    /// Used for the circular buffers in the beacon state.
    #[must_use]
    pub fn mod_index(&self, index: u64) -> &T {
        &self.elements[Self::reduce(index)]
    }

    pub fn mod_index_mut(&mut self, index: u64) -> &mut T {
        &mut self.elements[Self::reduce(index)]
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "the remainder is less than N, which fits in usize"
    )]
    const fn reduce(index: u64) -> usize {
        (index % N::U64) as usize
    }
}
