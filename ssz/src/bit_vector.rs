use core::{
    fmt::{Debug, Formatter, Result as FmtResult},
    marker::PhantomData,
};

use bitvec::{order::Lsb0, view::BitView as _};
use derivative::Derivative;
use ethereum_types::H256;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use typenum::Unsigned;

use crate::{
    consts::{BITS_PER_BYTE, BITS_PER_CHUNK},
    error::ReadError,
    merkle_tree::{self, MerkleTree},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// Exactly `N` bits. `N` must not be zero.
#[derive(Derivative)]
#[derivative(Clone(bound = ""), PartialEq(bound = ""), Eq(bound = ""), Hash(bound = ""))]
pub struct BitVector<N> {
    // Bits past `N` are always zero.
    bytes: Box<[u8]>,
    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    phantom: PhantomData<N>,
}

impl<N: Unsigned> Default for BitVector<N> {
    fn default() -> Self {
        Self {
            bytes: vec![0; Self::byte_count()].into_boxed_slice(),
            phantom: PhantomData,
        }
    }
}

impl<N: Unsigned> Debug for BitVector<N> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str("0b")?;

        for index in 0..N::USIZE {
            formatter.write_str(if self.bit(index) { "1" } else { "0" })?;
        }

        Ok(())
    }
}

impl<N> Serialize for BitVector<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_utils::prefixed_hex_or_bytes_slice::serialize(&self.bytes, serializer)
    }
}

impl<'de, N: Unsigned> Deserialize<'de> for BitVector<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = serde_utils::prefixed_hex_or_bytes_cow::deserialize(deserializer)?;
        Self::from_ssz(bytes).map_err(D::Error::custom)
    }
}

impl<N: Unsigned> SszSize for BitVector<N> {
    const SIZE: Size = Size::Fixed {
        size: N::USIZE.div_ceil(BITS_PER_BYTE),
    };
}

impl<N: Unsigned> SszRead for BitVector<N> {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        let expected = N::USIZE;

        if bytes.view_bits::<Lsb0>()[expected..].any() {
            return Err(ReadError::BitVectorPaddingNotZero { expected });
        }

        Ok(Self {
            bytes: bytes.into(),
            phantom: PhantomData,
        })
    }
}

impl<N: Unsigned> SszWrite for BitVector<N> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(&self.bytes);
    }
}

impl<N: Unsigned> SszHash for BitVector<N> {
    fn hash_tree_root(&self) -> H256 {
        let chunk_count = N::USIZE.div_ceil(BITS_PER_CHUNK);
        let depth = merkle_tree::depth_for_chunk_count(chunk_count);
        MerkleTree::merkleize_bytes(depth, &self.bytes)
    }
}

impl<N: Unsigned> BitVector<N> {
    #[must_use]
    pub fn get(&self, index: usize) -> Option<bool> {
        (index < N::USIZE).then(|| self.bit(index))
    }

    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < N::USIZE);

        self.bytes.view_bits_mut::<Lsb0>().set(index, value);
    }

    #[must_use]
    pub fn any(&self) -> bool {
        self.bytes.iter().any(|byte| *byte > 0)
    }

    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.bytes.view_bits::<Lsb0>().count_ones()
    }

    /// Shifts every bit to the next higher index, dropping the highest one and clearing bit 0.
    pub fn shift_up_by_1(&mut self) {
        let bits = &mut self.bytes.view_bits_mut::<Lsb0>()[..N::USIZE];
        bits.shift_right(1);
    }

    fn bit(&self, index: usize) -> bool {
        self.bytes.view_bits::<Lsb0>()[index]
    }

    const fn byte_count() -> usize {
        N::USIZE.div_ceil(BITS_PER_BYTE)
    }
}
