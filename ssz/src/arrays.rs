// Impls for types that correspond to the `BytesN` types from the SSZ specification.
// They are not basic types, so they are not packed.

use ethereum_types::{H160, H256, H32};

use crate::{
    consts::BYTES_PER_CHUNK,
    error::ReadError,
    merkle_tree::{depth_for_chunk_count, MerkleTree},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

macro_rules! impl_for_fixed_hash {
    ($type: ty) => {
        impl SszSize for $type {
            const SIZE: Size = Size::Fixed {
                size: <$type>::len_bytes(),
            };
        }

        impl SszRead for $type {
            #[inline]
            fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
                Ok(Self::from_slice(bytes))
            }
        }

        impl SszWrite for $type {
            #[inline]
            fn write_fixed(&self, bytes: &mut [u8]) {
                bytes.copy_from_slice(self.as_bytes());
            }
        }

        impl SszHash for $type {
            #[inline]
            fn hash_tree_root(&self) -> H256 {
                hash_fixed_bytes(self.as_bytes())
            }
        }
    };
}

impl_for_fixed_hash!(H32);
impl_for_fixed_hash!(H160);
impl_for_fixed_hash!(H256);

/// Root of a `BytesN` value.
///
/// Values that fit in one chunk are their own root after right-padding with zeros.
#[must_use]
pub fn hash_fixed_bytes(bytes: &[u8]) -> H256 {
    let chunk_count = bytes.len().div_ceil(BYTES_PER_CHUNK);
    MerkleTree::merkleize_bytes(depth_for_chunk_count(chunk_count), bytes)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn h256_is_its_own_root() {
        let hash = H256(hex!(
            "0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f20"
        ));

        assert_eq!(hash.hash_tree_root(), hash);
    }

    #[test]
    fn h32_root_is_right_padded() {
        let mut expected = H256::zero();
        expected[..4].copy_from_slice(&hex!("01020304"));

        assert_eq!(H32(hex!("01020304")).hash_tree_root(), expected);
    }

    #[test]
    fn bytes48_root_merkleizes_two_chunks() {
        let bytes = [0xab; 48];

        let mut second_chunk = H256::zero();
        second_chunk[..16].copy_from_slice(&bytes[32..]);

        assert_eq!(
            hash_fixed_bytes(&bytes),
            hashing::hash_256_256(H256::repeat_byte(0xab), second_chunk),
        );
    }
}
