//! SHA-256 over the handful of input shapes that consensus code hashes.
//!
//! Every function here feeds its arguments to the hasher in the order they are declared.
//! Integers are always hashed in little-endian byte order.

use ethereum_types::H256;
use once_cell::sync::Lazy;
use sha2::{Digest as _, Sha256};
use tap::Pipe as _;

/// Depth of the deepest Merkle tree in the system plus one.
///
/// `BeaconState.validators` has a limit of 2⁴⁰ and `hash_tree_root` of an empty list of that
/// length needs `ZERO_HASHES[40]`.
pub const MAX_ZERO_HASH_DEPTH: usize = 40;

/// Roots of perfect binary trees of zero chunks, indexed by height.
///
/// `ZERO_HASHES[0]` is the zero chunk itself.
pub static ZERO_HASHES: Lazy<[H256; MAX_ZERO_HASH_DEPTH + 1]> = Lazy::new(|| {
    let mut hashes = [H256::zero(); MAX_ZERO_HASH_DEPTH + 1];

    for height in 1..hashes.len() {
        let lower = hashes[height - 1];
        hashes[height] = hash_256_256(lower, lower);
    }

    hashes
});

#[must_use]
pub fn hash_bytes(bytes: impl AsRef<[u8]>) -> H256 {
    H256(Sha256::digest(bytes).into())
}

#[inline]
#[must_use]
pub fn hash_256(bytes: H256) -> H256 {
    hash_bytes(bytes)
}

#[inline]
#[must_use]
pub fn hash_256_8(a: H256, b: u8) -> H256 {
    Sha256::new()
        .chain_update(a)
        .chain_update([b])
        .pipe(finish)
}

#[inline]
#[must_use]
pub fn hash_256_8_32(a: H256, b: u8, c: u32) -> H256 {
    Sha256::new()
        .chain_update(a)
        .chain_update([b])
        .chain_update(c.to_le_bytes())
        .pipe(finish)
}

#[inline]
#[must_use]
pub fn hash_256_64(a: H256, b: u64) -> H256 {
    Sha256::new()
        .chain_update(a)
        .chain_update(b.to_le_bytes())
        .pipe(finish)
}

#[inline]
#[must_use]
pub fn hash_32_64_256(a: [u8; 4], b: u64, c: H256) -> H256 {
    Sha256::new()
        .chain_update(a)
        .chain_update(b.to_le_bytes())
        .chain_update(c)
        .pipe(finish)
}

#[inline]
#[must_use]
pub fn hash_256_256(left: H256, right: H256) -> H256 {
    Sha256::new()
        .chain_update(left)
        .chain_update(right)
        .pipe(finish)
}

#[inline]
fn finish(hasher: Sha256) -> H256 {
    H256(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use itertools::Itertools as _;
    use test_case::test_case;

    use super::*;

    #[test]
    fn higher_zero_hashes_are_calculated_from_lower_ones() {
        for (lower, higher) in ZERO_HASHES.iter().copied().tuple_windows() {
            assert_eq!(hash_256_256(lower, lower), higher);
        }
    }

    #[test_case(
        1,
        H256(hex!("f5a5fd42d16a20302798ef6ed309979b43003d2320d9f0e8ea9831a92759fb4b"));
        "height 1"
    )]
    #[test_case(
        2,
        H256(hex!("db56114e00fdd4c1f85c892bf35ac9a89289aaecb1ebd0a96cde606a748b5d71"));
        "height 2"
    )]
    #[test_case(
        40,
        H256(hex!("6bfe8d2bcc4237b74a5047058ef455339ecd7360cb63bfbb8ee5448e6430ba04"));
        "height 40"
    )]
    fn zero_hash_matches_known_value(height: usize, expected: H256) {
        assert_eq!(ZERO_HASHES[height], expected);
    }

    #[test]
    fn fixed_shape_functions_agree_with_hashing_concatenated_bytes() {
        let a = H256::repeat_byte(0xaa);
        let b = H256::repeat_byte(0xbb);

        assert_eq!(hash_256_256(a, b), hash_bytes([a.as_bytes(), b.as_bytes()].concat()));

        assert_eq!(
            hash_256_8_32(a, 7, 0x0102_0304),
            hash_bytes([a.as_bytes(), &[7], &[4, 3, 2, 1]].concat()),
        );

        assert_eq!(
            hash_32_64_256([1, 2, 3, 4], 5, b),
            hash_bytes([&[1, 2, 3, 4], &5_u64.to_le_bytes()[..], b.as_bytes()].concat()),
        );
    }
}
