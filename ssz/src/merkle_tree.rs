// Here's a visual aid to help understand the algorithms used here:
// ```text
//                                                  ┊
// height 3                     0                                       1
//                    ┌─────────┴─────────┐                   ┌─────────┴─────────┐
// height 2           0                   1                   2                   3
//               ┌────┴────┐         ┌────┴────┐         ┌────┴────┐         ┌────┴────┐
// height 1      0         1         2         3         4         5         6         7
//             ┌─┴─┐     ┌─┴─┐     ┌─┴─┐     ┌─┴─┐     ┌─┴─┐     ┌─┴─┐     ┌─┴─┐     ┌─┴─┐
// height 0    0   1     2   3     4   5     6   7     8   9    10   11   12   13   14   15
//           0000 0001 0010 0011 0100 0101 0110 0111 1000 1001 1010 1011 1100 1101 1110 1111
// ```
//
// Chunks are pushed left to right. After pushing chunk `i`, `sibling_hashes[h]` holds the root of
// the last complete subtree of height `h`, which is the left sibling of any node on the path from
// chunk `i + 1` to the root whose index has bit `h` set.

use ethereum_types::H256;
use hashing::ZERO_HASHES;

use crate::{
    consts::BYTES_PER_CHUNK,
    porcelain::{SszHash, SszWrite},
};

pub struct MerkleTree {
    depth: usize,
    // The elements are initialized to 0x00…00.
    // The initial values are never read as long as chunks are pushed in order.
    sibling_hashes: Vec<H256>,
}

impl MerkleTree {
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            sibling_hashes: vec![H256::zero(); depth],
        }
    }

    #[must_use]
    pub fn merkleize_bytes(depth: usize, bytes: impl AsRef<[u8]>) -> H256 {
        let chunks = bytes
            .as_ref()
            .chunks(BYTES_PER_CHUNK)
            .map(|partial_chunk| {
                let mut chunk = H256::zero();
                chunk[..partial_chunk.len()].copy_from_slice(partial_chunk);
                chunk
            })
            .collect::<Vec<_>>();

        Self::merkleize_chunks(depth, chunks)
    }

    #[must_use]
    pub fn merkleize_packed<T: SszHash + SszWrite>(depth: usize, values: &[T]) -> H256 {
        let size = T::SIZE.fixed_part();

        let chunks = values
            .chunks(T::PACKING_FACTOR)
            .map(|pack| {
                let mut chunk = H256::zero();

                chunk
                    .as_bytes_mut()
                    .chunks_exact_mut(size)
                    .zip(pack)
                    .for_each(|(destination, value)| value.write_fixed(destination));

                chunk
            })
            .collect::<Vec<_>>();

        Self::merkleize_chunks(depth, chunks)
    }

    /// Computes the root of a tree of height `depth` with `chunks` as its leftmost leaves.
    ///
    /// The remaining leaves are zero chunks. Panics if there are more than 2^`depth` chunks.
    pub fn merkleize_chunks(
        depth: usize,
        chunks: impl IntoIterator<
            IntoIter = impl DoubleEndedIterator<Item = H256> + ExactSizeIterator<Item = H256>,
        >,
    ) -> H256 {
        let mut chunks = chunks.into_iter();

        match chunks.next_back() {
            Some(last_chunk) => {
                let last_index = chunks.len();
                let mut merkle_tree = Self::new(depth);

                for (index, chunk) in chunks.enumerate() {
                    merkle_tree.push(index, chunk);
                }

                merkle_tree.push_and_compute_root(last_index, last_chunk)
            }
            None => ZERO_HASHES[depth],
        }
    }

    pub fn push(&mut self, index: usize, chunk: H256) -> (usize, H256) {
        assert!(
            self.depth >= usize::BITS as usize || index < 1 << self.depth,
            "chunk index {index} does not fit in tree of depth {}",
            self.depth,
        );

        let sibling_to_update = index.trailing_ones() as usize;

        let mut hash = chunk;

        for height in 0..sibling_to_update {
            hash = hashing::hash_256_256(self.sibling_hashes[height], hash);
        }

        if sibling_to_update < self.depth {
            self.sibling_hashes[sibling_to_update] = hash;
        }

        (sibling_to_update, hash)
    }

    pub fn push_and_compute_root(&mut self, index: usize, chunk: H256) -> H256 {
        let (updated_sibling, mut hash) = self.push(index, chunk);

        for height in updated_sibling..self.depth {
            // The first iteration always takes the else branch,
            // so `self.sibling_hashes[updated_sibling]` is never read here.
            if index >> height & 1 == 1 {
                hash = hashing::hash_256_256(self.sibling_hashes[height], hash);
            } else {
                hash = hashing::hash_256_256(hash, ZERO_HASHES[height]);
            }
        }

        hash
    }
}

/// Depth of the smallest tree with room for `chunk_count` chunks.
#[must_use]
pub const fn depth_for_chunk_count(chunk_count: usize) -> usize {
    chunk_count.next_power_of_two().trailing_zeros() as usize
}

#[must_use]
pub fn mix_in_length(root: H256, length: usize) -> H256 {
    let mut length_chunk = H256::zero();
    length_chunk[..8].copy_from_slice(&(length as u64).to_le_bytes());
    hashing::hash_256_256(root, length_chunk)
}

/// Constructs a branch proving the inclusion of `leaves[index]` in a tree of height `depth`.
///
/// The branch lists sibling hashes from the bottom up.
/// Leaves past the end of `leaves` are zero chunks.
#[must_use]
pub fn merkle_proof(depth: usize, leaves: &[H256], mut index: usize) -> Vec<H256> {
    let mut proof = Vec::with_capacity(depth);
    let mut level = leaves.to_vec();

    for height in 0..depth {
        let sibling = level
            .get(index ^ 1)
            .copied()
            .unwrap_or(ZERO_HASHES[height]);

        proof.push(sibling);

        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hashing::hash_256_256(*left, *right),
                [left] => hashing::hash_256_256(*left, ZERO_HASHES[height]),
                _ => unreachable!("chunks(2) yields slices of length 1 or 2"),
            })
            .collect();

        index /= 2;
    }

    proof
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn chunk(byte: u8) -> H256 {
        H256::repeat_byte(byte)
    }

    fn naive_root(depth: usize, leaves: &[H256]) -> H256 {
        let mut level = leaves.to_vec();
        level.resize(1 << depth, H256::zero());

        while level.len() > 1 {
            level = level
                .chunks_exact(2)
                .map(|pair| hashing::hash_256_256(pair[0], pair[1]))
                .collect();
        }

        level[0]
    }

    #[test_case(0, 1)]
    #[test_case(1, 1)]
    #[test_case(2, 3)]
    #[test_case(3, 5)]
    #[test_case(3, 8)]
    #[test_case(4, 11)]
    fn incremental_root_matches_naive_root(depth: usize, chunk_count: u8) {
        let leaves = (1..=chunk_count).map(chunk).collect::<Vec<_>>();

        assert_eq!(
            MerkleTree::merkleize_chunks(depth, leaves.clone()),
            naive_root(depth, &leaves),
        );
    }

    #[test]
    fn empty_tree_is_zero_hash() {
        assert_eq!(MerkleTree::merkleize_chunks(5, []), ZERO_HASHES[5]);
    }

    #[test_case(0, 0)]
    #[test_case(0, 1)]
    #[test_case(1, 2)]
    #[test_case(2, 3)]
    #[test_case(2, 4)]
    #[test_case(3, 5)]
    #[test_case(8, 256)]
    #[test_case(9, 257)]
    fn depth_for_chunk_count_rounds_up(depth: usize, chunk_count: usize) {
        assert_eq!(depth_for_chunk_count(chunk_count), depth);
    }

    #[test]
    fn merkle_proof_leads_to_root() {
        let depth = 4;
        let leaves = (1..=6).map(chunk).collect::<Vec<_>>();
        let root = naive_root(depth, &leaves);

        for (index, leaf) in leaves.iter().copied().enumerate() {
            let proof = merkle_proof(depth, &leaves, index);

            let computed = proof
                .iter()
                .enumerate()
                .fold(leaf, |node, (height, sibling)| {
                    if index >> height & 1 == 1 {
                        hashing::hash_256_256(*sibling, node)
                    } else {
                        hashing::hash_256_256(node, *sibling)
                    }
                });

            assert_eq!(computed, root);
        }
    }
}
