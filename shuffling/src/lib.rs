//! Swap-or-not shuffling.
//!
//! Every round pairs up positions `i` and `pivot - i` (mod the list length) and swaps each pair
//! depending on one bit of a hash. The bit is chosen by the higher position in the pair, so both
//! members of a pair make the same decision. That makes every round an involution, which is what
//! lets [`shuffle_slice`] apply the whole permutation in place.

use core::{
    num::NonZeroU64,
    ops::{Index as _, Rem as _},
};

use anyhow::{ensure, Result};
use bit_field::BitArray as _;
use tap::TryConv as _;
use thiserror::Error;
use types::{phase0::primitives::H256, preset::Preset};

const BITS_PER_HASH: u64 = H256::len_bytes() as u64 * 8;

#[derive(PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("cannot shuffle an empty list")]
    IndexCountZero,
    #[error("index {index} is out of bounds for a list of {index_count}")]
    IndexOutOfBounds { index: u64, index_count: u64 },
}

/// Computes the position that the element at `index` moves to.
///
/// Runs every round for a single index. Use [`shuffle_slice`] to shuffle a whole list.
pub fn shuffled_index<P: Preset>(mut index: u64, index_count: u64, seed: H256) -> Result<u64> {
    let index_count = NonZeroU64::new(index_count).ok_or(Error::IndexCountZero)?;

    ensure!(
        index < index_count.get(),
        Error::IndexOutOfBounds {
            index,
            index_count: index_count.get(),
        },
    );

    for round in 0..P::SHUFFLE_ROUND_COUNT {
        let pivot = compute_pivot(seed, round, index_count);
        let flip = (pivot + index_count.get() - index) % index_count;
        let position = index.max(flip);
        let source = compute_source(seed, round, position / BITS_PER_HASH);

        if source_bit(source, position) {
            index = flip;
        }
    }

    Ok(index)
}

/// Returns the permutation `p` of `0..list_size` where `p[i] == shuffled_index(i, list_size, seed)`.
pub fn shuffle<P: Preset>(list_size: u64, seed: H256) -> Result<Vec<u64>> {
    let mut permutation = (0..list_size).collect::<Vec<_>>();
    shuffle_slice::<P, _>(&mut permutation, seed)?;
    Ok(permutation)
}

/// Shuffles `slice` in place so that `slice[i]` ends up holding the element that was at
/// `shuffled_index(i, slice.len(), seed)`.
///
/// This is the order in which committees are drawn from the list of active validators.
pub fn shuffle_slice<P: Preset, T>(slice: &mut [T], seed: H256) -> Result<()> {
    let Some(length) = slice.len().try_conv::<u64>().map(NonZeroU64::new)? else {
        return Ok(());
    };

    // Rounds are involutions, so applying them in reverse order composes them the other way.
    for round in (0..P::SHUFFLE_ROUND_COUNT).rev() {
        let pivot = compute_pivot(seed, round, length);

        // Sources are shared by 256 consecutive positions. Remember the last one.
        let mut cached_source = None;

        for index in 0..length.get() {
            let flip = (pivot + length.get() - index) % length;

            // Each pair is visited twice. Only act on it the first time.
            if flip <= index {
                continue;
            }

            let position = flip;
            let window = position / BITS_PER_HASH;

            let source = match cached_source {
                Some((cached_window, source)) if cached_window == window => source,
                _ => {
                    let source = compute_source(seed, round, window);
                    cached_source = Some((window, source));
                    source
                }
            };

            if source_bit(source, position) {
                slice.swap(index.try_into()?, flip.try_into()?);
            }
        }
    }

    Ok(())
}

fn source_bit(source: H256, position: u64) -> bool {
    let bit_index = position % BITS_PER_HASH;

    // The remainder is below 256.
    #[expect(clippy::cast_possible_truncation)]
    source.as_bytes().get_bit(bit_index as usize)
}

fn compute_pivot(seed: H256, round: u8, index_count: NonZeroU64) -> u64 {
    let mut bytes = [0; size_of::<u64>()];
    bytes.copy_from_slice(hashing::hash_256_8(seed, round).index(..size_of::<u64>()));
    u64::from_le_bytes(bytes).rem(index_count)
}

fn compute_source(seed: H256, round: u8, position_window: u64) -> H256 {
    // Windows are hashed as 4 bytes. Truncation only matters for lists longer than 2^40.
    #[expect(clippy::cast_possible_truncation)]
    let position_window = position_window as u32;

    hashing::hash_256_8_32(seed, round, position_window)
}
