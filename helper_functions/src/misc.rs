use core::{num::NonZeroU64, ops::Div as _};

use anyhow::{ensure, Result};
use num_integer::Roots as _;
use ssz::SszHash;
use tap::{Pipe as _, TryConv as _};
use typenum::Unsigned as _;
use types::{
    phase0::{
        beacon_state::BeaconState,
        containers::{ForkData, SigningData},
        primitives::{Domain, DomainType, Epoch, Slot, ValidatorIndex, Version, H256},
    },
    preset::Preset,
};

use crate::{accessors, error::Error};

/// Largest `r` such that `r * r <= n`.
///
/// Accepts any integer type. Negative values are rejected.
pub fn integer_squareroot<T: TryInto<u64>>(n: T) -> Result<u64> {
    let n = n
        .try_into()
        .map_err(|_| Error::invalid_argument("integer_squareroot of a negative number"))?;

    Ok(n.sqrt())
}

#[must_use]
pub const fn min(a: u64, b: u64) -> u64 {
    if a <= b {
        a
    } else {
        b
    }
}

#[must_use]
pub const fn max(a: u64, b: u64) -> u64 {
    if a >= b {
        a
    } else {
        b
    }
}

/// Encodes `value` in little-endian order using exactly `length` bytes.
///
/// High-order bytes are dropped if `length` is less than 8. Zeros are appended if it is greater.
#[must_use]
pub fn int_to_bytes(value: u64, length: usize) -> Vec<u8> {
    let mut bytes = value.to_le_bytes().to_vec();
    bytes.resize(length, 0);
    bytes
}

#[must_use]
pub fn int_to_bytes32(value: u64) -> H256 {
    H256::from_slice(&int_to_bytes(value, H256::len_bytes()))
}

pub fn bytes_to_int(bytes: &[u8]) -> Result<u64> {
    ensure!(
        bytes.len() <= size_of::<u64>(),
        Error::invalid_argument("bytes_to_int of more than 8 bytes"),
    );

    let mut buffer = [0; size_of::<u64>()];
    buffer[..bytes.len()].copy_from_slice(bytes);
    Ok(u64::from_le_bytes(buffer))
}

#[must_use]
pub const fn is_power_of_two(n: u64) -> bool {
    n.is_power_of_two()
}

#[must_use]
pub fn compute_epoch_at_slot<P: Preset>(slot: Slot) -> Epoch {
    slot / P::SlotsPerEpoch::U64
}

#[must_use]
pub const fn compute_start_slot_at_epoch<P: Preset>(epoch: Epoch) -> Slot {
    epoch.saturating_mul(P::SlotsPerEpoch::U64)
}

#[must_use]
pub const fn compute_activation_exit_epoch<P: Preset>(epoch: Epoch) -> Epoch {
    epoch + 1 + P::MAX_SEED_LOOKAHEAD
}

fn compute_fork_data_root(current_version: Version, genesis_validators_root: H256) -> H256 {
    ForkData {
        current_version,
        genesis_validators_root,
    }
    .hash_tree_root()
}

/// Combines `domain_type` with the first 28 bytes of the fork data root.
#[must_use]
pub fn compute_domain(
    domain_type: DomainType,
    fork_version: Version,
    genesis_validators_root: H256,
) -> Domain {
    let fork_data_root = compute_fork_data_root(fork_version, genesis_validators_root);

    let mut domain = Domain::zero();
    domain[..DomainType::len_bytes()].copy_from_slice(domain_type.as_bytes());
    domain[DomainType::len_bytes()..].copy_from_slice(&fork_data_root[..28]);
    domain
}

pub fn compute_signing_root(object: &(impl SszHash + ?Sized), domain: Domain) -> H256 {
    SigningData {
        object_root: object.hash_tree_root(),
        domain,
    }
    .hash_tree_root()
}

pub fn compute_shuffled_index<P: Preset>(
    index: u64,
    index_count: u64,
    seed: H256,
) -> Result<u64> {
    shuffling::shuffled_index::<P>(index, index_count, seed)
}

/// Selects the `index`-th of `count` equally sized committees from shuffled `indices`.
pub fn compute_committee<P: Preset>(
    indices: &[ValidatorIndex],
    seed: H256,
    index: u64,
    count: u64,
) -> Result<Vec<ValidatorIndex>> {
    ensure!(index < count, Error::CommitteeIndexOutOfBounds { index });

    let total = indices.len().try_conv::<u64>()?;
    let start = total * index / count;
    let end = total * (index + 1) / count;

    (start..end)
        .map(|position| {
            let shuffled = compute_shuffled_index::<P>(position, total, seed)?;
            Ok(indices[shuffled.try_conv::<usize>()?])
        })
        .collect()
}

pub fn compute_proposer_index<P: Preset>(
    state: &BeaconState<P>,
    indices: &[ValidatorIndex],
    seed: H256,
) -> Result<ValidatorIndex> {
    let total = indices
        .len()
        .try_conv::<u64>()?
        .pipe(NonZeroU64::new)
        .ok_or(Error::NoActiveValidators)?;

    let max_random_byte = u64::from(u8::MAX);

    for (attempt, quotient) in (0..u64::MAX / H256::len_bytes() as u64).enumerate() {
        let random_bytes = hashing::hash_256_64(seed, quotient);

        for (offset, random_byte) in (0..).zip(random_bytes.to_fixed_bytes()) {
            let attempt = attempt.try_conv::<u64>()? * H256::len_bytes() as u64 + offset;
            let shuffled = compute_shuffled_index::<P>(attempt % total, total.get(), seed)?;
            let candidate_index = indices[shuffled.try_conv::<usize>()?];
            let effective_balance = accessors::validator(state, candidate_index)?.effective_balance;

            if effective_balance * max_random_byte
                >= P::MAX_EFFECTIVE_BALANCE * u64::from(random_byte)
            {
                return Ok(candidate_index);
            }
        }
    }

    Err(Error::FailedToSelectProposer.into())
}

#[must_use]
pub fn committee_count_from_active_validator_count<P: Preset>(active_validator_count: u64) -> u64 {
    active_validator_count
        .div(P::SlotsPerEpoch::U64)
        .div(P::TARGET_COMMITTEE_SIZE)
        .clamp(1, P::MAX_COMMITTEES_PER_SLOT.get())
}
