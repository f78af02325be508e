use core::ops::Div as _;

use anyhow::{ensure, Result};
use itertools::Itertools as _;
use ssz::{BitList, ContiguousList};
use tap::TryConv as _;
use typenum::Unsigned as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::{DOMAIN_BEACON_ATTESTER, DOMAIN_BEACON_PROPOSER, GENESIS_EPOCH},
        containers::{Attestation, AttestationData, IndexedAttestation, Validator},
        primitives::{
            CommitteeIndex, Domain, DomainType, Epoch, Gwei, PublicKeyBytes, Slot, ValidatorIndex,
            H256,
        },
    },
    preset::Preset,
};

use crate::{error::Error, misc, predicates};

#[must_use]
pub fn get_current_epoch<P: Preset>(state: &BeaconState<P>) -> Epoch {
    misc::compute_epoch_at_slot::<P>(state.slot)
}

#[must_use]
pub fn get_previous_epoch<P: Preset>(state: &BeaconState<P>) -> Epoch {
    get_current_epoch(state)
        .saturating_sub(1)
        .max(GENESIS_EPOCH)
}

#[must_use]
pub fn get_next_epoch<P: Preset>(state: &BeaconState<P>) -> Epoch {
    get_current_epoch(state) + 1
}

pub fn validator<P: Preset>(
    state: &BeaconState<P>,
    validator_index: ValidatorIndex,
) -> Result<&Validator> {
    validator_index
        .try_conv::<usize>()
        .ok()
        .and_then(|index| state.validators.get(index))
        .ok_or_else(|| Error::ValidatorIndexOutOfBounds { index: validator_index }.into())
}

pub fn balance<P: Preset>(state: &BeaconState<P>, validator_index: ValidatorIndex) -> Result<Gwei> {
    validator_index
        .try_conv::<usize>()
        .ok()
        .and_then(|index| state.balances.get(index))
        .copied()
        .ok_or_else(|| Error::ValidatorIndexOutOfBounds { index: validator_index }.into())
}

#[must_use]
pub fn index_of_public_key<P: Preset>(
    state: &BeaconState<P>,
    public_key: PublicKeyBytes,
) -> Option<ValidatorIndex> {
    (0..)
        .zip(state.validators.iter())
        .find_map(|(validator_index, validator)| {
            (validator.pubkey == public_key).then_some(validator_index)
        })
}

pub fn get_block_root_at_slot<P: Preset>(state: &BeaconState<P>, slot: Slot) -> Result<H256> {
    ensure!(slot < state.slot, Error::SlotOutOfRange { slot });

    ensure!(
        state.slot <= slot + P::SlotsPerHistoricalRoot::U64,
        Error::SlotOutOfRange { slot },
    );

    Ok(*state.block_roots.mod_index(slot))
}

/// Root of the block at the start of `epoch` or the latest block before it.
pub fn get_block_root<P: Preset>(state: &BeaconState<P>, epoch: Epoch) -> Result<H256> {
    get_block_root_at_slot(state, misc::compute_start_slot_at_epoch::<P>(epoch))
}

#[must_use]
pub fn get_randao_mix<P: Preset>(state: &BeaconState<P>, epoch: Epoch) -> H256 {
    *state.randao_mixes.mod_index(epoch)
}

pub fn get_active_validator_indices<P: Preset>(
    state: &BeaconState<P>,
    epoch: Epoch,
) -> impl Iterator<Item = ValidatorIndex> + '_ {
    (0..)
        .zip(state.validators.iter())
        .filter(move |(_, validator)| predicates::is_active_validator(validator, epoch))
        .map(|(index, _)| index)
}

#[must_use]
pub fn get_validator_churn_limit<P: Preset>(config: &Config, state: &BeaconState<P>) -> u64 {
    get_active_validator_indices(state, get_current_epoch(state))
        .count()
        .try_conv::<u64>()
        .unwrap_or(u64::MAX)
        .div(config.churn_limit_quotient)
        .max(config.min_per_epoch_churn_limit)
}

#[must_use]
pub fn get_seed<P: Preset>(state: &BeaconState<P>, epoch: Epoch, domain_type: DomainType) -> H256 {
    let mix = get_randao_mix(
        state,
        epoch + P::EpochsPerHistoricalVector::U64 - P::MIN_SEED_LOOKAHEAD - 1,
    );

    hashing::hash_32_64_256(domain_type.to_fixed_bytes(), epoch, mix)
}

#[must_use]
pub fn get_committee_count_per_slot<P: Preset>(state: &BeaconState<P>, epoch: Epoch) -> u64 {
    let active_validator_count = get_active_validator_indices(state, epoch)
        .count()
        .try_conv::<u64>()
        .unwrap_or(u64::MAX);

    misc::committee_count_from_active_validator_count::<P>(active_validator_count)
}

/// Committees can only be computed for the previous, current and next epochs.
fn ensure_epoch_in_range<P: Preset>(state: &BeaconState<P>, epoch: Epoch) -> Result<()> {
    ensure!(
        epoch <= get_next_epoch(state),
        Error::EpochAfterNext { epoch },
    );

    ensure!(
        get_previous_epoch(state) <= epoch,
        Error::EpochBeforePrevious { epoch },
    );

    Ok(())
}

pub fn beacon_committee<P: Preset>(
    state: &BeaconState<P>,
    slot: Slot,
    committee_index: CommitteeIndex,
) -> Result<Vec<ValidatorIndex>> {
    let epoch = misc::compute_epoch_at_slot::<P>(slot);

    ensure_epoch_in_range(state, epoch)?;

    let committees_per_slot = get_committee_count_per_slot(state, epoch);

    ensure!(
        committee_index < committees_per_slot,
        Error::CommitteeIndexOutOfBounds {
            index: committee_index,
        },
    );

    let indices = get_active_validator_indices(state, epoch).collect_vec();
    let seed = get_seed(state, epoch, DOMAIN_BEACON_ATTESTER);
    let slot_in_epoch = slot % P::SlotsPerEpoch::U64;

    misc::compute_committee::<P>(
        &indices,
        seed,
        slot_in_epoch * committees_per_slot + committee_index,
        committees_per_slot * P::SlotsPerEpoch::U64,
    )
}

pub fn get_beacon_proposer_index<P: Preset>(state: &BeaconState<P>) -> Result<ValidatorIndex> {
    let epoch = get_current_epoch(state);
    let seed = hashing::hash_256_64(get_seed(state, epoch, DOMAIN_BEACON_PROPOSER), state.slot);
    let indices = get_active_validator_indices(state, epoch).collect_vec();

    misc::compute_proposer_index(state, &indices, seed)
}

/// Sums balances of the given validators, counting at most `MAX_EFFECTIVE_BALANCE` for each.
pub fn get_total_balance<P: Preset>(
    state: &BeaconState<P>,
    indices: impl IntoIterator<Item = ValidatorIndex>,
) -> Result<Gwei> {
    indices.into_iter().try_fold(0, |total: Gwei, validator_index| {
        let balance = balance(state, validator_index)?;
        Ok(total + misc::min(balance, P::MAX_EFFECTIVE_BALANCE))
    })
}

/// Like [`get_total_balance`] for all active validators, but never less than one increment.
///
/// The result is used as a divisor.
pub fn get_total_active_balance<P: Preset>(state: &BeaconState<P>) -> Result<Gwei> {
    let active = get_active_validator_indices(state, get_current_epoch(state));

    Ok(get_total_balance(state, active)?.max(P::EFFECTIVE_BALANCE_INCREMENT.get()))
}

/// Selects the fork version that was active at `epoch` and combines it with `domain_type`.
///
/// `epoch` defaults to the current epoch of `state`.
#[must_use]
pub fn get_domain<P: Preset>(
    state: &BeaconState<P>,
    domain_type: DomainType,
    epoch: Option<Epoch>,
) -> Domain {
    let epoch = epoch.unwrap_or_else(|| get_current_epoch(state));
    let fork = state.fork;

    let fork_version = if epoch < fork.epoch {
        fork.previous_version
    } else {
        fork.current_version
    };

    misc::compute_domain(domain_type, fork_version, state.genesis_validators_root)
}

#[must_use]
pub const fn get_attestation_data_slot(data: &AttestationData) -> Slot {
    data.slot
}

/// Members of the attesting committee whose bits are set, in committee order.
pub fn get_attesting_indices<P: Preset>(
    state: &BeaconState<P>,
    data: &AttestationData,
    aggregation_bits: &BitList<P::MaxValidatorsPerCommittee>,
) -> Result<Vec<ValidatorIndex>> {
    let committee = beacon_committee(state, data.slot, data.index)?;

    ensure!(
        committee.len() == aggregation_bits.len(),
        Error::CommitteeLengthMismatch {
            aggregation_bitlist_length: aggregation_bits.len(),
            committee_length: committee.len(),
        },
    );

    Ok(aggregation_bits
        .iter()
        .by_vals()
        .zip(committee)
        .filter_map(|(present, validator_index)| present.then_some(validator_index))
        .collect())
}

pub fn get_indexed_attestation<P: Preset>(
    state: &BeaconState<P>,
    attestation: &Attestation<P>,
) -> Result<IndexedAttestation<P>> {
    let mut attesting_indices =
        get_attesting_indices(state, &attestation.data, &attestation.aggregation_bits)?;

    attesting_indices.sort_unstable();

    Ok(IndexedAttestation {
        attesting_indices: ContiguousList::try_from(attesting_indices)?,
        data: attestation.data,
        signature: attestation.signature,
    })
}
