//! Per-validator data gathered in a single pass before the epoch transition mutates anything.

use anyhow::Result;
use helper_functions::{
    accessors::{
        get_attesting_indices, get_block_root, get_block_root_at_slot, get_current_epoch,
        get_previous_epoch,
    },
    predicates::{is_active_validator, is_in_inactivity_leak},
};
use itertools::izip;
use num_integer::Roots as _;
use types::{
    phase0::{
        beacon_state::BeaconState,
        containers::Validator,
        primitives::{Gwei, ValidatorIndex},
    },
    preset::Preset,
};

const BASE_REWARDS_PER_EPOCH: u64 = 4;

/// Balances of the validators that took part in the attestations of the last two epochs.
///
/// Slashed validators are never counted as attesters.
#[derive(Clone, Copy, Default, Debug)]
pub struct Statistics {
    pub previous_epoch_source_attesting_balance: Gwei,
    pub previous_epoch_target_attesting_balance: Gwei,
    pub previous_epoch_head_attesting_balance: Gwei,
    pub current_epoch_active_balance: Gwei,
    pub current_epoch_target_attesting_balance: Gwei,
}

#[derive(Clone, Copy, Debug)]
pub struct Inclusion {
    pub delay: u64,
    pub proposer_index: ValidatorIndex,
}

#[derive(Clone, Copy, Default, Debug)]
pub struct ValidatorSummary {
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub eligible_for_penalties: bool,
    pub previous_epoch_matching_source: bool,
    pub previous_epoch_matching_target: bool,
    pub previous_epoch_matching_head: bool,
    pub current_epoch_matching_target: bool,
    pub fastest_inclusion: Option<Inclusion>,
}

impl ValidatorSummary {
    fn new<P: Preset>(validator: &Validator, state: &BeaconState<P>) -> Self {
        let previous_epoch = get_previous_epoch(state);

        let eligible_for_penalties = is_active_validator(validator, previous_epoch)
            || (validator.slashed && previous_epoch + 1 < validator.withdrawable_epoch);

        Self {
            effective_balance: validator.effective_balance,
            slashed: validator.slashed,
            eligible_for_penalties,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct EpochDeltas {
    pub reward: Gwei,
    pub penalty: Gwei,
}

pub fn statistics<P: Preset>(
    state: &BeaconState<P>,
) -> Result<(Statistics, Vec<ValidatorSummary>)> {
    let current_epoch = get_current_epoch(state);

    let mut statistics = Statistics::default();

    let mut summaries = state
        .validators
        .iter()
        .map(|validator| {
            if is_active_validator(validator, current_epoch) {
                statistics.current_epoch_active_balance += validator.effective_balance;
            }

            ValidatorSummary::new(validator, state)
        })
        .collect::<Vec<_>>();

    // `get_block_root` fails during the first epoch because the block root of the epoch's first
    // slot is not cached yet. Nothing can be rewarded then, so the attestations are skipped.
    if let Ok(previous_epoch_target_root) = get_block_root(state, get_previous_epoch(state)) {
        for attestation in &state.previous_epoch_attestations {
            let matching_target = attestation.data.target.root == previous_epoch_target_root;
            let matching_head = matching_target
                && attestation.data.beacon_block_root
                    == get_block_root_at_slot(state, attestation.data.slot)?;

            let inclusion = Inclusion {
                delay: attestation.inclusion_delay,
                proposer_index: attestation.proposer_index,
            };

            for validator_index in
                get_attesting_indices(state, &attestation.data, &attestation.aggregation_bits)?
            {
                let summary = summary_mut(&mut summaries, validator_index)?;

                if summary.slashed {
                    continue;
                }

                summary.previous_epoch_matching_source = true;
                summary.previous_epoch_matching_target |= matching_target;
                summary.previous_epoch_matching_head |= matching_head;

                let faster = summary
                    .fastest_inclusion
                    .map_or(true, |fastest| inclusion.delay < fastest.delay);

                if faster {
                    summary.fastest_inclusion = Some(inclusion);
                }
            }
        }
    }

    if let Ok(current_epoch_target_root) = get_block_root(state, current_epoch) {
        for attestation in &state.current_epoch_attestations {
            if attestation.data.target.root != current_epoch_target_root {
                continue;
            }

            for validator_index in
                get_attesting_indices(state, &attestation.data, &attestation.aggregation_bits)?
            {
                let summary = summary_mut(&mut summaries, validator_index)?;

                if !summary.slashed {
                    summary.current_epoch_matching_target = true;
                }
            }
        }
    }

    for summary in &summaries {
        let balance = summary.effective_balance;

        if summary.previous_epoch_matching_source {
            statistics.previous_epoch_source_attesting_balance += balance;
        }

        if summary.previous_epoch_matching_target {
            statistics.previous_epoch_target_attesting_balance += balance;
        }

        if summary.previous_epoch_matching_head {
            statistics.previous_epoch_head_attesting_balance += balance;
        }

        if summary.current_epoch_matching_target {
            statistics.current_epoch_target_attesting_balance += balance;
        }
    }

    // > Return the combined effective balance of the ``indices``.
    // > ``EFFECTIVE_BALANCE_INCREMENT`` Gwei minimum to avoid divisions by zero.
    let increment = P::EFFECTIVE_BALANCE_INCREMENT.get();

    for balance in [
        &mut statistics.previous_epoch_source_attesting_balance,
        &mut statistics.previous_epoch_target_attesting_balance,
        &mut statistics.previous_epoch_head_attesting_balance,
        &mut statistics.current_epoch_active_balance,
        &mut statistics.current_epoch_target_attesting_balance,
    ] {
        *balance = (*balance).max(increment);
    }

    Ok((statistics, summaries))
}

pub fn epoch_deltas<P: Preset>(
    state: &BeaconState<P>,
    statistics: Statistics,
    summaries: &[ValidatorSummary],
) -> Result<Vec<EpochDeltas>> {
    let finality_delay = get_previous_epoch(state) - state.finalized_checkpoint.epoch;
    let in_inactivity_leak = is_in_inactivity_leak(state);
    let total_active_balance = statistics.current_epoch_active_balance;
    let total_active_balance_sqrt = total_active_balance.sqrt();
    let increment = P::EFFECTIVE_BALANCE_INCREMENT;

    let mut deltas = vec![EpochDeltas::default(); summaries.len()];

    for (index, summary) in izip!(0.., summaries) {
        let ValidatorSummary {
            effective_balance,
            eligible_for_penalties,
            ..
        } = *summary;

        let base_reward = effective_balance * P::BASE_REWARD_FACTOR
            / total_active_balance_sqrt
            / BASE_REWARDS_PER_EPOCH;

        let proposer_reward = base_reward / P::PROPOSER_REWARD_QUOTIENT;

        let attestation_component_reward = |attesting_balance: Gwei| {
            if in_inactivity_leak {
                // > Since full base reward will be canceled out by inactivity penalty deltas,
                // > optimal participation receives full base reward compensation here.
                base_reward
            } else {
                // > Factored out from balance totals to avoid uint64 overflow
                base_reward * (attesting_balance / increment) / (total_active_balance / increment)
            }
        };

        if eligible_for_penalties {
            let validator_deltas = &mut deltas[index];

            for (matching, attesting_balance) in [
                (
                    summary.previous_epoch_matching_source,
                    statistics.previous_epoch_source_attesting_balance,
                ),
                (
                    summary.previous_epoch_matching_target,
                    statistics.previous_epoch_target_attesting_balance,
                ),
                (
                    summary.previous_epoch_matching_head,
                    statistics.previous_epoch_head_attesting_balance,
                ),
            ] {
                if matching {
                    validator_deltas.reward += attestation_component_reward(attesting_balance);
                } else {
                    validator_deltas.penalty += base_reward;
                }
            }

            if in_inactivity_leak {
                // > If validator is performing optimally this cancels all rewards for a neutral
                // > balance
                validator_deltas.penalty += BASE_REWARDS_PER_EPOCH * base_reward - proposer_reward;

                if !summary.previous_epoch_matching_target {
                    validator_deltas.penalty +=
                        effective_balance * finality_delay / P::INACTIVITY_PENALTY_QUOTIENT;
                }
            }
        }

        if let Some(Inclusion {
            delay,
            proposer_index,
        }) = summary.fastest_inclusion
        {
            let max_attester_reward = base_reward - proposer_reward;

            deltas_mut(&mut deltas, proposer_index)?.reward += proposer_reward;
            deltas[index].reward += max_attester_reward / delay.max(1);
        }
    }

    Ok(deltas)
}

fn summary_mut(
    summaries: &mut [ValidatorSummary],
    validator_index: ValidatorIndex,
) -> Result<&mut ValidatorSummary> {
    let index = usize::try_from(validator_index)?;

    summaries.get_mut(index).ok_or_else(|| {
        helper_functions::error::Error::ValidatorIndexOutOfBounds {
            index: validator_index,
        }
        .into()
    })
}

fn deltas_mut(
    deltas: &mut [EpochDeltas],
    validator_index: ValidatorIndex,
) -> Result<&mut EpochDeltas> {
    let index = usize::try_from(validator_index)?;

    deltas.get_mut(index).ok_or_else(|| {
        helper_functions::error::Error::ValidatorIndexOutOfBounds {
            index: validator_index,
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use typenum::Unsigned as _;
    use types::preset::Minimal;

    use crate::test_utils;

    use super::*;

    #[test]
    fn statistics_without_attestations_are_clamped() -> Result<()> {
        let state = test_utils::genesis_state::<Minimal>(16);
        let (statistics, summaries) = statistics(&state)?;
        let increment = <Minimal as Preset>::EFFECTIVE_BALANCE_INCREMENT.get();

        assert_eq!(
            statistics.current_epoch_active_balance,
            16 * <Minimal as Preset>::MAX_EFFECTIVE_BALANCE,
        );
        assert_eq!(statistics.previous_epoch_source_attesting_balance, increment);
        assert_eq!(statistics.current_epoch_target_attesting_balance, increment);
        assert_eq!(summaries.len(), 16);
        assert!(summaries.iter().all(|summary| summary.eligible_for_penalties));

        Ok(())
    }

    #[test]
    fn absent_attesters_are_penalized_for_every_component() -> Result<()> {
        let mut state = test_utils::genesis_state::<Minimal>(16);

        // Move past the genesis epoch so that the previous epoch is not the current one.
        state.slot = 2 * <Minimal as Preset>::SlotsPerEpoch::U64 - 1;

        let (statistics, summaries) = statistics(&state)?;
        let deltas = epoch_deltas(&state, statistics, &summaries)?;

        let base_reward = <Minimal as Preset>::MAX_EFFECTIVE_BALANCE
            * <Minimal as Preset>::BASE_REWARD_FACTOR
            / statistics.current_epoch_active_balance.sqrt()
            / BASE_REWARDS_PER_EPOCH;

        for validator_deltas in deltas {
            assert_eq!(
                validator_deltas,
                EpochDeltas {
                    reward: 0,
                    penalty: 3 * base_reward,
                },
            );
        }

        Ok(())
    }
}
