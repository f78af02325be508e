use core::{mem, ops::Range};

use anyhow::Result;
use helper_functions::{
    accessors::{
        get_block_root, get_current_epoch, get_next_epoch, get_previous_epoch, get_randao_mix,
        get_validator_churn_limit,
    },
    misc::compute_activation_exit_epoch,
    mutators::{self, decrease_balance, increase_balance, initiate_validator_exit},
    predicates::{
        is_active_validator, is_eligible_for_activation, is_eligible_for_activation_queue,
    },
};
use itertools::Itertools as _;
use ssz::{ContiguousList, SszHash as _};
use typenum::Unsigned as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::GENESIS_EPOCH,
        containers::{Checkpoint, HistoricalBatch},
        primitives::Gwei,
    },
    preset::Preset,
};

use crate::epoch_intermediates::{self, EpochDeltas, Statistics, ValidatorSummary};

pub fn process_epoch<P: Preset>(config: &Config, state: &mut BeaconState<P>) -> Result<()> {
    let (statistics, summaries) = epoch_intermediates::statistics(state)?;

    process_justification_and_finalization(state, statistics)?;
    process_rewards_and_penalties(state, statistics, &summaries)?;
    process_registry_updates(config, state)?;
    process_slashings(state, statistics.current_epoch_active_balance);
    process_eth1_data_reset(state);
    process_effective_balance_updates(state);
    process_slashings_reset(state);
    process_randao_mixes_reset(state);
    process_historical_roots_update(state)?;
    process_participation_record_updates(state);

    Ok(())
}

pub fn process_justification_and_finalization<P: Preset>(
    state: &mut BeaconState<P>,
    statistics: Statistics,
) -> Result<()> {
    // > Initial FFG checkpoint values have a `0x00` stub for `root`.
    // > Skip FFG updates in the first two epochs to avoid
    // > corner cases that might result in modifying this stub.
    if get_current_epoch(state) <= GENESIS_EPOCH + 1 {
        return Ok(());
    }

    weigh_justification_and_finalization(
        state,
        statistics.current_epoch_active_balance,
        statistics.previous_epoch_target_attesting_balance,
        statistics.current_epoch_target_attesting_balance,
    )
}

pub fn weigh_justification_and_finalization<P: Preset>(
    state: &mut BeaconState<P>,
    total_active_balance: Gwei,
    previous_epoch_target_balance: Gwei,
    current_epoch_target_balance: Gwei,
) -> Result<()> {
    let previous_epoch = get_previous_epoch(state);
    let current_epoch = get_current_epoch(state);
    let old_previous_justified_checkpoint = state.previous_justified_checkpoint;
    let old_current_justified_checkpoint = state.current_justified_checkpoint;

    // > Process justifications
    state.previous_justified_checkpoint = state.current_justified_checkpoint;
    state.justification_bits.shift_up_by_1();

    for (epoch, bit, target_balance) in [
        (previous_epoch, 1, previous_epoch_target_balance),
        (current_epoch, 0, current_epoch_target_balance),
    ] {
        if target_balance * 3 >= total_active_balance * 2 {
            state.current_justified_checkpoint = Checkpoint {
                epoch,
                root: get_block_root(state, epoch)?,
            };

            state.justification_bits.set(bit, true);
        }
    }

    // > Process finalizations
    let bits = &state.justification_bits;
    let all_set = |range: Range<usize>| range.into_iter().all(|bit| bits.get(bit) == Some(true));

    let mut finalized_checkpoint = None;

    // > The 2nd/3rd/4th most recent epochs are justified, the 2nd using the 4th as source
    if all_set(1..4) && old_previous_justified_checkpoint.epoch + 3 == current_epoch {
        finalized_checkpoint = Some(old_previous_justified_checkpoint);
    }

    // > The 2nd/3rd most recent epochs are justified, the 2nd using the 3rd as source
    if all_set(1..3) && old_previous_justified_checkpoint.epoch + 2 == current_epoch {
        finalized_checkpoint = Some(old_previous_justified_checkpoint);
    }

    // > The 1st/2nd/3rd most recent epochs are justified, the 1st using the 3rd as source
    if all_set(0..3) && old_current_justified_checkpoint.epoch + 2 == current_epoch {
        finalized_checkpoint = Some(old_current_justified_checkpoint);
    }

    // > The 1st/2nd most recent epochs are justified, the 1st using the 2nd as source
    if all_set(0..2) && old_current_justified_checkpoint.epoch + 1 == current_epoch {
        finalized_checkpoint = Some(old_current_justified_checkpoint);
    }

    if let Some(checkpoint) = finalized_checkpoint {
        state.finalized_checkpoint = checkpoint;
    }

    Ok(())
}

pub fn process_rewards_and_penalties<P: Preset>(
    state: &mut BeaconState<P>,
    statistics: Statistics,
    summaries: &[ValidatorSummary],
) -> Result<()> {
    // > No rewards are applied at the end of `GENESIS_EPOCH`
    // > because rewards are for work done in the previous epoch
    if get_current_epoch(state) == GENESIS_EPOCH {
        return Ok(());
    }

    let deltas = epoch_intermediates::epoch_deltas(state, statistics, summaries)?;

    for (balance, EpochDeltas { reward, penalty }) in state.balances.iter_mut().zip(deltas) {
        increase_balance(balance, reward);
        decrease_balance(balance, penalty);
    }

    Ok(())
}

pub fn process_registry_updates<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
) -> Result<()> {
    let current_epoch = get_current_epoch(state);
    let next_epoch = get_next_epoch(state);

    // The indices collected in these do not overlap.
    let mut eligible_for_activation_queue = vec![];
    let mut ejections = vec![];
    let mut activation_queue = vec![];

    for (validator, validator_index) in state.validators.iter().zip(0..) {
        if is_eligible_for_activation_queue::<P>(validator) {
            eligible_for_activation_queue.push(validator_index);
        }

        if is_active_validator(validator, current_epoch)
            && validator.effective_balance <= config.ejection_balance
        {
            ejections.push(validator_index);
        }

        if is_eligible_for_activation(state, validator) {
            activation_queue.push((validator_index, validator.activation_eligibility_epoch));
        }
    }

    // > Process activation eligibility and ejections
    for validator_index in eligible_for_activation_queue {
        mutators::validator(state, validator_index)?
            .activation_eligibility_epoch = next_epoch;
    }

    for validator_index in ejections {
        initiate_validator_exit(config, state, validator_index)?;
    }

    // > Queue validators eligible for activation and not yet dequeued for activation
    let activation_queue = activation_queue
        .into_iter()
        // > Order by the sequence of activation_eligibility_epoch setting and then index
        .sorted_by_key(|&(validator_index, activation_eligibility_epoch)| {
            (activation_eligibility_epoch, validator_index)
        })
        .map(|(validator_index, _)| validator_index);

    // > Dequeued validators for activation up to churn limit
    let churn_limit = get_validator_churn_limit(config, state).try_into()?;
    let activation_exit_epoch = compute_activation_exit_epoch::<P>(current_epoch);

    for validator_index in activation_queue.take(churn_limit) {
        mutators::validator(state, validator_index)?.activation_epoch =
            activation_exit_epoch;
    }

    Ok(())
}

pub fn process_slashings<P: Preset>(state: &mut BeaconState<P>, total_active_balance: Gwei) {
    let epoch = get_current_epoch(state);
    let increment = P::EFFECTIVE_BALANCE_INCREMENT;
    let withdrawable_epoch = epoch + P::EpochsPerSlashingsVector::U64 / 2;

    let adjusted_total_slashing_balance = state
        .slashings
        .iter()
        .sum::<Gwei>()
        .saturating_mul(P::PROPORTIONAL_SLASHING_MULTIPLIER)
        .min(total_active_balance);

    for (validator, balance) in state.validators.iter().zip(state.balances.iter_mut()) {
        if validator.slashed && validator.withdrawable_epoch == withdrawable_epoch {
            // > Factored out from penalty numerator to avoid uint64 overflow
            let penalty_numerator =
                validator.effective_balance / increment * adjusted_total_slashing_balance;
            let penalty = penalty_numerator / total_active_balance * increment.get();

            decrease_balance(balance, penalty);
        }
    }
}

pub fn process_eth1_data_reset<P: Preset>(state: &mut BeaconState<P>) {
    // > Reset eth1 data votes
    if get_next_epoch(state) % P::EpochsPerEth1VotingPeriod::U64 == 0 {
        state.eth1_data_votes = ContiguousList::default();
    }
}

pub fn process_effective_balance_updates<P: Preset>(state: &mut BeaconState<P>) {
    let increment = P::EFFECTIVE_BALANCE_INCREMENT.get();
    let hysteresis_increment = increment / P::HYSTERESIS_QUOTIENT;
    let downward_threshold = hysteresis_increment * P::HYSTERESIS_DOWNWARD_MULTIPLIER;
    let upward_threshold = hysteresis_increment * P::HYSTERESIS_UPWARD_MULTIPLIER;

    // > Update effective balances with hysteresis
    for (validator, balance) in state.validators.iter_mut().zip(state.balances.iter().copied()) {
        let below = balance + downward_threshold < validator.effective_balance;
        let above = validator.effective_balance + upward_threshold < balance;

        if below || above {
            validator.effective_balance =
                (balance - balance % increment).min(P::MAX_EFFECTIVE_BALANCE);
        }
    }
}

pub fn process_slashings_reset<P: Preset>(state: &mut BeaconState<P>) {
    let next_epoch = get_next_epoch(state);

    // > Reset slashings
    *state.slashings.mod_index_mut(next_epoch) = 0;
}

pub fn process_randao_mixes_reset<P: Preset>(state: &mut BeaconState<P>) {
    let current_epoch = get_current_epoch(state);
    let next_epoch = get_next_epoch(state);

    // > Set randao mix
    *state.randao_mixes.mod_index_mut(next_epoch) = get_randao_mix(state, current_epoch);
}

pub fn process_historical_roots_update<P: Preset>(state: &mut BeaconState<P>) -> Result<()> {
    let next_epoch = get_next_epoch(state);

    // > Set historical root accumulator
    if next_epoch % P::EpochsPerHistoricalRoot::U64 == 0 {
        let historical_batch = HistoricalBatch::<P> {
            block_roots: state.block_roots.clone(),
            state_roots: state.state_roots.clone(),
        };

        state.historical_roots.push(historical_batch.hash_tree_root())?;
    }

    Ok(())
}

pub fn process_participation_record_updates<P: Preset>(state: &mut BeaconState<P>) {
    // > Rotate current/previous epoch attestations
    state.previous_epoch_attestations = mem::take(&mut state.current_epoch_attestations);
}

#[cfg(test)]
mod tests {
    use ssz::BitList;
    use types::{
        phase0::{
            consts::FAR_FUTURE_EPOCH,
            containers::{AttestationData, PendingAttestation},
            primitives::H256,
        },
        preset::Minimal,
    };

    use crate::test_utils;

    use super::*;

    const SLOTS_PER_EPOCH: u64 = <Minimal as Preset>::SlotsPerEpoch::U64;

    fn state_at_end_of_epoch(epoch: u64) -> BeaconState<Minimal> {
        let mut state = test_utils::genesis_state::<Minimal>(16);

        state.slot = (epoch + 1) * SLOTS_PER_EPOCH - 1;

        for (slot, root) in (0..).zip(state.block_roots.iter_mut()) {
            *root = H256::from_low_u64_be(slot + 1);
        }

        state
    }

    #[test]
    fn supermajority_justifies_and_finalizes() -> Result<()> {
        let mut state = state_at_end_of_epoch(3);
        let epoch_2_checkpoint = Checkpoint {
            epoch: 2,
            root: get_block_root(&state, 2)?,
        };

        state.current_justified_checkpoint = epoch_2_checkpoint;
        state.justification_bits.set(0, true);

        weigh_justification_and_finalization(&mut state, 100, 70, 70)?;

        assert_eq!(
            state.current_justified_checkpoint,
            Checkpoint {
                epoch: 3,
                root: get_block_root(&state, 3)?,
            },
        );
        assert_eq!(state.previous_justified_checkpoint, epoch_2_checkpoint);
        assert_eq!(state.finalized_checkpoint, epoch_2_checkpoint);
        assert_eq!(state.justification_bits.count_ones(), 2);

        Ok(())
    }

    #[test]
    fn minority_justifies_nothing() -> Result<()> {
        let mut state = state_at_end_of_epoch(3);
        let before = state.current_justified_checkpoint;

        weigh_justification_and_finalization(&mut state, 100, 66, 66)?;

        assert_eq!(state.current_justified_checkpoint, before);
        assert_eq!(state.finalized_checkpoint, Checkpoint::default());
        assert!(!state.justification_bits.any());

        Ok(())
    }

    #[test]
    fn justification_is_skipped_in_the_first_two_epochs() -> Result<()> {
        let mut state = state_at_end_of_epoch(1);

        let statistics = Statistics {
            current_epoch_active_balance: 100,
            previous_epoch_target_attesting_balance: 100,
            current_epoch_target_attesting_balance: 100,
            ..Statistics::default()
        };

        process_justification_and_finalization(&mut state, statistics)?;

        assert_eq!(state.current_justified_checkpoint, Checkpoint::default());

        Ok(())
    }

    #[test]
    fn absent_validators_lose_balance() -> Result<()> {
        let mut state = state_at_end_of_epoch(1);
        let (statistics, summaries) = epoch_intermediates::statistics(&state)?;

        process_rewards_and_penalties(&mut state, statistics, &summaries)?;

        assert!(state
            .balances
            .iter()
            .all(|balance| *balance < <Minimal as Preset>::MAX_EFFECTIVE_BALANCE));

        Ok(())
    }

    #[test]
    fn registry_updates_queue_and_eject() -> Result<()> {
        let config = Config::minimal();
        let mut state = state_at_end_of_epoch(0);

        state.validators[0].activation_eligibility_epoch = FAR_FUTURE_EPOCH;
        state.validators[0].activation_epoch = FAR_FUTURE_EPOCH;
        state.validators[1].effective_balance = config.ejection_balance;

        process_registry_updates(&config, &mut state)?;

        assert_eq!(state.validators[0].activation_eligibility_epoch, 1);
        assert_eq!(state.validators[0].activation_epoch, FAR_FUTURE_EPOCH);
        assert_ne!(state.validators[1].exit_epoch, FAR_FUTURE_EPOCH);

        Ok(())
    }

    #[test]
    fn finalized_eligible_validators_are_activated() -> Result<()> {
        let config = Config::minimal();
        let mut state = state_at_end_of_epoch(0);

        for validator in &mut state.validators[..3] {
            validator.activation_eligibility_epoch = GENESIS_EPOCH;
            validator.activation_epoch = FAR_FUTURE_EPOCH;
        }

        process_registry_updates(&config, &mut state)?;

        let churn_limit = get_validator_churn_limit(&config, &state);
        let activated = state.validators[..3]
            .iter()
            .filter(|validator| validator.activation_epoch != FAR_FUTURE_EPOCH)
            .count();

        assert_eq!(u64::try_from(activated)?, churn_limit.min(3));
        assert_eq!(
            state.validators[0].activation_epoch,
            compute_activation_exit_epoch::<Minimal>(GENESIS_EPOCH),
        );

        Ok(())
    }

    #[test]
    fn slashed_validators_are_penalized_halfway_to_withdrawal() {
        let mut state = state_at_end_of_epoch(0);
        let effective_balance = <Minimal as Preset>::MAX_EFFECTIVE_BALANCE;
        let total_active_balance = 16 * effective_balance;

        state.validators[0].slashed = true;
        state.validators[0].withdrawable_epoch =
            <Minimal as Preset>::EpochsPerSlashingsVector::U64 / 2;
        state.validators[1].slashed = true;
        state.validators[1].withdrawable_epoch = FAR_FUTURE_EPOCH;
        *state.slashings.mod_index_mut(0) = 2 * effective_balance;

        process_slashings(&mut state, total_active_balance);

        let increment = <Minimal as Preset>::EFFECTIVE_BALANCE_INCREMENT.get();
        let penalty = effective_balance / increment * (2 * effective_balance)
            / total_active_balance
            * increment;

        assert_eq!(state.balances[0], effective_balance - penalty);
        assert_eq!(state.balances[1], effective_balance);
    }

    #[test]
    fn effective_balances_follow_hysteresis() {
        let mut state = state_at_end_of_epoch(0);
        let max = <Minimal as Preset>::MAX_EFFECTIVE_BALANCE;
        let increment = <Minimal as Preset>::EFFECTIVE_BALANCE_INCREMENT.get();

        // Within the downward threshold.
        state.balances[0] = max - increment / 4;
        // Past the downward threshold.
        state.balances[1] = max - increment / 2;
        // Above the maximum.
        state.balances[2] = max + 2 * increment;

        process_effective_balance_updates(&mut state);

        assert_eq!(state.validators[0].effective_balance, max);
        assert_eq!(state.validators[1].effective_balance, max - increment);
        assert_eq!(state.validators[2].effective_balance, max);
    }

    #[test]
    fn historical_roots_are_accumulated_once_per_period() -> Result<()> {
        let period = <Minimal as Preset>::EpochsPerHistoricalRoot::U64;

        let mut state = state_at_end_of_epoch(period - 2);
        process_historical_roots_update(&mut state)?;
        assert!(state.historical_roots.is_empty());

        let mut state = state_at_end_of_epoch(period - 1);
        process_historical_roots_update(&mut state)?;
        assert_eq!(state.historical_roots.len(), 1);

        Ok(())
    }

    #[test]
    fn participation_records_rotate() {
        let mut state = state_at_end_of_epoch(0);

        state
            .current_epoch_attestations
            .push(PendingAttestation {
                aggregation_bits: BitList::default(),
                data: AttestationData::default(),
                inclusion_delay: 1,
                proposer_index: 0,
            })
            .expect("list is empty");

        process_participation_record_updates(&mut state);

        assert_eq!(state.previous_epoch_attestations.len(), 1);
        assert!(state.current_epoch_attestations.is_empty());
    }
}
