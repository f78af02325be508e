use anyhow::{ensure, Result};
use helper_functions::{
    accessors::{
        self, get_beacon_proposer_index, get_current_epoch, get_indexed_attestation,
        get_previous_epoch, get_randao_mix, index_of_public_key,
    },
    error::Error as HelperError,
    misc::compute_epoch_at_slot,
    mutators::{self, increase_balance, initiate_validator_exit, slash_validator},
    predicates::{
        is_active_validator, is_slashable_attestation_data, is_slashable_validator,
        validate_indexed_attestation,
    },
    signing::{RandaoEpoch, SignForAllForks as _, SignForSingleFork as _},
    verifier::Verifier,
};
use ssz::SszHash as _;
use typenum::Unsigned as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::{DEPOSIT_CONTRACT_TREE_DEPTH, FAR_FUTURE_EPOCH},
        containers::{
            Attestation, AttesterSlashing, BeaconBlock, BeaconBlockBody, BeaconBlockHeader,
            Deposit, DepositData, DepositMessage, PendingAttestation, ProposerSlashing,
            SignedVoluntaryExit, Validator,
        },
        primitives::H256,
    },
    preset::Preset,
};

use crate::Error;

/// Processes a block whose slot `state` has already been advanced to.
///
/// The block signature itself is checked in [`crate::state_transition`].
pub fn process_block<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    block: &BeaconBlock<P>,
    mut verifier: impl Verifier,
) -> Result<()> {
    process_block_header(state, block)?;
    process_randao(state, &block.body, &mut verifier)?;
    process_eth1_data(state, &block.body)?;
    process_operations(config, state, &block.body, &mut verifier)
}

pub fn process_block_header<P: Preset>(
    state: &mut BeaconState<P>,
    block: &BeaconBlock<P>,
) -> Result<()> {
    // > Verify that the slots match
    ensure!(
        block.slot == state.slot,
        Error::<P>::SlotMismatch {
            state_slot: state.slot,
            block_slot: block.slot,
        },
    );

    // > Verify that the block is newer than latest block header
    ensure!(
        block.slot > state.latest_block_header.slot,
        Error::<P>::BlockNotNewerThanLatestBlockHeader {
            block_slot: block.slot,
            block_header_slot: state.latest_block_header.slot,
        },
    );

    // > Verify that proposer index is the correct index
    let computed = get_beacon_proposer_index(state)?;
    let in_block = block.proposer_index;

    ensure!(
        computed == in_block,
        Error::<P>::ProposerIndexMismatch { computed, in_block },
    );

    // > Verify that the parent matches
    let computed = state.latest_block_header.hash_tree_root();
    let in_block = block.parent_root;

    ensure!(
        computed == in_block,
        Error::<P>::ParentRootMismatch { computed, in_block },
    );

    // > Cache current block as the new latest block
    state.latest_block_header = BeaconBlockHeader {
        // > Overwritten in the next process_slot call
        state_root: H256::zero(),
        ..block.to_header()
    };

    // > Verify proposer is not slashed
    let index = block.proposer_index;

    ensure!(
        !accessors::validator(state, index)?.slashed,
        Error::<P>::ProposerSlashed { index },
    );

    Ok(())
}

pub fn process_randao<P: Preset>(
    state: &mut BeaconState<P>,
    body: &BeaconBlockBody<P>,
    verifier: impl Verifier,
) -> Result<()> {
    let epoch = get_current_epoch(state);

    // > Verify RANDAO reveal
    let proposer_index = get_beacon_proposer_index(state)?;
    let public_key = accessors::validator(state, proposer_index)?.pubkey;

    RandaoEpoch::from(epoch).verify(state, body.randao_reveal, public_key, verifier)?;

    // > Mix in RANDAO reveal
    let mix = get_randao_mix(state, epoch) ^ hashing::hash_bytes(body.randao_reveal);
    *state.randao_mixes.mod_index_mut(epoch) = mix;

    Ok(())
}

pub fn process_eth1_data<P: Preset>(
    state: &mut BeaconState<P>,
    body: &BeaconBlockBody<P>,
) -> Result<()> {
    state.eth1_data_votes.push(body.eth1_data)?;

    let vote_count = state
        .eth1_data_votes
        .iter()
        .filter(|vote| **vote == body.eth1_data)
        .count();

    if vote_count * 2 > P::SlotsPerEth1VotingPeriod::USIZE {
        state.eth1_data = body.eth1_data;
    }

    Ok(())
}

fn process_operations<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    body: &BeaconBlockBody<P>,
    mut verifier: impl Verifier,
) -> Result<()> {
    // > Verify that outstanding deposits are processed up to the maximum number of deposits
    let computed = P::MaxDeposits::U64.min(
        state
            .eth1_data
            .deposit_count
            .saturating_sub(state.eth1_deposit_index),
    );
    let in_block = body.deposits.len().try_into()?;

    ensure!(
        computed == in_block,
        Error::<P>::DepositCountMismatch { computed, in_block },
    );

    for proposer_slashing in body.proposer_slashings.iter().copied() {
        process_proposer_slashing(config, state, proposer_slashing, &mut verifier)?;
    }

    for attester_slashing in body.attester_slashings.iter() {
        process_attester_slashing(config, state, attester_slashing, &mut verifier)?;
    }

    for attestation in body.attestations.iter() {
        process_attestation(state, attestation, &mut verifier)?;
    }

    for deposit in body.deposits.iter() {
        process_deposit(config, state, deposit, &mut verifier)?;
    }

    for voluntary_exit in body.voluntary_exits.iter().copied() {
        process_voluntary_exit(config, state, voluntary_exit, &mut verifier)?;
    }

    Ok(())
}

pub fn process_proposer_slashing<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    proposer_slashing: ProposerSlashing,
    mut verifier: impl Verifier,
) -> Result<()> {
    let header_1 = proposer_slashing.signed_header_1.message;
    let header_2 = proposer_slashing.signed_header_2.message;

    // > Verify header slots match
    ensure!(
        header_1.slot == header_2.slot,
        Error::<P>::ProposerSlashingSlotMismatch {
            slot_1: header_1.slot,
            slot_2: header_2.slot,
        },
    );

    // > Verify header proposer indices match
    ensure!(
        header_1.proposer_index == header_2.proposer_index,
        Error::<P>::ProposerSlashingProposerMismatch {
            proposer_index_1: header_1.proposer_index,
            proposer_index_2: header_2.proposer_index,
        },
    );

    // > Verify the headers are different
    ensure!(
        header_1 != header_2,
        Error::<P>::ProposerSlashingHeadersIdentical { header: header_1 },
    );

    // > Verify the proposer is slashable
    let index = header_1.proposer_index;
    let proposer = *accessors::validator(state, index)?;

    ensure!(
        is_slashable_validator(&proposer, get_current_epoch(state)),
        Error::<P>::ProposerNotSlashable { index, proposer },
    );

    // > Verify signatures
    for signed_header in [
        proposer_slashing.signed_header_1,
        proposer_slashing.signed_header_2,
    ] {
        signed_header.message.verify(
            state,
            signed_header.signature,
            proposer.pubkey,
            &mut verifier,
        )?;
    }

    slash_validator(config, state, index, None)
}

pub fn process_attester_slashing<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    attester_slashing: &AttesterSlashing<P>,
    mut verifier: impl Verifier,
) -> Result<()> {
    let attestation_1 = &attester_slashing.attestation_1;
    let attestation_2 = &attester_slashing.attestation_2;

    let data_1 = attestation_1.data;
    let data_2 = attestation_2.data;

    ensure!(
        is_slashable_attestation_data(&data_1, &data_2),
        Error::<P>::AttestationDataNotSlashable { data_1, data_2 },
    );

    validate_indexed_attestation(state, attestation_1, &mut verifier)?;
    validate_indexed_attestation(state, attestation_2, &mut verifier)?;

    let mut slashed_any = false;

    // Both lists were just checked to be sorted, which makes binary search usable.
    let slashable_indices = attestation_1
        .attesting_indices
        .iter()
        .copied()
        .filter(|index| attestation_2.attesting_indices.binary_search(index).is_ok());

    for index in slashable_indices {
        let current_epoch = get_current_epoch(state);

        if is_slashable_validator(accessors::validator(state, index)?, current_epoch) {
            slash_validator(config, state, index, None)?;
            slashed_any = true;
        }
    }

    ensure!(slashed_any, Error::<P>::NoAttestersSlashed);

    Ok(())
}

pub fn process_attestation<P: Preset>(
    state: &mut BeaconState<P>,
    attestation: &Attestation<P>,
    verifier: impl Verifier,
) -> Result<()> {
    let data = attestation.data;
    let previous_epoch = get_previous_epoch(state);
    let current_epoch = get_current_epoch(state);

    ensure!(
        data.target.epoch == previous_epoch || data.target.epoch == current_epoch,
        Error::<P>::AttestationTargetsUnusableEpoch {
            target_epoch: data.target.epoch,
            previous_epoch,
            current_epoch,
        },
    );

    ensure!(
        data.target.epoch == compute_epoch_at_slot::<P>(data.slot),
        Error::AttestationTargetsWrongEpoch {
            attestation: Box::new(attestation.clone()),
        },
    );

    let low_slot = data.slot + P::MIN_ATTESTATION_INCLUSION_DELAY.get();
    let high_slot = data.slot + P::SlotsPerEpoch::U64;

    ensure!(
        (low_slot..=high_slot).contains(&state.slot),
        Error::<P>::AttestationOutsideInclusionRange {
            state_slot: state.slot,
            attestation_slot: data.slot,
        },
    );

    let in_state = if data.target.epoch == current_epoch {
        state.current_justified_checkpoint
    } else {
        state.previous_justified_checkpoint
    };
    let in_block = data.source;

    ensure!(
        in_state == in_block,
        Error::<P>::AttestationSourceMismatch { in_state, in_block },
    );

    // The committee index and the length of `aggregation_bits` are checked here too.
    let indexed_attestation = get_indexed_attestation(state, attestation)?;

    // > Verify signature
    validate_indexed_attestation(state, &indexed_attestation, verifier)?;

    let pending_attestation = PendingAttestation {
        aggregation_bits: attestation.aggregation_bits.clone(),
        data,
        inclusion_delay: state.slot - data.slot,
        proposer_index: get_beacon_proposer_index(state)?,
    };

    if data.target.epoch == current_epoch {
        state.current_epoch_attestations.push(pending_attestation)?;
    } else {
        state.previous_epoch_attestations.push(pending_attestation)?;
    }

    Ok(())
}

pub fn process_deposit<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    deposit: &Deposit,
    mut verifier: impl Verifier,
) -> Result<()> {
    // > Verify the Merkle branch
    //
    // The extra level mixes in the number of deposits.
    let valid_proof = verifier.verify_merkle_proof(
        deposit.data.hash_tree_root(),
        deposit.proof.as_ref(),
        DEPOSIT_CONTRACT_TREE_DEPTH + 1,
        state.eth1_deposit_index,
        state.eth1_data.deposit_root,
    )?;

    ensure!(
        valid_proof,
        Error::<P>::DepositProofInvalid {
            deposit: Box::new(deposit.clone()),
        },
    );

    // > Deposits must be processed in order
    state.eth1_deposit_index += 1;

    let DepositData {
        pubkey,
        withdrawal_credentials,
        amount,
        signature,
    } = deposit.data;

    if let Some(validator_index) = index_of_public_key(state, pubkey) {
        // > Increase balance by deposit amount
        increase_balance(mutators::balance(state, validator_index)?, amount);
        return Ok(());
    }

    // > Verify the deposit signature (proof of possession) which is not checked by the deposit
    // > contract
    //
    // An invalid signature does not invalidate the block. The deposit is skipped instead.
    let deposit_message = DepositMessage::from(deposit.data);

    if let Err(error) = deposit_message.verify(config, signature, pubkey, verifier) {
        if matches!(
            error.downcast_ref::<HelperError>(),
            Some(HelperError::SignatureInvalid(_)),
        ) {
            return Ok(());
        }

        return Err(error);
    }

    // > Add validator and balance entries
    let effective_balance = (amount - amount % P::EFFECTIVE_BALANCE_INCREMENT)
        .min(P::MAX_EFFECTIVE_BALANCE);

    state.validators.push(Validator {
        pubkey,
        withdrawal_credentials,
        activation_eligibility_epoch: FAR_FUTURE_EPOCH,
        activation_epoch: FAR_FUTURE_EPOCH,
        exit_epoch: FAR_FUTURE_EPOCH,
        withdrawable_epoch: FAR_FUTURE_EPOCH,
        slashed: false,
        effective_balance,
    })?;

    state.balances.push(amount)?;

    Ok(())
}

pub fn process_voluntary_exit<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    signed_voluntary_exit: SignedVoluntaryExit,
    verifier: impl Verifier,
) -> Result<()> {
    let voluntary_exit = signed_voluntary_exit.message;
    let index = voluntary_exit.validator_index;
    let validator = *accessors::validator(state, index)?;
    let current_epoch = get_current_epoch(state);

    // > Verify the validator is active
    ensure!(
        is_active_validator(&validator, current_epoch),
        Error::<P>::ValidatorNotActive {
            index,
            validator,
            current_epoch,
        },
    );

    // > Verify exit has not been initiated
    ensure!(
        validator.exit_epoch == FAR_FUTURE_EPOCH,
        Error::<P>::ValidatorAlreadyExited {
            index,
            exit_epoch: validator.exit_epoch,
        },
    );

    // > Exits must specify an epoch when they become valid; they are not valid before then
    ensure!(
        current_epoch >= voluntary_exit.epoch,
        Error::<P>::VoluntaryExitIsEarly {
            current_epoch,
            epoch: voluntary_exit.epoch,
        },
    );

    // > Verify the validator has been active long enough
    ensure!(
        current_epoch >= validator.activation_epoch + config.shard_committee_period,
        Error::<P>::ValidatorHasNotBeenActiveLongEnough {
            index,
            activation_epoch: validator.activation_epoch,
            current_epoch,
        },
    );

    // > Verify signature
    voluntary_exit.verify(state, signed_voluntary_exit.signature, validator.pubkey, verifier)?;

    // > Initiate exit
    initiate_validator_exit(config, state, index)
}
