use anyhow::{ensure, Result};
use helper_functions::{accessors, signing::SignForSingleFork as _, verifier::Verifier};
use ssz::SszHash as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::{BeaconBlock, SignedBeaconBlock},
    },
    preset::Preset,
};

use crate::{block_processing, slot_processing, Error};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StateRootPolicy {
    Verify,
    Trust,
}

impl StateRootPolicy {
    pub fn verify<P: Preset>(self, state: &BeaconState<P>, block: &BeaconBlock<P>) -> Result<()> {
        match self {
            Self::Verify => {
                let computed = state.hash_tree_root();
                let in_block = block.state_root;

                ensure!(
                    computed == in_block,
                    Error::<P>::StateRootMismatch { computed, in_block },
                );
            }
            Self::Trust => {}
        }

        Ok(())
    }
}

/// Applies `signed_block` to a copy of `prior_state` and returns the resulting state.
///
/// `prior_state` is never modified, so a rejected block leaves no trace in it.
pub fn apply_block<P: Preset>(
    config: &Config,
    prior_state: &BeaconState<P>,
    signed_block: &SignedBeaconBlock<P>,
    verifier: impl Verifier,
) -> Result<BeaconState<P>> {
    let mut state = prior_state.clone();

    state_transition(
        config,
        &mut state,
        signed_block,
        StateRootPolicy::Verify,
        verifier,
    )?;

    Ok(state)
}

/// Mutates `state` in place. It is left partially updated if the block is invalid.
pub fn state_transition<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    signed_block: &SignedBeaconBlock<P>,
    state_root_policy: StateRootPolicy,
    mut verifier: impl Verifier,
) -> Result<()> {
    let block = &signed_block.message;

    // > Process slots (including those with no blocks) since block
    slot_processing::process_slots(config, state, block.slot)?;

    // > Verify signature
    verify_block_signature(state, signed_block, &mut verifier)?;

    // > Process block
    block_processing::process_block(config, state, block, &mut verifier)?;

    // > Verify state root
    state_root_policy.verify(state, block)
}

pub fn verify_block_signature<P: Preset>(
    state: &BeaconState<P>,
    signed_block: &SignedBeaconBlock<P>,
    verifier: impl Verifier,
) -> Result<()> {
    let block = &signed_block.message;
    let public_key = accessors::validator(state, block.proposer_index)?.pubkey;

    block.verify(state, signed_block.signature, public_key, verifier)
}
