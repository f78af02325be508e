use anyhow::Result;
use helper_functions::{
    accessors::get_beacon_proposer_index,
    error::{Error as HelperError, SignatureKind},
    verifier::{NullVerifier, Verifier},
};
use ssz::SszHash as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::{FAR_FUTURE_EPOCH, GENESIS_EPOCH},
        containers::{
            BeaconBlock, BeaconBlockBody, BeaconBlockHeader, Eth1Data, SignedBeaconBlock,
            Validator,
        },
        primitives::{Domain, PublicKeyBytes, SignatureBytes, Slot, H256},
    },
    preset::Preset,
};

use crate::{block_processing, slot_processing};

/// A state with `validator_count` active validators and all known deposits processed.
pub fn genesis_state<P: Preset>(validator_count: u64) -> BeaconState<P> {
    let validators = (0..validator_count)
        .map(|index| Validator {
            pubkey: PublicKeyBytes::from_low_u64_be(index + 1),
            activation_eligibility_epoch: GENESIS_EPOCH,
            activation_epoch: GENESIS_EPOCH,
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
            effective_balance: P::MAX_EFFECTIVE_BALANCE,
            ..Validator::default()
        })
        .collect::<Vec<_>>();

    let balances = vec![P::MAX_EFFECTIVE_BALANCE; validators.len()];

    BeaconState {
        latest_block_header: BeaconBlockHeader {
            body_root: BeaconBlockBody::<P>::default().hash_tree_root(),
            ..BeaconBlockHeader::default()
        },
        eth1_data: Eth1Data {
            deposit_count: validator_count,
            ..Eth1Data::default()
        },
        eth1_deposit_index: validator_count,
        validators: validators.try_into().expect("validator count is within limit"),
        balances: balances.try_into().expect("validator count is within limit"),
        ..BeaconState::default()
    }
}

/// Builds a block with no operations that is valid on top of `state` at `slot`.
pub fn signed_empty_block<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    slot: Slot,
) -> Result<SignedBeaconBlock<P>> {
    let mut advanced = state.clone();

    slot_processing::process_slots(config, &mut advanced, slot)?;

    let mut block = BeaconBlock {
        slot,
        proposer_index: get_beacon_proposer_index(&advanced)?,
        parent_root: advanced.latest_block_header.hash_tree_root(),
        state_root: Default::default(),
        body: BeaconBlockBody {
            eth1_data: advanced.eth1_data,
            ..BeaconBlockBody::default()
        },
    };

    block_processing::process_block(config, &mut advanced, &block, NullVerifier)?;

    block.state_root = advanced.hash_tree_root();

    Ok(SignedBeaconBlock {
        message: block,
        signature: SignatureBytes::zero(),
    })
}

/// Reports every signature as invalid. Merkle proofs are still checked.
pub struct RejectingVerifier;

impl Verifier for RejectingVerifier {
    const IS_NULL: bool = false;

    fn verify_singular(
        &mut self,
        _message: H256,
        _domain: Domain,
        _signature: SignatureBytes,
        _public_key: PublicKeyBytes,
        signature_kind: SignatureKind,
    ) -> Result<()> {
        Err(HelperError::SignatureInvalid(signature_kind).into())
    }

    fn verify_aggregate(
        &mut self,
        _message: H256,
        _domain: Domain,
        _signature: SignatureBytes,
        _public_keys: &[PublicKeyBytes],
        signature_kind: SignatureKind,
    ) -> Result<()> {
        Err(HelperError::SignatureInvalid(signature_kind).into())
    }
}
