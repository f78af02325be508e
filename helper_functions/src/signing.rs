use anyhow::Result;
use derive_more::From;
use ssz::{Ssz, SszHash};
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::{
            DOMAIN_BEACON_ATTESTER, DOMAIN_BEACON_PROPOSER, DOMAIN_DEPOSIT, DOMAIN_RANDAO,
            DOMAIN_VOLUNTARY_EXIT,
        },
        containers::{AttestationData, BeaconBlock, BeaconBlockHeader, DepositMessage, VoluntaryExit},
        primitives::{Domain, DomainType, Epoch, PublicKeyBytes, SignatureBytes, H256},
    },
    preset::Preset,
};

use crate::{accessors, error::SignatureKind, misc, verifier::Verifier};

// This wrapper is needed to differentiate between `Epoch` and `Slot`.
// They are aliased to the same type and thus cannot have different trait implementations.
#[derive(Clone, Copy, From, Ssz)]
#[ssz(transparent)]
pub struct RandaoEpoch(Epoch);

/// Objects signed with a domain that does not depend on the fork schedule.
pub trait SignForAllForks: SszHash {
    const DOMAIN_TYPE: DomainType;
    const SIGNATURE_KIND: SignatureKind;

    fn domain(config: &Config) -> Domain {
        misc::compute_domain(Self::DOMAIN_TYPE, config.genesis_fork_version, H256::zero())
    }

    fn signing_root(&self, config: &Config) -> H256 {
        misc::compute_signing_root(self, Self::domain(config))
    }

    fn verify(
        &self,
        config: &Config,
        signature: SignatureBytes,
        public_key: PublicKeyBytes,
        mut verifier: impl Verifier,
    ) -> Result<()> {
        verifier.verify_singular(
            self.hash_tree_root(),
            Self::domain(config),
            signature,
            public_key,
            Self::SIGNATURE_KIND,
        )
    }
}

/// Objects signed with the domain of the fork active at the epoch they belong to.
pub trait SignForSingleFork<P: Preset>: SszHash {
    const DOMAIN_TYPE: DomainType;
    const SIGNATURE_KIND: SignatureKind;

    fn epoch(&self) -> Epoch;

    fn domain(&self, state: &BeaconState<P>) -> Domain {
        accessors::get_domain(state, Self::DOMAIN_TYPE, Some(self.epoch()))
    }

    fn signing_root(&self, state: &BeaconState<P>) -> H256 {
        misc::compute_signing_root(self, self.domain(state))
    }

    fn verify(
        &self,
        state: &BeaconState<P>,
        signature: SignatureBytes,
        public_key: PublicKeyBytes,
        mut verifier: impl Verifier,
    ) -> Result<()> {
        verifier.verify_singular(
            self.hash_tree_root(),
            self.domain(state),
            signature,
            public_key,
            Self::SIGNATURE_KIND,
        )
    }

    fn verify_aggregate(
        &self,
        state: &BeaconState<P>,
        signature: SignatureBytes,
        public_keys: &[PublicKeyBytes],
        mut verifier: impl Verifier,
    ) -> Result<()> {
        verifier.verify_aggregate(
            self.hash_tree_root(),
            self.domain(state),
            signature,
            public_keys,
            Self::SIGNATURE_KIND,
        )
    }
}

impl SignForAllForks for DepositMessage {
    const DOMAIN_TYPE: DomainType = DOMAIN_DEPOSIT;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::Deposit;
}

impl<P: Preset> SignForSingleFork<P> for AttestationData {
    const DOMAIN_TYPE: DomainType = DOMAIN_BEACON_ATTESTER;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::Attestation;

    fn epoch(&self) -> Epoch {
        self.target.epoch
    }
}

impl<P: Preset> SignForSingleFork<P> for BeaconBlock<P> {
    const DOMAIN_TYPE: DomainType = DOMAIN_BEACON_PROPOSER;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::Block;

    fn epoch(&self) -> Epoch {
        misc::compute_epoch_at_slot::<P>(self.slot)
    }
}

impl<P: Preset> SignForSingleFork<P> for BeaconBlockHeader {
    const DOMAIN_TYPE: DomainType = DOMAIN_BEACON_PROPOSER;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::Block;

    fn epoch(&self) -> Epoch {
        misc::compute_epoch_at_slot::<P>(self.slot)
    }
}

impl<P: Preset> SignForSingleFork<P> for RandaoEpoch {
    const DOMAIN_TYPE: DomainType = DOMAIN_RANDAO;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::Randao;

    fn epoch(&self) -> Epoch {
        self.0
    }
}

impl<P: Preset> SignForSingleFork<P> for VoluntaryExit {
    const DOMAIN_TYPE: DomainType = DOMAIN_VOLUNTARY_EXIT;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::VoluntaryExit;

    fn epoch(&self) -> Epoch {
        self.epoch
    }
}
