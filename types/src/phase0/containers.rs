use serde::{Deserialize, Serialize};
use ssz::{BitList, ContiguousList, ContiguousVector, Ssz};

use crate::{
    collections::RecentRoots,
    phase0::{
        consts::DepositProofLength,
        primitives::{
            CommitteeIndex, DepositIndex, Epoch, Gwei, PublicKeyBytes, SignatureBytes, Slot,
            ValidatorIndex, Version, H256,
        },
    },
    preset::Preset,
};

// Credentials are stored as bytes and only handed to a signature oracle when verifying them.

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize, Ssz)]
#[serde(bound = "", deny_unknown_fields)]
pub struct Attestation<P: Preset> {
    pub aggregation_bits: BitList<P::MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signature: SignatureBytes,
}

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Deserialize, Serialize, Ssz,
)]
#[serde(deny_unknown_fields)]
pub struct AttestationData {
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
    #[serde(with = "serde_utils::string_or_native")]
    pub index: CommitteeIndex,
    pub beacon_block_root: H256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize, Ssz)]
#[serde(bound = "", deny_unknown_fields)]
pub struct AttesterSlashing<P: Preset> {
    pub attestation_1: IndexedAttestation<P>,
    pub attestation_2: IndexedAttestation<P>,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize, Ssz)]
#[serde(bound = "", deny_unknown_fields)]
pub struct BeaconBlock<P: Preset> {
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
    #[serde(with = "serde_utils::string_or_native")]
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub body: BeaconBlockBody<P>,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize, Ssz)]
#[serde(bound = "", deny_unknown_fields)]
pub struct BeaconBlockBody<P: Preset> {
    pub randao_reveal: SignatureBytes,
    pub eth1_data: Eth1Data,
    pub graffiti: H256,
    pub proposer_slashings: ContiguousList<ProposerSlashing, P::MaxProposerSlashings>,
    pub attester_slashings: ContiguousList<AttesterSlashing<P>, P::MaxAttesterSlashings>,
    pub attestations: ContiguousList<Attestation<P>, P::MaxAttestations>,
    pub deposits: ContiguousList<Deposit, P::MaxDeposits>,
    pub voluntary_exits: ContiguousList<SignedVoluntaryExit, P::MaxVoluntaryExits>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Deserialize, Serialize, Ssz)]
#[serde(deny_unknown_fields)]
pub struct BeaconBlockHeader {
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
    #[serde(with = "serde_utils::string_or_native")]
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub body_root: H256,
}

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Deserialize, Serialize, Ssz,
)]
#[serde(deny_unknown_fields)]
pub struct Checkpoint {
    #[serde(with = "serde_utils::string_or_native")]
    pub epoch: Epoch,
    pub root: H256,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize, Ssz)]
#[serde(deny_unknown_fields)]
pub struct Deposit {
    pub proof: ContiguousVector<H256, DepositProofLength>,
    pub data: DepositData,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize, Ssz)]
#[serde(deny_unknown_fields)]
pub struct DepositData {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: H256,
    #[serde(with = "serde_utils::string_or_native")]
    pub amount: Gwei,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize, Ssz)]
#[serde(deny_unknown_fields)]
pub struct DepositMessage {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: H256,
    #[serde(with = "serde_utils::string_or_native")]
    pub amount: Gwei,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Deserialize, Serialize, Ssz)]
#[serde(deny_unknown_fields)]
pub struct Eth1Data {
    pub deposit_root: H256,
    #[serde(with = "serde_utils::string_or_native")]
    pub deposit_count: DepositIndex,
    pub block_hash: H256,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize, Ssz)]
#[serde(deny_unknown_fields)]
pub struct Fork {
    pub previous_version: Version,
    pub current_version: Version,
    #[serde(with = "serde_utils::string_or_native")]
    pub epoch: Epoch,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize, Ssz)]
#[serde(deny_unknown_fields)]
pub struct ForkData {
    pub current_version: Version,
    pub genesis_validators_root: H256,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize, Ssz)]
#[serde(bound = "", deny_unknown_fields)]
pub struct HistoricalBatch<P: Preset> {
    pub block_roots: RecentRoots<P>,
    pub state_roots: RecentRoots<P>,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize, Ssz)]
#[serde(bound = "", deny_unknown_fields)]
pub struct IndexedAttestation<P: Preset> {
    pub attesting_indices: ContiguousList<ValidatorIndex, P::MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signature: SignatureBytes,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize, Ssz)]
#[serde(bound = "", deny_unknown_fields)]
pub struct PendingAttestation<P: Preset> {
    pub aggregation_bits: BitList<P::MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    #[serde(with = "serde_utils::string_or_native")]
    pub inclusion_delay: u64,
    #[serde(with = "serde_utils::string_or_native")]
    pub proposer_index: ValidatorIndex,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize, Ssz)]
#[serde(deny_unknown_fields)]
pub struct ProposerSlashing {
    pub signed_header_1: SignedBeaconBlockHeader,
    pub signed_header_2: SignedBeaconBlockHeader,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize, Ssz)]
#[serde(bound = "", deny_unknown_fields)]
pub struct SignedBeaconBlock<P: Preset> {
    pub message: BeaconBlock<P>,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize, Ssz)]
#[serde(deny_unknown_fields)]
pub struct SignedBeaconBlockHeader {
    pub message: BeaconBlockHeader,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize, Ssz)]
#[serde(deny_unknown_fields)]
pub struct SignedVoluntaryExit {
    pub message: VoluntaryExit,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize, Ssz)]
#[serde(deny_unknown_fields)]
pub struct SigningData {
    pub object_root: H256,
    pub domain: H256,
}

/// A validator in the registry.
///
/// Epochs that have not been reached yet are set to [`FAR_FUTURE_EPOCH`].
///
/// [`FAR_FUTURE_EPOCH`]: crate::phase0::consts::FAR_FUTURE_EPOCH
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize, Ssz)]
#[serde(deny_unknown_fields)]
pub struct Validator {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: H256,
    #[serde(with = "serde_utils::string_or_native")]
    pub activation_eligibility_epoch: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    pub activation_epoch: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    pub exit_epoch: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    pub withdrawable_epoch: Epoch,
    pub slashed: bool,
    #[serde(with = "serde_utils::string_or_native")]
    pub effective_balance: Gwei,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize, Ssz)]
#[serde(deny_unknown_fields)]
pub struct VoluntaryExit {
    #[serde(with = "serde_utils::string_or_native")]
    pub epoch: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    pub validator_index: ValidatorIndex,
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;
    use ssz::{SszRead, SszWrite};

    use crate::{
        phase0::{beacon_state::BeaconState, consts::FAR_FUTURE_EPOCH},
        preset::Minimal,
    };

    use super::*;

    fn survives_encoding<T: SszRead + SszWrite + PartialEq>(value: &T) -> bool {
        value
            .to_ssz()
            .is_ok_and(|bytes| T::from_ssz(bytes).is_ok_and(|decoded| decoded == *value))
    }

    fn root(seed: u64) -> H256 {
        H256::from_low_u64_be(seed)
    }

    fn checkpoint(epoch: Epoch, root_seed: u64) -> Checkpoint {
        Checkpoint {
            epoch,
            root: root(root_seed),
        }
    }

    fn attestation_data(slot: Slot, index: CommitteeIndex, root_seed: u64) -> AttestationData {
        AttestationData {
            slot,
            index,
            beacon_block_root: root(root_seed),
            source: checkpoint(slot / 8, root_seed ^ 1),
            target: checkpoint(slot / 8 + 1, root_seed ^ 2),
        }
    }

    fn block_header(slot: Slot, proposer_index: ValidatorIndex) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot,
            proposer_index,
            parent_root: root(slot ^ 3),
            state_root: root(slot ^ 4),
            body_root: root(slot ^ 5),
        }
    }

    fn pending_attestation(
        bits: Vec<bool>,
        slot: Slot,
        inclusion_delay: u64,
        proposer_index: ValidatorIndex,
    ) -> Option<PendingAttestation<Minimal>> {
        Some(PendingAttestation {
            aggregation_bits: BitList::try_from(bits).ok()?,
            data: attestation_data(slot, inclusion_delay, proposer_index),
            inclusion_delay,
            proposer_index,
        })
    }

    #[quickcheck]
    fn checkpoint_survives_encoding(epoch: Epoch, root_seed: u64) -> bool {
        survives_encoding(&checkpoint(epoch, root_seed))
    }

    #[quickcheck]
    fn attestation_data_survives_encoding(
        slot: Slot,
        index: CommitteeIndex,
        root_seed: u64,
    ) -> bool {
        survives_encoding(&attestation_data(slot, index, root_seed))
    }

    #[quickcheck]
    fn block_header_survives_encoding(slot: Slot, proposer_index: ValidatorIndex) -> bool {
        survives_encoding(&block_header(slot, proposer_index))
    }

    #[quickcheck]
    fn pending_attestation_survives_encoding(
        bits: Vec<bool>,
        slot: Slot,
        inclusion_delay: u64,
        proposer_index: ValidatorIndex,
    ) -> bool {
        pending_attestation(bits, slot, inclusion_delay, proposer_index)
            .is_some_and(|attestation| survives_encoding(&attestation))
    }

    #[quickcheck]
    fn indexed_attestation_survives_encoding(
        attesting_indices: Vec<ValidatorIndex>,
        slot: Slot,
        signature_seed: u64,
    ) -> bool {
        let Ok(attesting_indices) = ContiguousList::try_from(attesting_indices) else {
            return false;
        };

        survives_encoding(&IndexedAttestation::<Minimal> {
            attesting_indices,
            data: attestation_data(slot, 0, signature_seed),
            signature: SignatureBytes::from_low_u64_be(signature_seed),
        })
    }

    #[quickcheck]
    fn signed_block_survives_encoding(
        slot: Slot,
        attestation_bits: Vec<Vec<bool>>,
        deposit_amounts: Vec<Gwei>,
        exits: Vec<(Epoch, ValidatorIndex)>,
        slashed_proposers: Vec<ValidatorIndex>,
    ) -> bool {
        let attestations = attestation_bits.into_iter().map(|bits| {
            BitList::try_from(bits).map(|aggregation_bits| Attestation {
                aggregation_bits,
                data: attestation_data(slot, 0, slot),
                signature: SignatureBytes::from_low_u64_be(slot),
            })
        });

        let Ok(attestations) = attestations.collect::<Result<Vec<_>, _>>() else {
            return false;
        };

        let deposits = deposit_amounts.into_iter().take(16).map(|amount| Deposit {
            proof: ContiguousVector::repeat_element(root(amount)),
            data: DepositData {
                pubkey: PublicKeyBytes::from_low_u64_be(amount),
                withdrawal_credentials: root(amount ^ 1),
                amount,
                signature: SignatureBytes::from_low_u64_be(amount ^ 2),
            },
        });

        let voluntary_exits = exits
            .into_iter()
            .take(16)
            .map(|(epoch, validator_index)| SignedVoluntaryExit {
                message: VoluntaryExit {
                    epoch,
                    validator_index,
                },
                signature: SignatureBytes::from_low_u64_be(epoch),
            });

        let proposer_slashings =
            slashed_proposers
                .into_iter()
                .take(16)
                .map(|proposer_index| ProposerSlashing {
                    signed_header_1: block_header(slot, proposer_index)
                        .with_signature(SignatureBytes::repeat_byte(1)),
                    signed_header_2: block_header(slot ^ 1, proposer_index)
                        .with_signature(SignatureBytes::repeat_byte(2)),
                });

        let (Ok(attestations), Ok(deposits), Ok(voluntary_exits), Ok(proposer_slashings)) = (
            ContiguousList::try_from_iter(attestations.into_iter().take(128)),
            ContiguousList::try_from_iter(deposits),
            ContiguousList::try_from_iter(voluntary_exits),
            ContiguousList::try_from_iter(proposer_slashings),
        ) else {
            return false;
        };

        let block = SignedBeaconBlock::<Minimal> {
            message: BeaconBlock {
                slot,
                proposer_index: slot ^ 7,
                parent_root: root(slot),
                state_root: root(slot ^ 1),
                body: BeaconBlockBody {
                    randao_reveal: SignatureBytes::from_low_u64_be(slot),
                    eth1_data: Eth1Data {
                        deposit_root: root(slot ^ 2),
                        deposit_count: slot,
                        block_hash: root(slot ^ 3),
                    },
                    graffiti: root(slot ^ 4),
                    proposer_slashings,
                    attester_slashings: ContiguousList::default(),
                    attestations,
                    deposits,
                    voluntary_exits,
                },
            },
            signature: SignatureBytes::from_low_u64_be(slot ^ 5),
        };

        survives_encoding(&block)
    }

    #[quickcheck]
    fn beacon_state_survives_encoding(
        slot: Slot,
        balances: Vec<Gwei>,
        attestation_bits: Vec<bool>,
        justification_bits: (bool, bool, bool, bool),
        historical_roots: Vec<u64>,
    ) -> bool {
        let validators = balances.iter().map(|balance| Validator {
            pubkey: PublicKeyBytes::from_low_u64_be(*balance),
            withdrawal_credentials: root(*balance),
            activation_eligibility_epoch: slot / 8,
            activation_epoch: slot / 8 + 1,
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
            slashed: balance % 2 == 1,
            effective_balance: *balance,
        });

        let Some(pending_attestation) = pending_attestation(attestation_bits, slot, 1, 0) else {
            return false;
        };

        let (Ok(validators), Ok(balances), Ok(historical_roots), Ok(previous_epoch_attestations)) = (
            ContiguousList::try_from_iter(validators),
            ContiguousList::try_from(balances),
            ContiguousList::try_from_iter(historical_roots.into_iter().map(root)),
            ContiguousList::try_from(vec![pending_attestation]),
        ) else {
            return false;
        };

        let mut state = BeaconState::<Minimal> {
            slot,
            latest_block_header: block_header(slot, 0),
            historical_roots,
            eth1_deposit_index: slot,
            validators,
            balances,
            previous_epoch_attestations,
            current_justified_checkpoint: checkpoint(slot / 8, slot),
            ..BeaconState::default()
        };

        *state.block_roots.mod_index_mut(slot) = root(slot);
        *state.randao_mixes.mod_index_mut(slot) = root(slot ^ 1);
        *state.slashings.mod_index_mut(slot) = slot;

        let (bit_0, bit_1, bit_2, bit_3) = justification_bits;

        for (index, bit) in [bit_0, bit_1, bit_2, bit_3].into_iter().enumerate() {
            state.justification_bits.set(index, bit);
        }

        survives_encoding(&state)
    }

    #[test]
    fn containers_with_empty_variable_fields_survive_encoding() {
        assert!(survives_encoding(&Attestation::<Minimal>::default()));
        assert!(survives_encoding(&IndexedAttestation::<Minimal>::default()));
        assert!(survives_encoding(&BeaconBlockBody::<Minimal>::default()));
        assert!(survives_encoding(&SignedBeaconBlock::<Minimal>::default()));
        assert!(survives_encoding(&BeaconState::<Minimal>::default()));

        let pending_attestation =
            pending_attestation(vec![], 0, 0, 0).expect("empty bitlists are allowed");

        assert!(survives_encoding(&pending_attestation));
    }
}
