use ssz::{ContiguousVector, SszHash as _};

use crate::{
    phase0::{
        consts::DepositProofLength,
        containers::{
            BeaconBlock, BeaconBlockHeader, Deposit, DepositData, DepositMessage,
            SignedBeaconBlockHeader,
        },
        error::Error,
        primitives::{SignatureBytes, H256},
    },
    preset::Preset,
};

impl<P: Preset> BeaconBlock<P> {
    /// Returns the header of this block, which commits to the body through its root.
    #[must_use]
    pub fn to_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot: self.slot,
            proposer_index: self.proposer_index,
            parent_root: self.parent_root,
            state_root: self.state_root,
            body_root: self.body.hash_tree_root(),
        }
    }
}

impl BeaconBlockHeader {
    #[inline]
    #[must_use]
    pub const fn with_signature(self, signature: SignatureBytes) -> SignedBeaconBlockHeader {
        SignedBeaconBlockHeader {
            message: self,
            signature,
        }
    }
}

impl Deposit {
    /// Builds a deposit from a proof that may be shorter than the fixed proof length.
    ///
    /// Missing hashes are filled with zeros.
    pub fn with_padded_proof(
        proof: impl IntoIterator<Item = H256>,
        data: DepositData,
    ) -> Result<Self, Error> {
        let maximum = <DepositProofLength as typenum::Unsigned>::USIZE;
        let mut proof = proof.into_iter().collect::<Vec<_>>();
        let actual = proof.len();

        if actual > maximum {
            return Err(Error::DepositProofTooLong { maximum, actual });
        }

        proof.resize(maximum, H256::zero());

        let proof = ContiguousVector::try_from(proof)
            .map_err(|_| Error::DepositProofTooLong { maximum, actual })?;

        Ok(Self { proof, data })
    }
}

impl From<DepositData> for DepositMessage {
    #[inline]
    fn from(deposit_data: DepositData) -> Self {
        let DepositData {
            pubkey,
            withdrawal_credentials,
            amount,
            ..
        } = deposit_data;

        Self {
            pubkey,
            withdrawal_credentials,
            amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools as _;
    use ssz::{ContiguousList, ReadError, Size, SszRead as _, SszSize, SszWrite as _};

    use crate::{
        phase0::{
            consts::FAR_FUTURE_EPOCH,
            containers::{Attestation, AttestationData, Checkpoint, Validator},
            primitives::PublicKeyBytes,
        },
        preset::Minimal,
    };

    use super::*;

    fn validator() -> Validator {
        Validator {
            pubkey: PublicKeyBytes::repeat_byte(1),
            withdrawal_credentials: H256::repeat_byte(2),
            activation_eligibility_epoch: 3,
            activation_epoch: 4,
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
            slashed: true,
            effective_balance: 32_000_000_000,
        }
    }

    #[test]
    fn validator_fields_are_encoded_in_declaration_order() -> Result<(), ReadError> {
        let bytes = validator().to_ssz().expect("validators have no offsets");

        assert_eq!(<Validator as SszSize>::SIZE, Size::Fixed { size: 121 });
        assert_eq!(bytes.len(), 121);
        assert_eq!(bytes[..48], [1; 48]);
        assert_eq!(bytes[48..80], [2; 32]);
        assert_eq!(bytes[80..88], 3_u64.to_le_bytes());
        assert_eq!(bytes[112], 1);
        assert_eq!(bytes[113..], 32_000_000_000_u64.to_le_bytes());
        assert_eq!(Validator::from_ssz(bytes)?, validator());

        Ok(())
    }

    #[test]
    fn changing_any_validator_field_changes_root() {
        let original = validator();

        let mutations: [fn(&mut Validator); 8] = [
            |validator| validator.pubkey = PublicKeyBytes::zero(),
            |validator| validator.withdrawal_credentials = H256::zero(),
            |validator| validator.activation_eligibility_epoch += 1,
            |validator| validator.activation_epoch += 1,
            |validator| validator.exit_epoch = 0,
            |validator| validator.withdrawable_epoch = 0,
            |validator| validator.slashed = false,
            |validator| validator.effective_balance -= 1,
        ];

        let roots = mutations
            .into_iter()
            .map(|mutate| {
                let mut validator = original;
                mutate(&mut validator);
                validator.hash_tree_root()
            })
            .chain([original.hash_tree_root()])
            .collect_vec();

        assert!(roots.iter().all_unique());
    }

    #[test]
    fn value_equal_attestations_have_equal_roots() {
        let build = || {
            let mut attestation = Attestation::<Minimal>::default();
            attestation.data.target = Checkpoint {
                epoch: 3,
                root: H256::repeat_byte(7),
            };
            attestation
        };

        assert_eq!(build().hash_tree_root(), build().hash_tree_root());
    }

    #[test]
    fn attestation_survives_encoding() -> Result<(), ReadError> {
        let attestation = Attestation::<Minimal> {
            aggregation_bits: vec![true, false, true].try_into()?,
            data: AttestationData {
                slot: 9,
                index: 1,
                beacon_block_root: H256::repeat_byte(3),
                source: Checkpoint::default(),
                target: Checkpoint {
                    epoch: 1,
                    root: H256::repeat_byte(4),
                },
            },
            signature: SignatureBytes::repeat_byte(5),
        };

        let bytes = attestation.to_ssz().expect("offsets fit in 4 bytes");

        assert_eq!(Attestation::from_ssz(bytes)?, attestation);

        Ok(())
    }

    #[test]
    fn container_decoding_rejects_wrong_first_offset() {
        let attestation = Attestation::<Minimal>::default();
        let mut bytes = attestation.to_ssz().expect("offsets fit in 4 bytes");

        bytes[0] += 1;

        assert!(Attestation::<Minimal>::from_ssz(bytes).is_err());
    }

    #[test]
    fn container_decoding_rejects_truncated_input() {
        let bytes = validator().to_ssz().expect("validators have no offsets");

        assert_eq!(
            Validator::from_ssz(&bytes[..120]),
            Err(ReadError::FixedSizeMismatch {
                expected: 121,
                actual: 120,
            }),
        );
    }

    #[test]
    fn block_with_empty_body_survives_encoding() -> Result<(), ReadError> {
        let block = BeaconBlock::<Minimal> {
            slot: 1,
            parent_root: H256::repeat_byte(1),
            ..BeaconBlock::default()
        };

        let bytes = block.to_ssz().expect("offsets fit in 4 bytes");

        assert_eq!(BeaconBlock::from_ssz(bytes)?, block);
        assert_eq!(block.body.attestations, ContiguousList::default());

        Ok(())
    }

    #[test]
    fn header_commits_to_body() {
        let mut block = BeaconBlock::<Minimal>::default();
        let header_before = block.to_header();

        block.body.graffiti = H256::repeat_byte(0xff);

        assert_ne!(block.to_header().body_root, header_before.body_root);
        assert_eq!(block.to_header().slot, header_before.slot);
    }

    #[test]
    fn short_deposit_proof_is_zero_padded() -> Result<(), Error> {
        let deposit = Deposit::with_padded_proof([H256::repeat_byte(1)], DepositData::default())?;

        assert_eq!(deposit.proof.len(), 33);
        assert_eq!(deposit.proof[0], H256::repeat_byte(1));
        assert!(deposit.proof[1..].iter().all(H256::is_zero));

        Ok(())
    }

    #[test]
    fn overlong_deposit_proof_is_rejected() {
        let proof = core::iter::repeat_n(H256::zero(), 34);

        assert_eq!(
            Deposit::with_padded_proof(proof, DepositData::default()),
            Err(Error::DepositProofTooLong {
                maximum: 33,
                actual: 34,
            }),
        );
    }

    #[test]
    fn deposit_with_full_proof_survives_encoding() -> Result<(), ReadError> {
        let deposit = Deposit::with_padded_proof(
            (0..33).map(H256::repeat_byte),
            DepositData::default(),
        )
        .expect("proof has the maximum length");

        let bytes = deposit.to_ssz().expect("deposits have no offsets");

        assert_eq!(bytes.len(), 33 * 32 + 184);
        assert_eq!(Deposit::from_ssz(bytes)?, deposit);

        Ok(())
    }
}
