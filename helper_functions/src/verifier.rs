#![expect(clippy::module_name_repetitions)]

use anyhow::{ensure, Result};
use derive_more::Constructor;
use types::phase0::primitives::{Domain, PublicKeyBytes, SignatureBytes, H256};

use crate::{
    error::{Error, SignatureKind},
    oracles::{BranchProofOracle, MerkleProofOracle, SignatureOracle},
};

/// The seam through which state transition functions check credentials.
///
/// Failed checks are reported as [`Error::SignatureInvalid`]. Malformed credentials are reported as
/// [`CredentialError`](crate::oracles::CredentialError) wrapped in [`anyhow::Error`].
pub trait Verifier {
    const IS_NULL: bool;

    fn verify_singular(
        &mut self,
        message: H256,
        domain: Domain,
        signature: SignatureBytes,
        public_key: PublicKeyBytes,
        signature_kind: SignatureKind,
    ) -> Result<()>;

    fn verify_aggregate(
        &mut self,
        message: H256,
        domain: Domain,
        signature: SignatureBytes,
        public_keys: &[PublicKeyBytes],
        signature_kind: SignatureKind,
    ) -> Result<()>;

    /// Deposit proofs are checked even when signatures are not.
    fn verify_merkle_proof(
        &mut self,
        leaf: H256,
        proof: &[H256],
        depth: usize,
        index: u64,
        root: H256,
    ) -> Result<bool> {
        BranchProofOracle
            .verify_proof(leaf, proof, depth, index, root)
            .map_err(Into::into)
    }
}

impl<V: Verifier> Verifier for &mut V {
    const IS_NULL: bool = V::IS_NULL;

    #[inline]
    fn verify_singular(
        &mut self,
        message: H256,
        domain: Domain,
        signature: SignatureBytes,
        public_key: PublicKeyBytes,
        signature_kind: SignatureKind,
    ) -> Result<()> {
        (*self).verify_singular(message, domain, signature, public_key, signature_kind)
    }

    #[inline]
    fn verify_aggregate(
        &mut self,
        message: H256,
        domain: Domain,
        signature: SignatureBytes,
        public_keys: &[PublicKeyBytes],
        signature_kind: SignatureKind,
    ) -> Result<()> {
        (*self).verify_aggregate(message, domain, signature, public_keys, signature_kind)
    }

    #[inline]
    fn verify_merkle_proof(
        &mut self,
        leaf: H256,
        proof: &[H256],
        depth: usize,
        index: u64,
        root: H256,
    ) -> Result<bool> {
        (*self).verify_merkle_proof(leaf, proof, depth, index, root)
    }
}

/// Accepts every signature. Used for blocks whose signatures were checked elsewhere and in tests.
#[derive(Clone, Copy, Default, Debug)]
pub struct NullVerifier;

impl Verifier for NullVerifier {
    const IS_NULL: bool = true;

    #[inline]
    fn verify_singular(
        &mut self,
        _message: H256,
        _domain: Domain,
        _signature: SignatureBytes,
        _public_key: PublicKeyBytes,
        _signature_kind: SignatureKind,
    ) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn verify_aggregate(
        &mut self,
        _message: H256,
        _domain: Domain,
        _signature: SignatureBytes,
        _public_keys: &[PublicKeyBytes],
        _signature_kind: SignatureKind,
    ) -> Result<()> {
        Ok(())
    }
}

/// Delegates every check to oracles.
#[derive(Clone, Copy, Debug, Constructor)]
pub struct OracleVerifier<S, M = BranchProofOracle> {
    signature_oracle: S,
    merkle_proof_oracle: M,
}

impl<S: SignatureOracle> OracleVerifier<S> {
    #[must_use]
    pub const fn with_signature_oracle(signature_oracle: S) -> Self {
        Self {
            signature_oracle,
            merkle_proof_oracle: BranchProofOracle,
        }
    }
}

impl<S: SignatureOracle, M: MerkleProofOracle> Verifier for OracleVerifier<S, M> {
    const IS_NULL: bool = false;

    fn verify_singular(
        &mut self,
        message: H256,
        domain: Domain,
        signature: SignatureBytes,
        public_key: PublicKeyBytes,
        signature_kind: SignatureKind,
    ) -> Result<()> {
        let valid = self
            .signature_oracle
            .verify(public_key, message, signature, domain)?;

        ensure!(valid, Error::SignatureInvalid(signature_kind));

        Ok(())
    }

    fn verify_aggregate(
        &mut self,
        message: H256,
        domain: Domain,
        signature: SignatureBytes,
        public_keys: &[PublicKeyBytes],
        signature_kind: SignatureKind,
    ) -> Result<()> {
        let public_key = self.signature_oracle.aggregate_public_keys(public_keys)?;
        self.verify_singular(message, domain, signature, public_key, signature_kind)
    }

    fn verify_merkle_proof(
        &mut self,
        leaf: H256,
        proof: &[H256],
        depth: usize,
        index: u64,
        root: H256,
    ) -> Result<bool> {
        self.merkle_proof_oracle
            .verify_proof(leaf, proof, depth, index, root)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use crate::oracles::CredentialError;

    use super::*;

    // Treats a signature as valid when its first byte matches the first byte of the message.
    struct FirstByteOracle;

    impl SignatureOracle for FirstByteOracle {
        fn verify(
            &self,
            public_key: PublicKeyBytes,
            message: H256,
            signature: SignatureBytes,
            _domain: Domain,
        ) -> Result<bool, CredentialError> {
            if public_key.is_zero() {
                return Err(CredentialError::MalformedPublicKey { public_key });
            }

            Ok(signature[0] == message[0])
        }

        fn aggregate_public_keys(
            &self,
            public_keys: &[PublicKeyBytes],
        ) -> Result<PublicKeyBytes, CredentialError> {
            public_keys
                .first()
                .copied()
                .ok_or(CredentialError::NoPublicKeys)
        }
    }

    fn verify_with_first_byte_oracle(public_key: PublicKeyBytes, signature_byte: u8) -> Result<()> {
        OracleVerifier::with_signature_oracle(FirstByteOracle).verify_singular(
            H256::repeat_byte(7),
            Domain::zero(),
            SignatureBytes::repeat_byte(signature_byte),
            public_key,
            SignatureKind::Block,
        )
    }

    #[test]
    fn oracle_verifier_accepts_valid_signature() -> Result<()> {
        verify_with_first_byte_oracle(PublicKeyBytes::repeat_byte(1), 7)
    }

    #[test]
    fn oracle_verifier_reports_invalid_signature() {
        let error = verify_with_first_byte_oracle(PublicKeyBytes::repeat_byte(1), 8)
            .expect_err("signature does not match");

        assert!(matches!(
            error.downcast_ref::<Error>(),
            Some(Error::SignatureInvalid(SignatureKind::Block)),
        ));
    }

    #[test]
    fn oracle_verifier_propagates_credential_errors() {
        let error = verify_with_first_byte_oracle(PublicKeyBytes::zero(), 7)
            .expect_err("public key is malformed");

        assert_eq!(
            error.downcast_ref::<CredentialError>(),
            Some(&CredentialError::MalformedPublicKey {
                public_key: PublicKeyBytes::zero(),
            }),
        );
    }

    #[test]
    fn oracle_verifier_rejects_aggregate_without_keys() {
        let error = OracleVerifier::with_signature_oracle(FirstByteOracle)
            .verify_aggregate(
                H256::zero(),
                Domain::zero(),
                SignatureBytes::zero(),
                &[],
                SignatureKind::Attestation,
            )
            .expect_err("there are no public keys");

        assert_eq!(
            error.downcast_ref::<CredentialError>(),
            Some(&CredentialError::NoPublicKeys),
        );
    }

    #[test]
    fn null_verifier_accepts_anything() -> Result<()> {
        NullVerifier.verify_singular(
            H256::zero(),
            Domain::zero(),
            SignatureBytes::zero(),
            PublicKeyBytes::zero(),
            SignatureKind::Randao,
        )
    }
}
