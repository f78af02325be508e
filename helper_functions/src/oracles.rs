//! Capabilities the state transition relies on but does not implement.
//!
//! Signature schemes are external. Credentials reach an oracle exactly as they appear in blocks.

use std::sync::Arc;

use thiserror::Error;
use types::phase0::primitives::{Domain, PublicKeyBytes, SignatureBytes, H256};

use crate::predicates;

/// Raised when an oracle cannot interpret its input at all.
///
/// A well-formed signature that does not match is not an error. Oracles report that as `false`.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum CredentialError {
    #[error("public key {public_key:?} is malformed")]
    MalformedPublicKey { public_key: PublicKeyBytes },
    #[error("signature {signature:?} is malformed")]
    MalformedSignature { signature: SignatureBytes },
    #[error("cannot aggregate an empty set of public keys")]
    NoPublicKeys,
    #[error("proof of length {length} does not match depth {depth}")]
    ProofLengthMismatch { length: usize, depth: usize },
}

pub trait SignatureOracle {
    fn verify(
        &self,
        public_key: PublicKeyBytes,
        message: H256,
        signature: SignatureBytes,
        domain: Domain,
    ) -> Result<bool, CredentialError>;

    /// Combines public keys for verifying an aggregate signature with [`SignatureOracle::verify`].
    fn aggregate_public_keys(
        &self,
        public_keys: &[PublicKeyBytes],
    ) -> Result<PublicKeyBytes, CredentialError>;
}

impl<O: SignatureOracle + ?Sized> SignatureOracle for &O {
    fn verify(
        &self,
        public_key: PublicKeyBytes,
        message: H256,
        signature: SignatureBytes,
        domain: Domain,
    ) -> Result<bool, CredentialError> {
        (**self).verify(public_key, message, signature, domain)
    }

    fn aggregate_public_keys(
        &self,
        public_keys: &[PublicKeyBytes],
    ) -> Result<PublicKeyBytes, CredentialError> {
        (**self).aggregate_public_keys(public_keys)
    }
}

impl<O: SignatureOracle + ?Sized> SignatureOracle for Arc<O> {
    fn verify(
        &self,
        public_key: PublicKeyBytes,
        message: H256,
        signature: SignatureBytes,
        domain: Domain,
    ) -> Result<bool, CredentialError> {
        (**self).verify(public_key, message, signature, domain)
    }

    fn aggregate_public_keys(
        &self,
        public_keys: &[PublicKeyBytes],
    ) -> Result<PublicKeyBytes, CredentialError> {
        (**self).aggregate_public_keys(public_keys)
    }
}

pub trait MerkleProofOracle {
    /// Checks that `leaf` is at position `index` in a tree of the given `depth` with `root`.
    fn verify_proof(
        &self,
        leaf: H256,
        proof: &[H256],
        depth: usize,
        index: u64,
        root: H256,
    ) -> Result<bool, CredentialError>;
}

/// Verifies proofs by hashing the branch.
#[derive(Clone, Copy, Default, Debug)]
pub struct BranchProofOracle;

impl MerkleProofOracle for BranchProofOracle {
    fn verify_proof(
        &self,
        leaf: H256,
        proof: &[H256],
        depth: usize,
        index: u64,
        root: H256,
    ) -> Result<bool, CredentialError> {
        if proof.len() != depth {
            return Err(CredentialError::ProofLengthMismatch {
                length: proof.len(),
                depth,
            });
        }

        Ok(predicates::is_valid_merkle_branch(
            leaf,
            proof.iter().copied(),
            index,
            root,
        ))
    }
}
