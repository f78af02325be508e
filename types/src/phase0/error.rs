use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("deposit proof has {actual} hashes, more than the maximum of {maximum}")]
    DepositProofTooLong { maximum: usize, actual: usize },
}
