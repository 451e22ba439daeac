use hyperdrive_types::Rank;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("entropy source failed: {0}")]
    Entropy(String),

    #[error("validator set is empty")]
    EmptyValidatorSet,
}

/// Failure of a local signing operation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SignError {
    #[error("signing key unavailable")]
    KeyUnavailable,

    #[error("{0}")]
    Other(String),
}

/// Failure to verify a signature or a signature set.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("signature is not from the proposer for rank {rank}")]
    WrongProposer { rank: Rank },

    #[error("signature does not belong to any validator")]
    UnknownSigner,

    #[error("validator {index} signed more than once")]
    DuplicateSigner { index: usize },

    #[error("signature set is empty")]
    NoSignatures,

    #[error("{0}")]
    Other(String),
}
