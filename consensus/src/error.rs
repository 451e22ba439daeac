use hyperdrive_crypto::SignError;
use hyperdrive_types::{Digest, Nonce};
use hyperdrive_utils::ShutdownCause;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("signing failed: {0}")]
    Sign(#[from] SignError),

    #[error("stage cancelled: {0}")]
    Cancelled(ShutdownCause),

    #[error("nonce {nonce} already committed by tx {committed}, conflicting tx {conflicting}")]
    Conflict {
        nonce: Nonce,
        committed: Digest,
        conflicting: Digest,
    },
}
