use hyperdrive_crypto::VerifyError;
use hyperdrive_types::{Digest, Nonce};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("transaction has no nonces")]
    EmptyTx,

    #[error("nonce {nonce} repeated within transaction")]
    DuplicateNonce { nonce: Nonce },

    #[error("transaction hash mismatch: claimed {claimed}, computed {computed}")]
    TxHashMismatch { claimed: Digest, computed: Digest },

    #[error("nonce {nonce} spent by more than one transaction in the block")]
    NonceReused { nonce: Nonce },

    #[error("signature verification failed: {0}")]
    Verify(#[from] VerifyError),
}
