use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] hyperdrive_crypto::CryptoError),

    #[error("consensus error: {0}")]
    Consensus(#[from] hyperdrive_consensus::ConsensusError),

    #[error("network error: {0}")]
    Network(#[from] hyperdrive_network::NetworkError),

    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
