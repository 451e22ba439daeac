//! Hyperdrive replica.
//!
//! Ties the routing pipeline (`hyperdrive-network`), the consensus stages
//! (`hyperdrive-consensus`) and a proposer together into one [`Replica`]
//! that a transport feeds through its ingress and drains through its egress.

pub mod config;
pub mod error;
pub mod metrics;
pub mod proposer;
pub mod replica;

pub use config::ReplicaConfig;
pub use error::NodeError;
pub use metrics::ReplicaMetrics;
pub use proposer::Proposer;
pub use replica::{Replica, ReplicaHandle};
