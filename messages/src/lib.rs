//! Message model for the Hyperdrive consensus engine.
//!
//! A [`Block`] of [`Tx`]s is proposed for a height by the replica holding the
//! rank for that round ([`Proposal`]). Replicas that accept the proposal sign
//! a [`Prepare`]; a quorum of prepare signatures turns into a [`Commit`]; a
//! quorum of commit signatures certifies the block. A [`Fault`] is raised
//! whenever a message for a `(rank, height)` fails verification.
//!
//! [`Message`] is the tagged union the threshold store and the stage
//! processors operate on.

pub mod block;
pub mod consensus;
pub mod error;
pub mod message;
pub mod tx;

pub use block::Block;
pub use consensus::{Commit, Fault, Prepare, Proposal};
pub use error::MessageError;
pub use message::{Message, MessageKind};
pub use tx::Tx;
