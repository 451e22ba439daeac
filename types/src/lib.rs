//! Fundamental types for the Hyperdrive consensus engine.
//!
//! This crate defines the primitives shared by every other crate in the
//! workspace: 32-byte digests, nonces and epochs, key and signature types,
//! signature sets, and the height/rank/quorum parameters of the protocol.

pub mod hash;
pub mod keys;
pub mod nonce;
pub mod params;
pub mod signatures;

pub use hash::Digest;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use nonce::{Epoch, Nonce};
pub use params::{max_faulty, quorum, Height, Rank, HEIGHT_CEILING};
pub use signatures::Signatures;
