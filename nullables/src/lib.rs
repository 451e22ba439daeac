//! Nullable infrastructure for deterministic testing.
//!
//! The consensus core only reaches cryptography through the `Signer` and
//! `Verifier` traits. This crate provides implementations that:
//! - Return deterministic signatures without key material
//! - Can be told to fail on demand
//! - Accept or reject verification by configuration
//!
//! Usage: swap real implementations for nullables in tests.

pub mod signer;
pub mod verifier;

pub use signer::{FailingSigner, FlakySigner, NullSigner};
pub use verifier::NullVerifier;
