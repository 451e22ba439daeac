//! Cryptographic capabilities consumed by the Hyperdrive core.
//!
//! - [`Signer`] / [`Verifier`] traits, the only cryptographic surface the
//!   consensus stages depend on.
//! - **Ed25519** implementations of both: [`KeyPairSigner`] and
//!   [`ValidatorSet`].
//! - **Keccak-256** for transaction hashes and **SHA3-256** for block and
//!   message hashes.

pub mod capability;
pub mod error;
pub mod hash;
pub mod keys;
pub mod sign;
pub mod validators;

pub use capability::{Signer, Verifier};
pub use error::{CryptoError, SignError, VerifyError};
pub use hash::{keccak256, keccak256_multi, sha3_256, sha3_256_multi};
pub use keys::{generate_keypair, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
pub use validators::{KeyPairSigner, ValidatorSet};
