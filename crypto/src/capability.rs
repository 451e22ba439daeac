//! Signing and verification capabilities.
//!
//! The consensus stages only ever see these two traits. Production replicas
//! plug in [`crate::KeyPairSigner`] and [`crate::ValidatorSet`]; tests use the
//! doubles from `hyperdrive-nullables`.

use hyperdrive_types::{Digest, Rank, Signature, Signatures};

use crate::error::{SignError, VerifyError};

/// Produces this replica's signature over a digest.
///
/// Must be safe for concurrent use: every stage task holds a shared handle.
pub trait Signer: Send + Sync {
    fn sign(&self, digest: &Digest) -> Result<Signature, SignError>;
}

/// Checks signatures produced by members of the validator set.
pub trait Verifier: Send + Sync {
    /// Verify that `signature` over `digest` was produced by the replica
    /// designated as proposer for `rank`.
    fn verify_proposer(
        &self,
        rank: Rank,
        digest: &Digest,
        signature: &Signature,
    ) -> Result<(), VerifyError>;

    /// Verify that every signature in the set signs `digest` and that no
    /// validator appears twice.
    fn verify_signatures(&self, digest: &Digest, signatures: &Signatures)
        -> Result<(), VerifyError>;

    /// Index of the validator that produced `signature` over `digest`.
    ///
    /// A validator can produce many distinct valid signatures over one
    /// digest, so thresholds count these indices, never signature bytes.
    fn signer_of(&self, digest: &Digest, signature: &Signature) -> Option<usize>;
}
