//! Nullable verifier.

use hyperdrive_crypto::{Verifier, VerifyError};
use hyperdrive_types::{Digest, Rank, Signature, Signatures};
use std::collections::HashSet;

enum Mode {
    AcceptAll,
    RejectAll,
    RejectDigests(HashSet<Digest>),
}

/// A verifier whose verdicts are fixed by configuration.
pub struct NullVerifier {
    mode: Mode,
}

impl NullVerifier {
    /// Every signature verifies.
    pub fn accept_all() -> Self {
        Self {
            mode: Mode::AcceptAll,
        }
    }

    /// No signature verifies.
    pub fn reject_all() -> Self {
        Self {
            mode: Mode::RejectAll,
        }
    }

    /// Signatures over any of `digests` fail; everything else verifies.
    pub fn rejecting(digests: impl IntoIterator<Item = Digest>) -> Self {
        Self {
            mode: Mode::RejectDigests(digests.into_iter().collect()),
        }
    }

    fn check(&self, digest: &Digest) -> Result<(), VerifyError> {
        match &self.mode {
            Mode::AcceptAll => Ok(()),
            Mode::RejectAll => Err(VerifyError::Other("rejected by null verifier".into())),
            Mode::RejectDigests(rejected) if rejected.contains(digest) => {
                Err(VerifyError::Other(format!("digest {digest} rejected")))
            }
            Mode::RejectDigests(_) => Ok(()),
        }
    }
}

impl Verifier for NullVerifier {
    fn verify_proposer(
        &self,
        rank: Rank,
        digest: &Digest,
        _signature: &Signature,
    ) -> Result<(), VerifyError> {
        self.check(digest)
            .map_err(|_| VerifyError::WrongProposer { rank })
    }

    fn verify_signatures(
        &self,
        digest: &Digest,
        _signatures: &Signatures,
    ) -> Result<(), VerifyError> {
        self.check(digest)
    }

    /// The first byte of a [`crate::NullSigner`] signature is its id.
    fn signer_of(&self, _digest: &Digest, signature: &Signature) -> Option<usize> {
        Some(usize::from(signature.0[0]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_and_reject_all() {
        let sig = Signature([0u8; 64]);
        assert!(NullVerifier::accept_all()
            .verify_proposer(0, &Digest::ZERO, &sig)
            .is_ok());
        assert!(NullVerifier::reject_all()
            .verify_signatures(&Digest::ZERO, &Signatures::from(sig))
            .is_err());
    }

    #[test]
    fn signer_is_the_null_signer_id() {
        let sig = crate::NullSigner::new(6).signature_for(&Digest::ZERO);
        assert_eq!(
            NullVerifier::accept_all().signer_of(&Digest::ZERO, &sig),
            Some(6)
        );
    }

    #[test]
    fn rejects_only_listed_digests() {
        let bad = Digest::new([1u8; 32]);
        let verifier = NullVerifier::rejecting([bad]);
        let sigs = Signatures::new();
        assert!(verifier.verify_signatures(&bad, &sigs).is_err());
        assert!(verifier.verify_signatures(&Digest::ZERO, &sigs).is_ok());
        assert_eq!(
            verifier.verify_proposer(3, &bad, &Signature([0u8; 64])),
            Err(VerifyError::WrongProposer { rank: 3 })
        );
    }
}
