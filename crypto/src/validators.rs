//! Ed25519 implementations of the [`Signer`] and [`Verifier`] capabilities.

use hyperdrive_types::{Digest, KeyPair, PublicKey, Rank, Signature, Signatures};

use crate::capability::{Signer, Verifier};
use crate::error::{CryptoError, SignError, VerifyError};
use crate::sign::{sign_message, verify_signature};

/// Signs digests with a replica's Ed25519 key pair.
pub struct KeyPairSigner {
    keypair: KeyPair,
}

impl KeyPairSigner {
    pub fn new(keypair: KeyPair) -> Self {
        Self { keypair }
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public
    }
}

impl Signer for KeyPairSigner {
    fn sign(&self, digest: &Digest) -> Result<Signature, SignError> {
        Ok(sign_message(digest.as_bytes(), &self.keypair.private))
    }
}

/// The fixed, ordered set of validator public keys.
///
/// The proposer for rank `r` is the validator at index `r mod n`.
#[derive(Clone, Debug)]
pub struct ValidatorSet {
    validators: Vec<PublicKey>,
}

impl ValidatorSet {
    pub fn new(validators: Vec<PublicKey>) -> Result<Self, CryptoError> {
        if validators.is_empty() {
            return Err(CryptoError::EmptyValidatorSet);
        }
        Ok(Self { validators })
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Index of the proposer for `rank`.
    pub fn proposer_index(&self, rank: Rank) -> usize {
        (rank % self.validators.len() as u64) as usize
    }

    pub fn proposer(&self, rank: Rank) -> &PublicKey {
        &self.validators[self.proposer_index(rank)]
    }
}

impl Verifier for ValidatorSet {
    fn verify_proposer(
        &self,
        rank: Rank,
        digest: &Digest,
        signature: &Signature,
    ) -> Result<(), VerifyError> {
        if verify_signature(digest.as_bytes(), signature, self.proposer(rank)) {
            Ok(())
        } else {
            Err(VerifyError::WrongProposer { rank })
        }
    }

    fn verify_signatures(
        &self,
        digest: &Digest,
        signatures: &Signatures,
    ) -> Result<(), VerifyError> {
        if signatures.is_empty() {
            return Err(VerifyError::NoSignatures);
        }
        let mut seen = vec![false; self.validators.len()];
        for signature in signatures {
            let index = self
                .signer_of(digest, signature)
                .ok_or(VerifyError::UnknownSigner)?;
            if std::mem::replace(&mut seen[index], true) {
                return Err(VerifyError::DuplicateSigner { index });
            }
        }
        Ok(())
    }

    fn signer_of(&self, digest: &Digest, signature: &Signature) -> Option<usize> {
        self.validators
            .iter()
            .position(|key| verify_signature(digest.as_bytes(), signature, key))
    }
}
