//! Nullable signers.

use hyperdrive_crypto::{SignError, Signer};
use hyperdrive_types::{Digest, Signature};
use std::sync::Mutex;

/// A deterministic signer for testing.
///
/// The signature is the signer id repeated over 32 bytes followed by the
/// digest, so signatures differ per signer and per digest and signing twice
/// yields identical bytes.
#[derive(Clone, Copy, Debug)]
pub struct NullSigner {
    id: u8,
}

impl NullSigner {
    pub fn new(id: u8) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    /// The signature this signer produces for `digest`.
    pub fn signature_for(&self, digest: &Digest) -> Signature {
        let mut bytes = [self.id; 64];
        bytes[32..].copy_from_slice(digest.as_bytes());
        Signature(bytes)
    }
}

impl Signer for NullSigner {
    fn sign(&self, digest: &Digest) -> Result<Signature, SignError> {
        Ok(self.signature_for(digest))
    }
}

/// A signer whose key is never available.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingSigner;

impl Signer for FailingSigner {
    fn sign(&self, _digest: &Digest) -> Result<Signature, SignError> {
        Err(SignError::KeyUnavailable)
    }
}

/// Wraps a [`NullSigner`] and fails the calls whose (zero-based) index is in
/// `failures`.
pub struct FlakySigner {
    inner: NullSigner,
    failures: Vec<usize>,
    calls: Mutex<usize>,
}

impl FlakySigner {
    pub fn new(inner: NullSigner, failures: Vec<usize>) -> Self {
        Self {
            inner,
            failures,
            calls: Mutex::new(0),
        }
    }

    /// Number of `sign` calls made so far.
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Signer for FlakySigner {
    fn sign(&self, digest: &Digest) -> Result<Signature, SignError> {
        let mut calls = self.calls.lock().unwrap();
        let index = *calls;
        *calls += 1;
        if self.failures.contains(&index) {
            return Err(SignError::Other(format!("induced failure on call {index}")));
        }
        self.inner.sign(digest)
    }
}
