//! Transactions: ordered sets of nonces.

use hyperdrive_crypto::keccak256_multi;
use hyperdrive_types::{Digest, Nonce};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::MessageError;

/// An ordered sequence of nonces identified by `Keccak256(nonces)`.
///
/// The hash travels with the transaction; [`Tx::validate`] recomputes it so a
/// transaction received from the network cannot claim a hash it does not have.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    nonces: Vec<Nonce>,
    hash: Digest,
}

impl Tx {
    pub fn new(nonces: Vec<Nonce>) -> Self {
        let hash = Self::compute_hash(&nonces);
        Self { nonces, hash }
    }

    pub fn nonces(&self) -> &[Nonce] {
        &self.nonces
    }

    pub fn hash(&self) -> Digest {
        self.hash
    }

    /// Check that the transaction is non-empty, has no repeated nonce and
    /// carries the hash of its nonces.
    pub fn validate(&self) -> Result<(), MessageError> {
        if self.nonces.is_empty() {
            return Err(MessageError::EmptyTx);
        }
        let mut seen = HashSet::with_capacity(self.nonces.len());
        for nonce in &self.nonces {
            if !seen.insert(nonce) {
                return Err(MessageError::DuplicateNonce { nonce: *nonce });
            }
        }
        let computed = Self::compute_hash(&self.nonces);
        if computed != self.hash {
            return Err(MessageError::TxHashMismatch {
                claimed: self.hash,
                computed,
            });
        }
        Ok(())
    }

    fn compute_hash(nonces: &[Nonce]) -> Digest {
        let parts: Vec<&[u8]> = nonces.iter().map(|n| n.as_bytes().as_slice()).collect();
        keccak256_multi(&parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nonce(n: u8) -> Nonce {
        Nonce([n; 32])
    }

    #[test]
    fn hash_depends_on_order() {
        let a = Tx::new(vec![nonce(1), nonce(2)]);
        let b = Tx::new(vec![nonce(2), nonce(1)]);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn valid_tx() {
        assert!(Tx::new(vec![nonce(1), nonce(2), nonce(3)]).validate().is_ok());
    }

    #[test]
    fn empty_tx_rejected() {
        assert_eq!(Tx::new(Vec::new()).validate(), Err(MessageError::EmptyTx));
    }

    #[test]
    fn repeated_nonce_rejected() {
        let tx = Tx::new(vec![nonce(1), nonce(2), nonce(1)]);
        assert_eq!(
            tx.validate(),
            Err(MessageError::DuplicateNonce { nonce: nonce(1) })
        );
    }

    #[test]
    fn tampered_hash_rejected() {
        let mut tx = Tx::new(vec![nonce(1)]);
        tx.hash = Digest::new([9u8; 32]);
        assert!(matches!(
            tx.validate(),
            Err(MessageError::TxHashMismatch { .. })
        ));
    }
}
