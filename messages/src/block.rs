//! Blocks: the unit of ordering.

use hyperdrive_crypto::{sha3_256_multi, SignError, Signer, Verifier};
use hyperdrive_types::{Digest, Epoch, Height, Rank, Signature};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::MessageError;
use crate::tx::Tx;

const BLOCK_TAG: &[u8] = b"Block";

/// A batch of transactions proposed for one height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub epoch: Epoch,
    pub rank: Rank,
    pub height: Height,
    pub txs: Vec<Tx>,
    /// Author's signature over [`Block::hash`]. Not covered by the hash.
    pub signature: Option<Signature>,
}

impl Block {
    pub fn new(epoch: Epoch, rank: Rank, height: Height, txs: Vec<Tx>) -> Self {
        Self {
            epoch,
            rank,
            height,
            txs,
            signature: None,
        }
    }

    /// SHA3-256 over the block tag, epoch, rank, height and every tx hash.
    pub fn hash(&self) -> Digest {
        let rank = self.rank.to_be_bytes();
        let height = self.height.to_be_bytes();
        let tx_hashes: Vec<Digest> = self.txs.iter().map(Tx::hash).collect();
        let mut parts: Vec<&[u8]> = Vec::with_capacity(4 + tx_hashes.len());
        parts.push(BLOCK_TAG);
        parts.push(self.epoch.as_bytes());
        parts.push(&rank);
        parts.push(&height);
        parts.extend(tx_hashes.iter().map(|h| h.as_bytes().as_slice()));
        sha3_256_multi(&parts)
    }

    /// Attach the author's signature.
    pub fn signed(mut self, signer: &dyn Signer) -> Result<Self, SignError> {
        self.signature = Some(signer.sign(&self.hash())?);
        Ok(self)
    }

    /// Structural checks: every tx is valid, no nonce is spent twice within
    /// the block, and the author signature (if any) is the proposer's.
    ///
    /// Conflicts against previously committed blocks are checked separately
    /// against the replica's shared history.
    pub fn verify(&self, verifier: &dyn Verifier) -> Result<(), MessageError> {
        let mut spent = HashSet::new();
        for tx in &self.txs {
            tx.validate()?;
            for nonce in tx.nonces() {
                if !spent.insert(*nonce) {
                    return Err(MessageError::NonceReused { nonce: *nonce });
                }
            }
        }
        if let Some(signature) = &self.signature {
            verifier.verify_proposer(self.rank, &self.hash(), signature)?;
        }
        Ok(())
    }
}
