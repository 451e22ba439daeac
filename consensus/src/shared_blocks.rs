//! Shared per-replica block state: height, rank and committed nonce history.
//!
//! Height has a single writer. It lives behind a `watch` channel: increments
//! are serialized by the channel, and every other component reads either a
//! snapshot ([`SharedBlocks::height`]) or a change stream
//! ([`SharedBlocks::subscribe`]). No component reads a height that is being
//! concurrently incremented.

use hyperdrive_messages::{Block, Tx};
use hyperdrive_types::{Digest, Height, Nonce, Rank};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use tokio::sync::watch;

use crate::error::ConsensusError;

pub struct SharedBlocks {
    /// Nonce → hash of the tx that committed it.
    history: RwLock<HashMap<Nonce, Digest>>,
    height: watch::Sender<Height>,
    rank: AtomicU64,
}

impl SharedBlocks {
    pub fn new(height: Height, rank: Rank) -> Self {
        let (height, _) = watch::channel(height);
        Self {
            history: RwLock::new(HashMap::new()),
            height,
            rank: AtomicU64::new(rank),
        }
    }

    /// Snapshot of the current height.
    pub fn height(&self) -> Height {
        *self.height.borrow()
    }

    /// A stream of height updates, starting from the current height.
    pub fn subscribe(&self) -> watch::Receiver<Height> {
        self.height.subscribe()
    }

    /// Atomically increment the height and return the new value.
    pub fn next_height(&self) -> Height {
        let mut next = 0;
        self.height.send_modify(|h| {
            *h += 1;
            next = *h;
        });
        next
    }

    /// Increment the height only if it is still `from`. Returns the new
    /// height, or `None` if another caller already advanced past `from`.
    pub fn try_advance(&self, from: Height) -> Option<Height> {
        let mut next = None;
        self.height.send_if_modified(|h| {
            if *h != from {
                return false;
            }
            *h += 1;
            next = Some(*h);
            true
        });
        next
    }

    pub fn rank(&self) -> Rank {
        self.rank.load(Ordering::SeqCst)
    }

    /// Move to the next proposer and return the new rank.
    pub fn next_rank(&self) -> Rank {
        self.rank.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Move to the next proposer only if the rank is still `from`.
    pub fn try_advance_rank(&self, from: Rank) -> Option<Rank> {
        self.rank
            .compare_exchange(from, from + 1, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|prev| prev + 1)
    }

    /// Reject `tx` if any of its nonces is already committed by a different
    /// tx. Re-validating an already committed tx succeeds.
    pub fn validate_tuple(&self, tx: &Tx) -> Result<(), ConsensusError> {
        let history = self.history.read().unwrap_or_else(PoisonError::into_inner);
        Self::check_tx(&history, tx)
    }

    /// [`Self::validate_tuple`] for every tx in `block`.
    pub fn validate_block(&self, block: &Block) -> Result<(), ConsensusError> {
        let history = self.history.read().unwrap_or_else(PoisonError::into_inner);
        block.txs.iter().try_for_each(|tx| Self::check_tx(&history, tx))
    }

    /// Record every nonce of a certified block. Validation and insertion
    /// happen under one write lock, so two conflicting blocks can never both
    /// be recorded.
    pub fn commit_block(&self, block: &Block) -> Result<(), ConsensusError> {
        let mut history = self.history.write().unwrap_or_else(PoisonError::into_inner);
        for tx in &block.txs {
            Self::check_tx(&history, tx)?;
        }
        for tx in &block.txs {
            for nonce in tx.nonces() {
                history.insert(*nonce, tx.hash());
            }
        }
        Ok(())
    }

    /// Hash of the tx that committed `nonce`, if any.
    pub fn committed_by(&self, nonce: &Nonce) -> Option<Digest> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(nonce)
            .copied()
    }

    fn check_tx(history: &HashMap<Nonce, Digest>, tx: &Tx) -> Result<(), ConsensusError> {
        for nonce in tx.nonces() {
            match history.get(nonce) {
                Some(committed) if *committed != tx.hash() => {
                    return Err(ConsensusError::Conflict {
                        nonce: *nonce,
                        committed: *committed,
                        conflicting: tx.hash(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}
