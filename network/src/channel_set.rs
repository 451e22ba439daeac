//! Five typed streams, one per message kind, created and closed together.
//!
//! A [`ChannelSetSender`] is cloneable; the five streams close when the last
//! clone is dropped. The [`ChannelSetReceiver`] merges them, preserving order
//! within each stream.

use hyperdrive_crypto::sha3_256_multi;
use hyperdrive_messages::{Block, Commit, Fault, MessageKind, Prepare, Proposal};
use hyperdrive_types::{Digest, Height, Rank, Signatures};
use tokio::sync::mpsc;

use crate::error::NetworkError;

/// One routed message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    Proposal(Proposal),
    Prepare(Prepare),
    Commit(Commit),
    Block(Block),
    Fault(Fault),
}

impl Item {
    pub fn kind(&self) -> MessageKind {
        match self {
            Item::Proposal(_) => MessageKind::Proposal,
            Item::Prepare(_) => MessageKind::Prepare,
            Item::Commit(_) => MessageKind::Commit,
            Item::Block(_) => MessageKind::Block,
            Item::Fault(_) => MessageKind::Fault,
        }
    }

    /// Identity of the message, independent of its signatures.
    pub fn hash(&self) -> Digest {
        match self {
            Item::Proposal(p) => p.hash(),
            Item::Prepare(p) => p.hash(),
            Item::Commit(c) => c.hash(),
            Item::Block(b) => b.hash(),
            Item::Fault(f) => f.hash(),
        }
    }

    pub fn rank(&self) -> Rank {
        match self {
            Item::Proposal(p) => p.rank(),
            Item::Prepare(p) => p.rank(),
            Item::Commit(c) => c.rank(),
            Item::Block(b) => b.rank,
            Item::Fault(f) => f.rank,
        }
    }

    pub fn height(&self) -> Height {
        match self {
            Item::Proposal(p) => p.height(),
            Item::Prepare(p) => p.height(),
            Item::Commit(c) => c.height(),
            Item::Block(b) => b.height,
            Item::Fault(f) => f.height,
        }
    }

    /// Identity of this delivery: the message hash together with every
    /// signature it carries. Two copies of a prepare signed by different
    /// replicas share a hash but not a delivery digest.
    pub fn delivery_digest(&self) -> Digest {
        let signatures: Signatures = match self {
            Item::Proposal(p) => p.signature.into(),
            Item::Prepare(p) => p.signatures.clone(),
            Item::Commit(c) => c.signatures.clone(),
            Item::Block(b) => b.signature.into_iter().collect(),
            Item::Fault(f) => f.signatures.clone(),
        };
        let hash = self.hash();
        let mut parts: Vec<&[u8]> = Vec::with_capacity(1 + signatures.len());
        parts.push(hash.as_bytes());
        parts.extend(signatures.iter().map(|s| s.as_bytes().as_slice()));
        sha3_256_multi(&parts)
    }
}

macro_rules! item_from {
    ($($variant:ident),*) => {
        $(impl From<$variant> for Item {
            fn from(m: $variant) -> Self {
                Item::$variant(m)
            }
        })*
    };
}

item_from!(Proposal, Prepare, Commit, Block, Fault);

/// Sending half of a channel set.
#[derive(Clone)]
pub struct ChannelSetSender {
    proposals: mpsc::Sender<Proposal>,
    prepares: mpsc::Sender<Prepare>,
    commits: mpsc::Sender<Commit>,
    blocks: mpsc::Sender<Block>,
    faults: mpsc::Sender<Fault>,
}

/// Receiving half of a channel set.
pub struct ChannelSetReceiver {
    proposals: mpsc::Receiver<Proposal>,
    prepares: mpsc::Receiver<Prepare>,
    commits: mpsc::Receiver<Commit>,
    blocks: mpsc::Receiver<Block>,
    faults: mpsc::Receiver<Fault>,
}

/// Create a channel set whose five streams each hold up to `capacity` items.
pub fn channel_set(capacity: usize) -> (ChannelSetSender, ChannelSetReceiver) {
    let (proposals_tx, proposals) = mpsc::channel(capacity);
    let (prepares_tx, prepares) = mpsc::channel(capacity);
    let (commits_tx, commits) = mpsc::channel(capacity);
    let (blocks_tx, blocks) = mpsc::channel(capacity);
    let (faults_tx, faults) = mpsc::channel(capacity);
    (
        ChannelSetSender {
            proposals: proposals_tx,
            prepares: prepares_tx,
            commits: commits_tx,
            blocks: blocks_tx,
            faults: faults_tx,
        },
        ChannelSetReceiver {
            proposals,
            prepares,
            commits,
            blocks,
            faults,
        },
    )
}

impl ChannelSetSender {
    /// Send `item` on the stream for its kind, waiting for capacity.
    pub async fn send(&self, item: impl Into<Item>) -> Result<(), NetworkError> {
        let item = item.into();
        let kind = item.kind();
        let sent = match item {
            Item::Proposal(m) => self.proposals.send(m).await.is_ok(),
            Item::Prepare(m) => self.prepares.send(m).await.is_ok(),
            Item::Commit(m) => self.commits.send(m).await.is_ok(),
            Item::Block(m) => self.blocks.send(m).await.is_ok(),
            Item::Fault(m) => self.faults.send(m).await.is_ok(),
        };
        if sent {
            Ok(())
        } else {
            Err(NetworkError::Closed(kind))
        }
    }

    /// True once the receiving half has been dropped.
    pub fn is_closed(&self) -> bool {
        self.proposals.is_closed()
    }
}

impl ChannelSetReceiver {
    /// Next item from any stream, or `None` once all five are closed and
    /// drained.
    pub async fn recv(&mut self) -> Option<Item> {
        tokio::select! {
            Some(m) = self.proposals.recv() => Some(Item::Proposal(m)),
            Some(m) = self.prepares.recv() => Some(Item::Prepare(m)),
            Some(m) = self.commits.recv() => Some(Item::Commit(m)),
            Some(m) = self.blocks.recv() => Some(Item::Block(m)),
            Some(m) = self.faults.recv() => Some(Item::Fault(m)),
            else => None,
        }
    }

    /// Stop accepting new items on every stream. Items already queued can
    /// still be received.
    pub fn close(&mut self) {
        self.proposals.close();
        self.prepares.close();
        self.commits.close();
        self.blocks.close();
        self.faults.close();
    }
}
