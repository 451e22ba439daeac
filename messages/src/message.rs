//! The tagged union of consensus messages.

use hyperdrive_crypto::Verifier;
use hyperdrive_types::{Digest, Height, Rank, Signatures};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::consensus::{Commit, Fault, Prepare, Proposal};
use crate::error::MessageError;

/// The five kinds of value that flow through the routing pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Proposal,
    Prepare,
    Commit,
    Block,
    Fault,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Proposal => "proposal",
            MessageKind::Prepare => "prepare",
            MessageKind::Commit => "commit",
            MessageKind::Block => "block",
            MessageKind::Fault => "fault",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A consensus message of any stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Proposal(Proposal),
    Prepare(Prepare),
    Commit(Commit),
    Fault(Fault),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Proposal(_) => MessageKind::Proposal,
            Message::Prepare(_) => MessageKind::Prepare,
            Message::Commit(_) => MessageKind::Commit,
            Message::Fault(_) => MessageKind::Fault,
        }
    }

    pub fn hash(&self) -> Digest {
        match self {
            Message::Proposal(m) => m.hash(),
            Message::Prepare(m) => m.hash(),
            Message::Commit(m) => m.hash(),
            Message::Fault(m) => m.hash(),
        }
    }

    pub fn rank(&self) -> Rank {
        match self {
            Message::Proposal(m) => m.rank(),
            Message::Prepare(m) => m.rank(),
            Message::Commit(m) => m.rank(),
            Message::Fault(m) => m.rank,
        }
    }

    pub fn height(&self) -> Height {
        match self {
            Message::Proposal(m) => m.height(),
            Message::Prepare(m) => m.height(),
            Message::Commit(m) => m.height(),
            Message::Fault(m) => m.height,
        }
    }

    /// The signatures carried over [`Message::hash`]. A proposal carries
    /// exactly its proposer's signature.
    pub fn signatures(&self) -> Signatures {
        match self {
            Message::Proposal(m) => Signatures::from(m.signature),
            Message::Prepare(m) => m.signatures.clone(),
            Message::Commit(m) => m.signatures.clone(),
            Message::Fault(m) => m.signatures.clone(),
        }
    }

    /// Replace the carried signature set. A proposal's single proposer
    /// signature is not a set and is left untouched.
    pub fn with_signatures(self, signatures: Signatures) -> Message {
        match self {
            Message::Proposal(m) => Message::Proposal(m),
            Message::Prepare(m) => Message::Prepare(Prepare { signatures, ..m }),
            Message::Commit(m) => Message::Commit(Commit { signatures, ..m }),
            Message::Fault(m) => Message::Fault(Fault { signatures, ..m }),
        }
    }

    pub fn verify(&self, verifier: &dyn Verifier) -> Result<(), MessageError> {
        match self {
            Message::Proposal(m) => m.verify(verifier),
            Message::Prepare(m) => m.verify(verifier),
            Message::Commit(m) => m.verify(verifier),
            Message::Fault(m) => m.verify(verifier),
        }
    }

    /// The unsigned fault raised when this message cannot make progress.
    pub fn fault(&self) -> Fault {
        match self {
            Message::Proposal(m) => m.fault(),
            Message::Prepare(m) => m.fault(),
            Message::Commit(m) => m.fault(),
            Message::Fault(m) => m.fault(),
        }
    }
}

impl From<Proposal> for Message {
    fn from(m: Proposal) -> Self {
        Message::Proposal(m)
    }
}

impl From<Prepare> for Message {
    fn from(m: Prepare) -> Self {
        Message::Prepare(m)
    }
}

impl From<Commit> for Message {
    fn from(m: Commit) -> Self {
        Message::Commit(m)
    }
}

impl From<Fault> for Message {
    fn from(m: Fault) -> Self {
        Message::Fault(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use hyperdrive_nullables::NullSigner;
    use hyperdrive_types::Epoch;

    fn prepare() -> Prepare {
        let block = Block::new(Epoch::default(), 2, 9, Vec::new());
        let proposal = Proposal::sign(block, &NullSigner::new(3)).unwrap();
        Prepare::sign(proposal, &NullSigner::new(1)).unwrap()
    }

    #[test]
    fn accessors_dispatch_per_variant() {
        let prepare = prepare();
        let msg = Message::from(prepare.clone());
        assert_eq!(msg.kind(), MessageKind::Prepare);
        assert_eq!(msg.hash(), prepare.hash());
        assert_eq!((msg.rank(), msg.height()), (2, 9));
        assert_eq!(msg.signatures(), prepare.signatures);

        let fault = Message::from(Fault::new(4, 11));
        assert_eq!(fault.kind(), MessageKind::Fault);
        assert_eq!((fault.rank(), fault.height()), (4, 11));
    }

    #[test]
    fn with_signatures_keeps_identity() {
        let msg = Message::from(prepare());
        let hash = msg.hash();
        let extra = msg
            .signatures()
            .merge(&Signatures::from(NullSigner::new(2).signature_for(&hash)));
        let updated = msg.with_signatures(extra.clone());
        assert_eq!(updated.hash(), hash);
        assert_eq!(updated.signatures(), extra);
    }

    #[test]
    fn proposal_signature_is_not_replaced() {
        let proposal = prepare().proposal;
        let msg = Message::from(proposal.clone());
        let updated = msg.with_signatures(Signatures::new());
        assert_eq!(updated, Message::Proposal(proposal));
    }

    #[test]
    fn fault_of_any_message_matches_its_slot() {
        let msg = Message::from(prepare());
        let fault = msg.fault();
        assert_eq!((fault.rank, fault.height), (2, 9));
    }

    #[test]
    fn kind_names() {
        assert_eq!(MessageKind::Block.to_string(), "block");
        assert_eq!(MessageKind::Commit.as_str(), "commit");
    }
}
