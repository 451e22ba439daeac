//! Proposal, Prepare, Commit and Fault.
//!
//! Each message hashes a type tag together with the hash of the message it
//! wraps, never its own signatures. Accumulating signatures therefore never
//! changes a message's identity.

use hyperdrive_crypto::{sha3_256_multi, SignError, Signer, Verifier};
use hyperdrive_types::{Digest, Height, Rank, Signature, Signatures};
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::error::MessageError;

const PROPOSAL_TAG: &[u8] = b"Proposal";
const PREPARE_TAG: &[u8] = b"Prepare";
const COMMIT_TAG: &[u8] = b"Commit";
const FAULT_TAG: &[u8] = b"Fault";

/// A candidate block for a height, signed by the proposer for its rank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub block: Block,
    pub signature: Signature,
}

impl Proposal {
    /// Sign `block` as its proposer.
    pub fn sign(block: Block, signer: &dyn Signer) -> Result<Self, SignError> {
        let signature = signer.sign(&Self::hash_of(&block))?;
        Ok(Self { block, signature })
    }

    pub fn hash(&self) -> Digest {
        Self::hash_of(&self.block)
    }

    fn hash_of(block: &Block) -> Digest {
        sha3_256_multi(&[PROPOSAL_TAG, block.hash().as_bytes()])
    }

    pub fn rank(&self) -> Rank {
        self.block.rank
    }

    pub fn height(&self) -> Height {
        self.block.height
    }

    pub fn verify(&self, verifier: &dyn Verifier) -> Result<(), MessageError> {
        self.block.verify(verifier)?;
        verifier.verify_proposer(self.rank(), &self.hash(), &self.signature)?;
        Ok(())
    }

    pub fn fault(&self) -> Fault {
        Fault::new(self.rank(), self.height())
    }
}

/// A proposal once replicas have independently signed it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prepare {
    pub proposal: Proposal,
    pub signatures: Signatures,
}

impl Prepare {
    /// A prepare for `proposal` carrying only this replica's signature.
    pub fn sign(proposal: Proposal, signer: &dyn Signer) -> Result<Self, SignError> {
        let mut prepare = Self {
            proposal,
            signatures: Signatures::new(),
        };
        prepare.signatures.insert(signer.sign(&prepare.hash())?);
        Ok(prepare)
    }

    pub fn hash(&self) -> Digest {
        sha3_256_multi(&[PREPARE_TAG, self.proposal.hash().as_bytes()])
    }

    pub fn rank(&self) -> Rank {
        self.proposal.rank()
    }

    pub fn height(&self) -> Height {
        self.proposal.height()
    }

    pub fn verify(&self, verifier: &dyn Verifier) -> Result<(), MessageError> {
        self.proposal.verify(verifier)?;
        verifier.verify_signatures(&self.hash(), &self.signatures)?;
        Ok(())
    }

    pub fn fault(&self) -> Fault {
        Fault::new(self.rank(), self.height())
    }
}

/// A prepare once replicas have independently signed it. A commit holding a
/// quorum of signatures certifies its block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub prepare: Prepare,
    pub signatures: Signatures,
}

impl Commit {
    /// A commit for `prepare` carrying only this replica's signature.
    pub fn sign(prepare: Prepare, signer: &dyn Signer) -> Result<Self, SignError> {
        let mut commit = Self {
            prepare,
            signatures: Signatures::new(),
        };
        commit.signatures.insert(signer.sign(&commit.hash())?);
        Ok(commit)
    }

    pub fn hash(&self) -> Digest {
        sha3_256_multi(&[COMMIT_TAG, self.prepare.hash().as_bytes()])
    }

    pub fn rank(&self) -> Rank {
        self.prepare.rank()
    }

    pub fn height(&self) -> Height {
        self.prepare.height()
    }

    pub fn block(&self) -> &Block {
        &self.prepare.proposal.block
    }

    pub fn verify(&self, verifier: &dyn Verifier) -> Result<(), MessageError> {
        self.prepare.verify(verifier)?;
        verifier.verify_signatures(&self.hash(), &self.signatures)?;
        Ok(())
    }

    pub fn fault(&self) -> Fault {
        Fault::new(self.rank(), self.height())
    }
}

/// A signed statement that `(rank, height)` failed to make progress.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub rank: Rank,
    pub height: Height,
    pub signatures: Signatures,
}

impl Fault {
    /// An unsigned fault for `(rank, height)`.
    pub fn new(rank: Rank, height: Height) -> Self {
        Self {
            rank,
            height,
            signatures: Signatures::new(),
        }
    }

    /// Add this replica's signature.
    pub fn signed(mut self, signer: &dyn Signer) -> Result<Self, SignError> {
        self.signatures.insert(signer.sign(&self.hash())?);
        Ok(self)
    }

    pub fn hash(&self) -> Digest {
        sha3_256_multi(&[
            FAULT_TAG,
            &self.rank.to_be_bytes(),
            &self.height.to_be_bytes(),
        ])
    }

    pub fn verify(&self, verifier: &dyn Verifier) -> Result<(), MessageError> {
        verifier.verify_signatures(&self.hash(), &self.signatures)?;
        Ok(())
    }

    /// A fault that fails verification is restated as an unsigned fault for
    /// the same `(rank, height)`.
    pub fn fault(&self) -> Fault {
        Fault::new(self.rank, self.height)
    }
}
