//! Turns upstream blocks into proposals when it is this replica's turn.

use hyperdrive_consensus::{ConsensusError, SharedBlocks};
use hyperdrive_crypto::Signer;
use hyperdrive_messages::{Block, Proposal};
use hyperdrive_types::Rank;
use std::sync::Arc;

pub struct Proposer {
    index: usize,
    validators: usize,
    signer: Arc<dyn Signer>,
    shared: Arc<SharedBlocks>,
}

impl Proposer {
    pub fn new(
        index: usize,
        validators: usize,
        signer: Arc<dyn Signer>,
        shared: Arc<SharedBlocks>,
    ) -> Self {
        Self {
            index,
            validators,
            signer,
            shared,
        }
    }

    /// Whether this replica proposes for `rank`.
    pub fn is_turn(&self, rank: Rank) -> bool {
        self.validators > 0 && rank % self.validators as u64 == self.index as u64
    }

    /// Sign `block` as a proposal if it targets the current height and rank,
    /// this replica holds that rank, and none of its txs conflict with
    /// committed history. Otherwise returns `None`.
    pub fn propose(&self, block: Block) -> Result<Option<Proposal>, ConsensusError> {
        let (height, rank) = (self.shared.height(), self.shared.rank());
        if block.height != height || block.rank != rank {
            tracing::trace!(
                block_height = block.height,
                block_rank = block.rank,
                height,
                rank,
                "block is not for the current round"
            );
            return Ok(None);
        }
        if !self.is_turn(rank) {
            tracing::trace!(rank, index = self.index, "not this replica's turn to propose");
            return Ok(None);
        }
        if let Err(e) = self.shared.validate_block(&block) {
            tracing::warn!(height, rank, error = %e, "refusing to propose conflicting block");
            return Ok(None);
        }
        let block = block.signed(&*self.signer)?;
        let proposal = Proposal::sign(block, &*self.signer)?;
        tracing::info!(height, rank, hash = %proposal.hash(), "proposing block");
        Ok(Some(proposal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperdrive_messages::Tx;
    use hyperdrive_nullables::{FailingSigner, NullSigner};
    use hyperdrive_types::{Epoch, Nonce};

    fn block(rank: Rank, height: u64, nonce: u8) -> Block {
        Block::new(Epoch::default(), rank, height, vec![Tx::new(vec![Nonce([nonce; 32])])])
    }

    fn proposer(index: usize, shared: Arc<SharedBlocks>) -> Proposer {
        Proposer::new(index, 4, Arc::new(NullSigner::new(index as u8)), shared)
    }

    #[test]
    fn turn_rotates_with_rank() {
        let p = proposer(1, Arc::new(SharedBlocks::new(1, 0)));
        assert!(!p.is_turn(0));
        assert!(p.is_turn(1));
        assert!(p.is_turn(5));
    }

    #[test]
    fn proposes_only_for_current_round_on_its_turn() {
        let shared = Arc::new(SharedBlocks::new(1, 1));
        let p = proposer(1, shared.clone());
        assert!(p.propose(block(1, 2, 1)).unwrap().is_none());
        assert!(p.propose(block(0, 1, 1)).unwrap().is_none());
        let proposal = p.propose(block(1, 1, 1)).unwrap().unwrap();
        assert!(proposal.block.signature.is_some());
        assert_eq!((proposal.rank(), proposal.height()), (1, 1));

        let other = proposer(2, shared);
        assert!(other.propose(block(1, 1, 1)).unwrap().is_none());
    }

    #[test]
    fn refuses_blocks_that_conflict_with_history() {
        let shared = Arc::new(SharedBlocks::new(1, 0));
        shared
            .commit_block(&Block::new(
                Epoch::default(),
                0,
                0,
                vec![Tx::new(vec![Nonce([1; 32]), Nonce([2; 32])])],
            ))
            .unwrap();
        let p = proposer(0, shared);
        assert!(p.propose(block(0, 1, 1)).unwrap().is_none());
        assert!(p.propose(block(0, 1, 3)).unwrap().is_some());
    }

    #[test]
    fn signer_failure_is_reported() {
        let shared = Arc::new(SharedBlocks::new(1, 0));
        let p = Proposer::new(0, 4, Arc::new(FailingSigner), shared);
        assert!(matches!(p.propose(block(0, 1, 1)), Err(ConsensusError::Sign(_))));
    }
}
