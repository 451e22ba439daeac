//! Proposal stage.
//!
//! A proposal is authored by the single replica holding its rank, so there is
//! nothing to accumulate: once the proposer signature, block structure and
//! nonce history check out, the replica signs a prepare for it immediately.

use hyperdrive_crypto::{Signer, Verifier};
use hyperdrive_messages::{Prepare, Proposal};
use std::sync::Arc;

use crate::error::ConsensusError;
use crate::shared_blocks::SharedBlocks;
use crate::stage::{StageProcessor, Step};

pub struct ProposalStage {
    signer: Arc<dyn Signer>,
    verifier: Arc<dyn Verifier>,
    shared: Arc<SharedBlocks>,
}

impl ProposalStage {
    pub fn new(signer: Arc<dyn Signer>, verifier: Arc<dyn Verifier>, shared: Arc<SharedBlocks>) -> Self {
        Self {
            signer,
            verifier,
            shared,
        }
    }
}

impl StageProcessor for ProposalStage {
    type Input = Proposal;
    type Output = Prepare;

    const NAME: &'static str = "proposal";

    fn process(&mut self, proposal: Proposal) -> Result<Step<Prepare>, ConsensusError> {
        let rejected = match proposal.verify(&*self.verifier) {
            Err(e) => Some(e.to_string()),
            Ok(()) => self
                .shared
                .validate_block(&proposal.block)
                .err()
                .map(|e| e.to_string()),
        };
        if let Some(reason) = rejected {
            tracing::debug!(
                rank = proposal.rank(),
                height = proposal.height(),
                %reason,
                "proposal rejected"
            );
            return Ok(Step::Fault(proposal.fault().signed(&*self.signer)?));
        }
        Ok(Step::Emit(Prepare::sign(proposal, &*self.signer)?))
    }
}
