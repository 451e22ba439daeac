//! Commit stage: a commit that gathers a quorum of signatures certifies its
//! block and is emitted upstream.

use hyperdrive_crypto::{Signer, Verifier};
use hyperdrive_messages::{Commit, Message};
use hyperdrive_types::Height;
use std::sync::Arc;

use crate::error::ConsensusError;
use crate::stage::{StageProcessor, Step};
use crate::threshold_store::{Outcome, ThresholdStore};

pub struct CommitStage {
    store: ThresholdStore,
    signer: Arc<dyn Signer>,
    verifier: Arc<dyn Verifier>,
    threshold: usize,
}

impl CommitStage {
    pub fn new(signer: Arc<dyn Signer>, verifier: Arc<dyn Verifier>, threshold: usize) -> Self {
        Self {
            store: ThresholdStore::new(),
            signer,
            verifier,
            threshold,
        }
    }
}

impl StageProcessor for CommitStage {
    type Input = Commit;
    type Output = Commit;

    const NAME: &'static str = "commit";

    fn process(&mut self, commit: Commit) -> Result<Step<Commit>, ConsensusError> {
        let outcome = self.store.accumulate(
            commit.into(),
            &*self.signer,
            &*self.verifier,
            self.threshold,
        )?;
        match outcome {
            Outcome::Promoted(Message::Commit(commit)) => {
                tracing::debug!(
                    rank = commit.rank(),
                    height = commit.height(),
                    block = %commit.block().hash(),
                    "commit certified"
                );
                Ok(Step::Emit(commit))
            }
            Outcome::Promoted(other) => {
                tracing::trace!(kind = %other.kind(), "discarding unexpected promotion");
                Ok(Step::Skip)
            }
            Outcome::Pending => Ok(Step::Skip),
            Outcome::Fault(fault) => Ok(Step::Fault(fault)),
        }
    }

    fn advance(&mut self, height: Height) {
        self.store.prune_below(height);
    }
}
