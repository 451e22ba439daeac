//! Fault stage: faults for the same `(rank, height)` accumulate like any other
//! message. Once the fault threshold is met the certified fault is emitted and
//! the replica moves to the next rank.

use hyperdrive_crypto::{Signer, Verifier};
use hyperdrive_messages::{Fault, Message};
use hyperdrive_types::Height;
use std::sync::Arc;

use crate::error::ConsensusError;
use crate::stage::{StageProcessor, Step};
use crate::threshold_store::{Outcome, ThresholdStore};

pub struct FaultStage {
    store: ThresholdStore,
    signer: Arc<dyn Signer>,
    verifier: Arc<dyn Verifier>,
    threshold: usize,
}

impl FaultStage {
    pub fn new(signer: Arc<dyn Signer>, verifier: Arc<dyn Verifier>, threshold: usize) -> Self {
        Self {
            store: ThresholdStore::new(),
            signer,
            verifier,
            threshold,
        }
    }
}

impl StageProcessor for FaultStage {
    type Input = Fault;
    type Output = Fault;

    const NAME: &'static str = "fault";

    fn process(&mut self, fault: Fault) -> Result<Step<Fault>, ConsensusError> {
        let outcome = self.store.accumulate(
            fault.into(),
            &*self.signer,
            &*self.verifier,
            self.threshold,
        )?;
        match outcome {
            Outcome::Promoted(Message::Fault(fault)) => {
                tracing::debug!(
                    rank = fault.rank,
                    height = fault.height,
                    signatures = fault.signatures.len(),
                    "fault certified"
                );
                Ok(Step::Emit(fault))
            }
            Outcome::Promoted(other) => {
                tracing::trace!(kind = %other.kind(), "discarding unexpected promotion");
                Ok(Step::Skip)
            }
            Outcome::Pending => Ok(Step::Skip),
            // A fault that fails verification is itself restated as a fault.
            Outcome::Fault(fault) => Ok(Step::Fault(fault)),
        }
    }

    fn advance(&mut self, height: Height) {
        self.store.prune_below(height);
    }
}
