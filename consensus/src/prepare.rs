//! Prepare stage: accumulate prepares until a quorum has signed, then sign a
//! commit embedding the certified prepare.

use hyperdrive_crypto::{Signer, Verifier};
use hyperdrive_messages::{Commit, Message, Prepare};
use hyperdrive_types::Height;
use std::sync::Arc;

use crate::error::ConsensusError;
use crate::stage::{StageProcessor, Step};
use crate::threshold_store::{Outcome, ThresholdStore};

pub struct PrepareStage {
    store: ThresholdStore,
    signer: Arc<dyn Signer>,
    verifier: Arc<dyn Verifier>,
    threshold: usize,
}

impl PrepareStage {
    pub fn new(signer: Arc<dyn Signer>, verifier: Arc<dyn Verifier>, threshold: usize) -> Self {
        Self {
            store: ThresholdStore::new(),
            signer,
            verifier,
            threshold,
        }
    }
}

impl StageProcessor for PrepareStage {
    type Input = Prepare;
    type Output = Commit;

    const NAME: &'static str = "prepare";

    fn process(&mut self, prepare: Prepare) -> Result<Step<Commit>, ConsensusError> {
        let outcome = self.store.accumulate(
            prepare.into(),
            &*self.signer,
            &*self.verifier,
            self.threshold,
        )?;
        match outcome {
            Outcome::Promoted(Message::Prepare(prepare)) => {
                tracing::debug!(
                    rank = prepare.rank(),
                    height = prepare.height(),
                    signatures = prepare.signatures.len(),
                    "prepare reached quorum"
                );
                Ok(Step::Emit(Commit::sign(prepare, &*self.signer)?))
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

#[cfg(test)]
mod tests {
    use super::*;
    use hyperdrive_messages::{Block, Proposal};
    use hyperdrive_nullables::{FlakySigner, NullSigner, NullVerifier};
    use hyperdrive_types::Epoch;

    fn prepare_from(height: Height, signer: u8) -> Prepare {
        let block = Block::new(Epoch::default(), 0, height, Vec::new());
        let proposal = Proposal::sign(block, &NullSigner::new(0)).unwrap();
        Prepare::sign(proposal, &NullSigner::new(signer)).unwrap()
    }

    fn stage(verifier: NullVerifier) -> PrepareStage {
        PrepareStage::new(Arc::new(NullSigner::new(1)), Arc::new(verifier), 3)
    }

    #[test]
    fn emits_commit_once_quorum_signed() {
        let mut stage = stage(NullVerifier::accept_all());
        assert!(matches!(stage.process(prepare_from(1, 2)).unwrap(), Step::Skip));
        let Step::Emit(commit) = stage.process(prepare_from(1, 3)).unwrap() else {
            panic!("expected commit");
        };
        assert_eq!(commit.prepare.signatures.len(), 3);
        assert_eq!(commit.signatures.len(), 1);
        assert!(matches!(stage.process(prepare_from(1, 4)).unwrap(), Step::Skip));
    }

    #[test]
    fn unverifiable_prepare_raises_fault() {
        let mut stage = stage(NullVerifier::reject_all());
        let Step::Fault(fault) = stage.process(prepare_from(5, 2)).unwrap() else {
            panic!("expected fault");
        };
        assert_eq!((fault.rank, fault.height), (0, 5));
    }

    #[test]
    fn advancing_height_prunes_and_ignores_old_prepares() {
        let mut stage = stage(NullVerifier::accept_all());
        stage.process(prepare_from(1, 2)).unwrap();
        stage.advance(2);
        assert!(stage.store.is_empty());
        assert!(matches!(stage.process(prepare_from(1, 3)).unwrap(), Step::Skip));
        assert!(matches!(stage.process(prepare_from(1, 4)).unwrap(), Step::Skip));
    }

    #[test]
    fn signer_failure_surfaces_as_error() {
        let signer = FlakySigner::new(NullSigner::new(1), vec![0]);
        let mut stage = PrepareStage::new(
            Arc::new(signer),
            Arc::new(NullVerifier::accept_all()),
            3,
        );
        assert!(matches!(
            stage.process(prepare_from(1, 2)),
            Err(ConsensusError::Sign(_))
        ));
        assert!(matches!(stage.process(prepare_from(1, 2)).unwrap(), Step::Skip));
    }
}
