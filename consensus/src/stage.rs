//! Stage runner shared by the four protocol stages.
//!
//! A stage is a task with one input stream and three outputs: the next-stage
//! stream, a fault stream and an error stream. The per-message logic lives in
//! a [`StageProcessor`]; [`spawn_stage`] supplies the loop, height tracking
//! and cancellation.

use hyperdrive_messages::Fault;
use hyperdrive_types::Height;
use hyperdrive_utils::{or_shutdown, ShutdownCause};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::ConsensusError;

/// What a processor decided for one input.
#[derive(Debug)]
pub enum Step<T> {
    /// Forward to the next stage.
    Emit(T),
    /// Escalate as a fault.
    Fault(Fault),
    /// Nothing to emit yet.
    Skip,
}

/// Per-message logic of a stage.
pub trait StageProcessor: Send + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;

    /// Stage name used in logs.
    const NAME: &'static str;

    /// Handle one input. An `Err` is reported on the error stream and the
    /// input is dropped; the stage keeps running.
    fn process(&mut self, input: Self::Input) -> Result<Step<Self::Output>, ConsensusError>;

    /// Called with the current height at start-up and on every height change.
    fn advance(&mut self, _height: Height) {}
}

/// Sending halves of a stage's outputs.
pub struct StageOutputs<T> {
    pub next: mpsc::Sender<T>,
    pub faults: mpsc::Sender<Fault>,
    pub errors: mpsc::Sender<ConsensusError>,
}

/// Receiving halves of a stage's outputs.
pub struct StageStreams<T> {
    pub next: mpsc::Receiver<T>,
    pub faults: mpsc::Receiver<Fault>,
    pub errors: mpsc::Receiver<ConsensusError>,
}

/// Create the three bounded output streams of a stage.
pub fn stage_channels<T>(capacity: usize) -> (StageOutputs<T>, StageStreams<T>) {
    let (next_tx, next_rx) = mpsc::channel(capacity);
    let (faults_tx, faults_rx) = mpsc::channel(capacity);
    let (errors_tx, errors_rx) = mpsc::channel(capacity);
    (
        StageOutputs {
            next: next_tx,
            faults: faults_tx,
            errors: errors_tx,
        },
        StageStreams {
            next: next_rx,
            faults: faults_rx,
            errors: errors_rx,
        },
    )
}

/// Run `processor` over `input` until the input closes or shutdown fires.
///
/// Shutdown is observed while waiting for input and while waiting for room on
/// a full output. The cause is reported once on the error stream through a
/// slot reserved at start-up, so a full error stream cannot swallow it.
/// Either way every output is closed when the task returns.
pub fn spawn_stage<P: StageProcessor>(
    mut processor: P,
    mut input: mpsc::Receiver<P::Input>,
    mut heights: watch::Receiver<Height>,
    outputs: StageOutputs<P::Output>,
    mut shutdown: broadcast::Receiver<ShutdownCause>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let stage = P::NAME;
        let report = outputs.errors.clone().try_reserve_owned().ok();
        processor.advance(*heights.borrow_and_update());
        let mut heights_open = true;
        tracing::info!(stage, "stage started");

        let cancelled = loop {
            tokio::select! {
                biased;
                received = shutdown.recv() => break Some(ShutdownCause::from_recv(received)),
                changed = heights.changed(), if heights_open => {
                    match changed {
                        Ok(()) => {
                            let height = *heights.borrow_and_update();
                            tracing::trace!(stage, height, "height advanced");
                            processor.advance(height);
                        }
                        Err(_) => heights_open = false,
                    }
                }
                item = input.recv() => {
                    let Some(item) = item else {
                        tracing::debug!(stage, "input closed");
                        break None;
                    };
                    let sent = match processor.process(item) {
                        Ok(Step::Emit(out)) => {
                            deliver(&outputs.next, out, &mut shutdown, stage, "next").await
                        }
                        Ok(Step::Fault(fault)) => {
                            tracing::warn!(stage, rank = fault.rank, height = fault.height, "raising fault");
                            deliver(&outputs.faults, fault, &mut shutdown, stage, "faults").await
                        }
                        Ok(Step::Skip) => Ok(()),
                        Err(e) => {
                            tracing::warn!(stage, error = %e, "dropping message");
                            deliver(&outputs.errors, e, &mut shutdown, stage, "errors").await
                        }
                    };
                    if let Err(cause) = sent {
                        break Some(cause);
                    }
                }
            }
        };

        if let Some(cause) = cancelled {
            tracing::info!(stage, %cause, "stage shutting down");
            let error = ConsensusError::Cancelled(cause);
            match report {
                Some(permit) => {
                    permit.send(error);
                }
                None => {
                    if outputs.errors.try_send(error).is_err() {
                        tracing::warn!(stage, "error stream unavailable, cancellation not reported");
                    }
                }
            }
        }
    })
}

/// Send `value` unless shutdown fires first. A closed receiver drops the value.
async fn deliver<T>(
    tx: &mpsc::Sender<T>,
    value: T,
    shutdown: &mut broadcast::Receiver<ShutdownCause>,
    stage: &'static str,
    stream: &'static str,
) -> Result<(), ShutdownCause> {
    if or_shutdown(shutdown, tx.send(value)).await?.is_err() {
        tracing::trace!(stage, stream, "output stream closed, value dropped");
    }
    Ok(())
}
