//! A running replica: routing pipeline, consensus stages, proposer and
//! shared block state wired together.
//!
//! ```text
//! transport ─► ingress ─► dedup ─► height filter ─► dispatch ─┬─► proposal stage ─┐
//!                 ▲                                           ├─► prepare stage ──┤
//!                 │                                           ├─► commit stage ───┼─► certified commits
//!                 │                                           ├─► fault stage ────┼─► certified faults
//!                 │                                           └─► proposer ───────┤
//!                 └────────── loopback ◄─ split ◄─ outbound ◄─────────────────────┘
//!                                          └─► broadcast dedup ─► egress ─► transport
//! ```
//!
//! Everything a replica signs goes out through `outbound` and is delivered to
//! its own stages through the loopback as well as to peers, so local and
//! remote signatures accumulate the same way.

use hyperdrive_consensus::{
    spawn_stage, CommitStage, ConsensusError, FaultStage, PrepareStage, ProposalStage,
    SharedBlocks, StageOutputs,
};
use hyperdrive_crypto::{KeyPairSigner, Signer, ValidatorSet, Verifier};
use hyperdrive_messages::{Commit, Fault, Prepare, Proposal};
use hyperdrive_network::{
    channel_set, spawn_filter, spawn_height_filter, spawn_split, BroadcastDedup,
    ChannelSetReceiver, ChannelSetSender, DuplicateFilter, Item,
};
use hyperdrive_types::{KeyPair, PublicKey};
use hyperdrive_utils::{or_shutdown, ShutdownCause, ShutdownController};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::ReplicaConfig;
use crate::metrics::ReplicaMetrics;
use crate::proposer::Proposer;
use crate::NodeError;

/// A configured replica, ready to start.
pub struct Replica {
    config: ReplicaConfig,
    signer: Arc<dyn Signer>,
    verifier: Arc<dyn Verifier>,
    shared: Arc<SharedBlocks>,
    metrics: Arc<ReplicaMetrics>,
}

impl Replica {
    pub fn new(
        config: ReplicaConfig,
        signer: Arc<dyn Signer>,
        verifier: Arc<dyn Verifier>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let shared = Arc::new(SharedBlocks::new(config.start_height, config.start_rank));
        let metrics = Arc::new(ReplicaMetrics::new());
        metrics.height.set(config.start_height as i64);
        metrics.rank.set(config.start_rank as i64);
        Ok(Self {
            config,
            signer,
            verifier,
            shared,
            metrics,
        })
    }

    /// A replica signing with `keypair` and verifying against the Ed25519
    /// keys of every validator, in index order.
    pub fn with_keypair(
        config: ReplicaConfig,
        keypair: KeyPair,
        validators: Vec<PublicKey>,
    ) -> Result<Self, NodeError> {
        if validators.len() != config.validators {
            return Err(NodeError::Config(format!(
                "{} validator keys for {} validators",
                validators.len(),
                config.validators
            )));
        }
        if validators.get(config.index) != Some(&keypair.public) {
            return Err(NodeError::Config(format!(
                "key pair does not match validator {}",
                config.index
            )));
        }
        let verifier = ValidatorSet::new(validators)?;
        Self::new(
            config,
            Arc::new(KeyPairSigner::new(keypair)),
            Arc::new(verifier),
        )
    }

    pub fn shared(&self) -> &Arc<SharedBlocks> {
        &self.shared
    }

    pub fn metrics(&self) -> &Arc<ReplicaMetrics> {
        &self.metrics
    }

    /// Spawn every task of the replica. Messages for peers are sent to
    /// `egress`; peer messages and upstream blocks go in through
    /// [`ReplicaHandle::ingress`].
    ///
    /// Every task stops when `shutdown` fires, including tasks waiting on a
    /// full queue. Dropping every clone of `shutdown` also stops them; stages
    /// then report [`ShutdownCause::ControllerDropped`].
    pub fn start(self, egress: ChannelSetSender, shutdown: &ShutdownController) -> ReplicaHandle {
        let Replica {
            config,
            signer,
            verifier,
            shared,
            metrics,
        } = self;
        let capacity = config.channel_capacity;
        let mut tasks = Vec::new();

        tracing::info!(
            index = config.index,
            validators = config.validators,
            threshold = config.threshold(),
            fault_threshold = config.fault_threshold(),
            height = shared.height(),
            rank = shared.rank(),
            "starting replica"
        );

        // ── Ingress ─────────────────────────────────────────────────────
        let (ingress_tx, ingress_rx) = channel_set(capacity);
        let (deduped_tx, deduped_rx) = channel_set(capacity);
        let (gated_tx, gated_rx) = channel_set(capacity);
        tasks.push(spawn_filter(
            DuplicateFilter::new(config.dedup_capacity),
            ingress_rx,
            deduped_tx,
            shutdown.subscribe(),
        ));
        tasks.push(spawn_height_filter(
            deduped_rx,
            gated_tx,
            shared.subscribe(),
            shutdown.subscribe(),
        ));

        // ── Stages ──────────────────────────────────────────────────────
        let (errors_tx, errors_rx) = mpsc::channel(capacity);
        let (raised_tx, raised_rx) = mpsc::channel::<Fault>(capacity);

        let (proposal_in, proposal_rx) = mpsc::channel(capacity);
        let (prepare_in, prepare_rx) = mpsc::channel(capacity);
        let (commit_in, commit_rx) = mpsc::channel(capacity);
        let (fault_in, fault_rx) = mpsc::channel(capacity);

        let (signed_prepares_tx, signed_prepares_rx) = mpsc::channel::<Prepare>(capacity);
        let (signed_commits_tx, signed_commits_rx) = mpsc::channel::<Commit>(capacity);
        let (certified_tx, certified_rx) = mpsc::channel::<Commit>(capacity);
        let (certified_faults_tx, certified_faults_rx) = mpsc::channel::<Fault>(capacity);

        tasks.push(spawn_stage(
            ProposalStage::new(signer.clone(), verifier.clone(), shared.clone()),
            proposal_rx,
            shared.subscribe(),
            stage_outputs(signed_prepares_tx, &raised_tx, &errors_tx),
            shutdown.subscribe(),
        ));
        tasks.push(spawn_stage(
            PrepareStage::new(signer.clone(), verifier.clone(), config.threshold()),
            prepare_rx,
            shared.subscribe(),
            stage_outputs(signed_commits_tx, &raised_tx, &errors_tx),
            shutdown.subscribe(),
        ));
        tasks.push(spawn_stage(
            CommitStage::new(signer.clone(), verifier.clone(), config.threshold()),
            commit_rx,
            shared.subscribe(),
            stage_outputs(certified_tx, &raised_tx, &errors_tx),
            shutdown.subscribe(),
        ));
        tasks.push(spawn_stage(
            FaultStage::new(signer.clone(), verifier, config.fault_threshold()),
            fault_rx,
            shared.subscribe(),
            stage_outputs(certified_faults_tx, &raised_tx, &errors_tx),
            shutdown.subscribe(),
        ));

        // ── Outbound ────────────────────────────────────────────────────
        let (outbound_tx, outbound_rx) = channel_set(capacity);
        let (gossip_tx, gossip_rx) = channel_set(capacity);
        tasks.push(spawn_split(
            outbound_rx,
            vec![ingress_tx.clone(), gossip_tx],
            shutdown.subscribe(),
        ));
        tasks.push(spawn_filter(
            BroadcastDedup::new(config.dedup_capacity),
            gossip_rx,
            egress,
            shutdown.subscribe(),
        ));

        let dispatcher = Dispatcher {
            proposals: proposal_in,
            prepares: prepare_in,
            commits: commit_in,
            faults: fault_in,
            proposer: Proposer::new(config.index, config.validators, signer, shared.clone()),
            outbound: outbound_tx.clone(),
            errors: errors_tx.clone(),
            metrics: metrics.clone(),
        };
        tasks.push(dispatcher.spawn(gated_rx, shutdown.subscribe()));

        tasks.push(spawn_forward(
            signed_prepares_rx,
            outbound_tx.clone(),
            |_| {},
            shutdown.subscribe(),
        ));
        let promoted = metrics.prepares_promoted.clone();
        tasks.push(spawn_forward(
            signed_commits_rx,
            outbound_tx.clone(),
            move |_| promoted.inc(),
            shutdown.subscribe(),
        ));
        tasks.push(spawn_forward(
            raised_rx,
            outbound_tx,
            |_| {},
            shutdown.subscribe(),
        ));

        // ── Certification ───────────────────────────────────────────────
        let (commits_up_tx, commits_up_rx) = mpsc::channel(capacity);
        let (faults_up_tx, faults_up_rx) = mpsc::channel(capacity);
        tasks.push(spawn_commit_certifier(
            certified_rx,
            commits_up_tx,
            shared.clone(),
            metrics.clone(),
            shutdown.subscribe(),
        ));
        tasks.push(spawn_fault_certifier(
            certified_faults_rx,
            faults_up_tx,
            shared.clone(),
            metrics.clone(),
            shutdown.subscribe(),
        ));

        ReplicaHandle {
            ingress: ingress_tx,
            certified_commits: commits_up_rx,
            certified_faults: faults_up_rx,
            errors: errors_rx,
            shared,
            metrics,
            tasks,
        }
    }
}

/// Live view of a started replica.
pub struct ReplicaHandle {
    ingress: ChannelSetSender,
    /// Commits certified by this replica, in certification order.
    pub certified_commits: mpsc::Receiver<Commit>,
    /// Faults certified by this replica.
    pub certified_faults: mpsc::Receiver<Fault>,
    /// Signing failures and stage cancellations.
    pub errors: mpsc::Receiver<ConsensusError>,
    shared: Arc<SharedBlocks>,
    metrics: Arc<ReplicaMetrics>,
    tasks: Vec<JoinHandle<()>>,
}

impl ReplicaHandle {
    /// Where peer messages and upstream blocks are delivered.
    pub fn ingress(&self) -> ChannelSetSender {
        self.ingress.clone()
    }

    pub fn shared(&self) -> &Arc<SharedBlocks> {
        &self.shared
    }

    pub fn metrics(&self) -> &Arc<ReplicaMetrics> {
        &self.metrics
    }

    /// Wait for every task to finish. Tasks only finish after shutdown.
    pub async fn join(&mut self) -> Result<(), NodeError> {
        for task in self.tasks.drain(..) {
            task.await?;
        }
        Ok(())
    }
}

/// Routes admitted messages to their stage, and upstream blocks to the
/// proposer.
struct Dispatcher {
    proposals: mpsc::Sender<Proposal>,
    prepares: mpsc::Sender<Prepare>,
    commits: mpsc::Sender<Commit>,
    faults: mpsc::Sender<Fault>,
    proposer: Proposer,
    outbound: ChannelSetSender,
    errors: mpsc::Sender<ConsensusError>,
    metrics: Arc<ReplicaMetrics>,
}

impl Dispatcher {
    fn spawn(
        self,
        mut input: ChannelSetReceiver,
        mut shutdown: broadcast::Receiver<ShutdownCause>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => break,
                    item = input.recv() => {
                        let Some(item) = item else { break };
                        match or_shutdown(&mut shutdown, self.dispatch(item)).await {
                            Ok(true) => {}
                            Ok(false) => {
                                tracing::debug!("dispatch target closed, stopping");
                                break;
                            }
                            Err(_) => break,
                        }
                    }
                }
            }
        })
    }

    /// Returns `false` once a destination is gone.
    async fn dispatch(&self, item: Item) -> bool {
        match item {
            Item::Proposal(m) => self.proposals.send(m).await.is_ok(),
            Item::Prepare(m) => self.prepares.send(m).await.is_ok(),
            Item::Commit(m) => self.commits.send(m).await.is_ok(),
            Item::Fault(m) => self.faults.send(m).await.is_ok(),
            Item::Block(block) => match self.proposer.propose(block) {
                Ok(Some(proposal)) => {
                    self.metrics.proposals_made.inc();
                    self.outbound.send(proposal).await.is_ok()
                }
                Ok(None) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to sign proposal");
                    self.errors.send(e).await.is_ok()
                }
            },
        }
    }
}

fn stage_outputs<T>(
    next: mpsc::Sender<T>,
    faults: &mpsc::Sender<Fault>,
    errors: &mpsc::Sender<ConsensusError>,
) -> StageOutputs<T> {
    StageOutputs {
        next,
        faults: faults.clone(),
        errors: errors.clone(),
    }
}

/// Forward a stage output stream to the outbound channel set.
fn spawn_forward<T>(
    mut input: mpsc::Receiver<T>,
    outbound: ChannelSetSender,
    on_item: impl Fn(&T) + Send + 'static,
    mut shutdown: broadcast::Receiver<ShutdownCause>,
) -> JoinHandle<()>
where
    T: Into<Item> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                item = input.recv() => {
                    let Some(item) = item else { break };
                    on_item(&item);
                    if !matches!(or_shutdown(&mut shutdown, outbound.send(item)).await, Ok(Ok(()))) {
                        break;
                    }
                }
            }
        }
    })
}

/// Record certified commits: a commit for the current height commits its
/// block, advances the height and hands the turn to the next proposer.
fn spawn_commit_certifier(
    mut certified: mpsc::Receiver<Commit>,
    upstream: mpsc::Sender<Commit>,
    shared: Arc<SharedBlocks>,
    metrics: Arc<ReplicaMetrics>,
    mut shutdown: broadcast::Receiver<ShutdownCause>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                commit = certified.recv() => {
                    let Some(commit) = commit else { break };
                    metrics.commits_certified.inc();
                    let height = commit.height();
                    if height == shared.height() {
                        match shared.commit_block(commit.block()) {
                            Ok(()) => {
                                if let Some(next) = shared.try_advance(height) {
                                    let rank = shared.next_rank();
                                    metrics.heights_advanced.inc();
                                    metrics.height.set(next as i64);
                                    metrics.rank.set(rank as i64);
                                    tracing::info!(height = next, rank, "height advanced");
                                }
                            }
                            Err(e) => {
                                tracing::error!(height, error = %e, "certified block conflicts with history");
                            }
                        }
                    }
                    match or_shutdown(&mut shutdown, upstream.send(commit)).await {
                        Ok(Ok(())) => {}
                        Ok(Err(_)) => tracing::trace!("certified commit stream closed"),
                        Err(_) => break,
                    }
                }
            }
        }
    })
}

/// Record certified faults: a fault for the current `(rank, height)` moves
/// the replica to the next rank.
fn spawn_fault_certifier(
    mut certified: mpsc::Receiver<Fault>,
    upstream: mpsc::Sender<Fault>,
    shared: Arc<SharedBlocks>,
    metrics: Arc<ReplicaMetrics>,
    mut shutdown: broadcast::Receiver<ShutdownCause>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                fault = certified.recv() => {
                    let Some(fault) = fault else { break };
                    metrics.faults_certified.inc();
                    if fault.height == shared.height() {
                        if let Some(rank) = shared.try_advance_rank(fault.rank) {
                            metrics.rank.set(rank as i64);
                            tracing::warn!(height = fault.height, faulty_rank = fault.rank, rank, "proposer faulted, rank advanced");
                        }
                    }
                    match or_shutdown(&mut shutdown, upstream.send(fault)).await {
                        Ok(Ok(())) => {}
                        Ok(Err(_)) => tracing::trace!("certified fault stream closed"),
                        Err(_) => break,
                    }
                }
            }
        }
    })
}
