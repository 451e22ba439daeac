//! End-to-end tests: several replicas in one process, connected by an
//! in-memory transport that copies each replica's egress to every other
//! replica's ingress.

use std::time::Duration;

use hyperdrive_consensus::ConsensusError;
use hyperdrive_crypto::{keypair_from_seed, KeyPairSigner};
use hyperdrive_messages::{Block, Proposal, Tx};
use hyperdrive_network::{channel_set, spawn_split};
use hyperdrive_node::{Replica, ReplicaConfig, ReplicaHandle};
use hyperdrive_types::{Epoch, Height, Nonce, Rank};
use hyperdrive_utils::{init_logging, LogFormat, ShutdownCause, ShutdownController};

const TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn seed(index: usize) -> [u8; 32] {
    [index as u8 + 1; 32]
}

fn start_cluster(n: usize, shutdown: &ShutdownController) -> Vec<ReplicaHandle> {
    init_logging(LogFormat::Human, "warn");
    let validators: Vec<_> = (0..n).map(|i| keypair_from_seed(&seed(i)).public).collect();

    let mut handles = Vec::new();
    let mut egresses = Vec::new();
    for index in 0..n {
        let replica = Replica::with_keypair(
            ReplicaConfig::new(index, n),
            keypair_from_seed(&seed(index)),
            validators.clone(),
        )
        .expect("valid replica config");
        let (egress_tx, egress_rx) = channel_set(256);
        handles.push(replica.start(egress_tx, shutdown));
        egresses.push(egress_rx);
    }

    for (index, egress) in egresses.into_iter().enumerate() {
        let peers = handles
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, h)| h.ingress())
            .collect();
        spawn_split(egress, peers, shutdown.subscribe());
    }
    handles
}

fn block(rank: Rank, height: Height, nonce: u8) -> Block {
    Block::new(
        Epoch::default(),
        rank,
        height,
        vec![Tx::new(vec![Nonce([nonce; 32])])],
    )
}

/// Upstream hands the same candidate block to every replica; only the
/// proposer for its rank acts on it.
async fn offer(handles: &[ReplicaHandle], block: &Block) {
    for handle in handles {
        handle.ingress().send(block.clone()).await.unwrap();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn four_replicas_certify_a_block_and_advance() {
    let shutdown = ShutdownController::new();
    let mut handles = start_cluster(4, &shutdown);
    let candidate = block(0, 1, 7);
    offer(&handles, &candidate).await;

    for handle in &mut handles {
        let commit = tokio::time::timeout(TIMEOUT, handle.certified_commits.recv())
            .await
            .expect("commit certified in time")
            .expect("commit stream open");
        assert_eq!(commit.height(), 1);
        assert_eq!(commit.block().hash(), candidate.hash());
        assert!(commit.signatures.len() >= 3);
        assert!(commit.prepare.signatures.len() >= 3);

        assert_eq!(handle.shared().height(), 2);
        assert_eq!(handle.shared().rank(), 1);
        let tx = &candidate.txs[0];
        assert_eq!(handle.shared().committed_by(&tx.nonces()[0]), Some(tx.hash()));
        assert_eq!(handle.metrics().heights_advanced.get(), 1);
    }
    assert_eq!(handles[0].metrics().proposals_made.get(), 1);
    assert_eq!(handles[1].metrics().proposals_made.get(), 0);

    shutdown.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn proposer_rotates_across_heights() {
    let shutdown = ShutdownController::new();
    let mut handles = start_cluster(4, &shutdown);

    for (rank, height) in [(0, 1), (1, 2), (2, 3)] {
        offer(&handles, &block(rank, height, height as u8)).await;
        for handle in &mut handles {
            let commit = tokio::time::timeout(TIMEOUT, handle.certified_commits.recv())
                .await
                .expect("commit certified in time")
                .expect("commit stream open");
            assert_eq!((commit.rank(), commit.height()), (rank, height));
        }
    }

    for (index, handle) in handles.iter().enumerate() {
        assert_eq!(handle.shared().height(), 4);
        let expected = u64::from(index < 3);
        assert_eq!(handle.metrics().proposals_made.get(), expected);
    }
    shutdown.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn proposal_from_wrong_proposer_is_faulted_and_rank_moves_on() {
    let shutdown = ShutdownController::new();
    let mut handles = start_cluster(4, &shutdown);

    // Validator 1 signs a proposal for rank 0, which belongs to validator 0.
    let impostor = KeyPairSigner::new(keypair_from_seed(&seed(1)));
    let forged = Proposal::sign(block(0, 1, 9), &impostor).unwrap();
    for handle in &handles {
        handle.ingress().send(forged.clone()).await.unwrap();
    }

    for handle in &mut handles {
        let fault = tokio::time::timeout(TIMEOUT, handle.certified_faults.recv())
            .await
            .expect("fault certified in time")
            .expect("fault stream open");
        assert_eq!((fault.rank, fault.height), (0, 1));
        assert!(fault.signatures.len() >= 3);
        assert_eq!(handle.shared().rank(), 1);
        assert_eq!(handle.shared().height(), 1);
    }

    // The next proposer takes over at the same height.
    offer(&handles, &block(1, 1, 9)).await;
    for handle in &mut handles {
        let commit = tokio::time::timeout(TIMEOUT, handle.certified_commits.recv())
            .await
            .expect("commit certified in time")
            .expect("commit stream open");
        assert_eq!((commit.rank(), commit.height()), (1, 1));
    }
    shutdown.shutdown();
}

#[tokio::test]
async fn shutdown_cancels_every_stage_and_closes_outputs() {
    let shutdown = ShutdownController::new();
    let mut handles = start_cluster(1, &shutdown);
    let handle = &mut handles[0];

    shutdown.shutdown();
    handle.join().await.unwrap();

    let mut cancelled = 0;
    while let Some(error) = handle.errors.recv().await {
        assert_eq!(error, ConsensusError::Cancelled(ShutdownCause::Requested));
        cancelled += 1;
    }
    assert_eq!(cancelled, 4);
    assert!(handle.certified_commits.recv().await.is_none());
    assert!(handle.certified_faults.recv().await.is_none());
}

#[tokio::test]
async fn single_replica_commits_on_its_own() {
    let shutdown = ShutdownController::new();
    let mut handles = start_cluster(1, &shutdown);
    let handle = &mut handles[0];

    offer(std::slice::from_ref(handle), &block(0, 1, 1)).await;
    let commit = tokio::time::timeout(TIMEOUT, handle.certified_commits.recv())
        .await
        .expect("commit certified in time")
        .expect("commit stream open");
    assert_eq!(commit.height(), 1);
    assert_eq!(handle.shared().height(), 2);
    shutdown.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_joins_even_when_nothing_drains_the_outputs() {
    init_logging(LogFormat::Human, "warn");
    let shutdown = ShutdownController::new();
    let mut config = ReplicaConfig::new(0, 1);
    config.channel_capacity = 2;
    let replica = Replica::with_keypair(
        config,
        keypair_from_seed(&seed(0)),
        vec![keypair_from_seed(&seed(0)).public],
    )
    .expect("valid replica config");
    // Nobody reads egress or the certified commits, so every queue fills.
    let (egress_tx, _egress_rx) = channel_set(1);
    let mut handle = replica.start(egress_tx, &shutdown);

    let ingress = handle.ingress();
    let feeder = tokio::spawn(async move {
        for height in 1..=8u64 {
            if ingress.send(block(height - 1, height, height as u8)).await.is_err() {
                break;
            }
        }
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    shutdown.shutdown();
    tokio::time::timeout(TIMEOUT, handle.join())
        .await
        .expect("every task stopped after shutdown")
        .unwrap();
    drop(handle);
    tokio::time::timeout(TIMEOUT, feeder)
        .await
        .expect("ingress closed after shutdown")
        .unwrap();
}
