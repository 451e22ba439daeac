//! Prometheus metrics for a replica.
//!
//! [`ReplicaMetrics`] owns a dedicated [`Registry`] so several replicas can
//! run in one process without colliding.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};

pub struct ReplicaMetrics {
    pub registry: Registry,

    /// Proposals signed by this replica.
    pub proposals_made: IntCounter,
    /// Prepares that reached the threshold and produced a commit.
    pub prepares_promoted: IntCounter,
    /// Commits certified by this replica.
    pub commits_certified: IntCounter,
    /// Faults certified by this replica.
    pub faults_certified: IntCounter,
    /// Heights this replica advanced through.
    pub heights_advanced: IntCounter,
    /// Current height.
    pub height: IntGauge,
    /// Current rank.
    pub rank: IntGauge,
}

impl ReplicaMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let proposals_made = register_int_counter_with_registry!(
            Opts::new("hyperdrive_proposals_made_total", "Proposals signed by this replica"),
            registry
        )
        .expect("failed to register proposals_made counter");

        let prepares_promoted = register_int_counter_with_registry!(
            Opts::new(
                "hyperdrive_prepares_promoted_total",
                "Prepares that reached the threshold"
            ),
            registry
        )
        .expect("failed to register prepares_promoted counter");

        let commits_certified = register_int_counter_with_registry!(
            Opts::new("hyperdrive_commits_certified_total", "Commits certified"),
            registry
        )
        .expect("failed to register commits_certified counter");

        let faults_certified = register_int_counter_with_registry!(
            Opts::new("hyperdrive_faults_certified_total", "Faults certified"),
            registry
        )
        .expect("failed to register faults_certified counter");

        let heights_advanced = register_int_counter_with_registry!(
            Opts::new("hyperdrive_heights_advanced_total", "Height advances"),
            registry
        )
        .expect("failed to register heights_advanced counter");

        let height = register_int_gauge_with_registry!(
            Opts::new("hyperdrive_height", "Current replica height"),
            registry
        )
        .expect("failed to register height gauge");

        let rank = register_int_gauge_with_registry!(
            Opts::new("hyperdrive_rank", "Current replica rank"),
            registry
        )
        .expect("failed to register rank gauge");

        Self {
            registry,
            proposals_made,
            prepares_promoted,
            commits_certified,
            faults_certified,
            heights_advanced,
            height,
            rank,
        }
    }
}

impl Default for ReplicaMetrics {
    fn default() -> Self {
        Self::new()
    }
}
