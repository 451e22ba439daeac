//! Consensus core for Hyperdrive.
//!
//! A block is agreed in three rounds of signature accumulation:
//!
//! - [`proposal`]: the rank's proposer signs a block; every replica checks it
//!   and signs a prepare.
//! - [`prepare`]: once a quorum has signed the prepare, each replica signs a
//!   commit embedding it.
//! - [`commit`]: a commit holding a quorum of signatures certifies the block.
//!
//! A message that fails verification turns into a [`Fault`](hyperdrive_messages::Fault)
//! for its `(rank, height)`, and [`fault`] certifies faults the same way.
//!
//! Each stage is a [`stage::StageProcessor`] driven by [`stage::spawn_stage`];
//! signatures are gathered in a [`threshold_store::ThresholdStore`], and the
//! replica's height, rank and nonce history live in
//! [`shared_blocks::SharedBlocks`].

pub mod commit;
pub mod error;
pub mod fault;
pub mod prepare;
pub mod proposal;
pub mod shared_blocks;
pub mod stage;
pub mod threshold_store;

pub use commit::CommitStage;
pub use error::ConsensusError;
pub use fault::FaultStage;
pub use prepare::PrepareStage;
pub use proposal::ProposalStage;
pub use shared_blocks::SharedBlocks;
pub use stage::{spawn_stage, stage_channels, StageOutputs, StageProcessor, StageStreams, Step};
pub use threshold_store::{Outcome, ThresholdStore};
