//! Message routing for a Hyperdrive replica.
//!
//! Messages travel between components as [`ChannelSet`](channel_set)s: five
//! bounded streams, one per message kind, that open and close together.
//! Workers in this crate each read one channel set and write one or more:
//!
//! - [`dedup`]: drop deliveries already seen (per kind on ingress, across
//!   kinds on egress).
//! - [`height_filter`]: admit only messages for the current height, holding
//!   near-future ones until the replica gets there.
//! - [`fanout`]: split one channel set to many, or pipe one into another.

pub mod channel_set;
pub mod dedup;
pub mod error;
pub mod fanout;
pub mod filter;
pub mod height_filter;

pub use channel_set::{channel_set, ChannelSetReceiver, ChannelSetSender, Item};
pub use dedup::{BroadcastDedup, DuplicateFilter, MessageDedup, DEFAULT_DEDUP_CAPACITY};
pub use error::NetworkError;
pub use fanout::{spawn_pipe, spawn_split};
pub use filter::{spawn_filter, ItemFilter};
pub use height_filter::{spawn_height_filter, Admission, HeightGate};
