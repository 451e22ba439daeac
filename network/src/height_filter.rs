//! Height-gated admission.
//!
//! With the replica at height `h`, a message at height `m` is:
//!
//! - dropped if `m < h`,
//! - passed through if `m == h`,
//! - buffered if `h < m <= h + HEIGHT_CEILING`, and released once when the
//!   replica reaches `m`,
//! - dropped if `m > h + HEIGHT_CEILING`.
//!
//! The gate never reads the shared height directly. It owns a copy that is
//! only updated from the height-update stream, so buffering decisions and
//! flushes always agree on which height they were made against.

use hyperdrive_types::{Height, HEIGHT_CEILING};
use hyperdrive_utils::{or_shutdown, ShutdownCause};
use std::collections::BTreeMap;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::channel_set::{ChannelSetReceiver, ChannelSetSender, Item};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Pass,
    Buffered,
    Stale,
    TooFar,
}

pub struct HeightGate {
    height: Height,
    buffers: BTreeMap<Height, Vec<Item>>,
}

impl HeightGate {
    pub fn new(height: Height) -> Self {
        Self {
            height,
            buffers: BTreeMap::new(),
        }
    }

    pub fn height(&self) -> Height {
        self.height
    }

    /// Classify `item`. Buffered items are kept; the caller forwards it only
    /// on [`Admission::Pass`].
    pub fn admit(&mut self, item: &Item) -> Admission {
        let height = item.height();
        if height < self.height {
            Admission::Stale
        } else if height == self.height {
            Admission::Pass
        } else if height - self.height > HEIGHT_CEILING {
            Admission::TooFar
        } else {
            self.buffers.entry(height).or_default().push(item.clone());
            Admission::Buffered
        }
    }

    /// Move to `height`. Returns the items buffered for exactly that height
    /// and drops every buffer below it. Moving backwards is ignored.
    pub fn advance(&mut self, height: Height) -> Vec<Item> {
        if height <= self.height {
            return Vec::new();
        }
        self.height = height;
        let mut kept = self.buffers.split_off(&height);
        let stale = std::mem::take(&mut self.buffers);
        let dropped: usize = stale.values().map(Vec::len).sum();
        if dropped > 0 {
            tracing::trace!(height, dropped, "discarding stale buffered messages");
        }
        let released = kept.remove(&height).unwrap_or_default();
        self.buffers = kept;
        released
    }

    /// Number of buffered items across all heights.
    pub fn buffered(&self) -> usize {
        self.buffers.values().map(Vec::len).sum()
    }
}

/// Run a [`HeightGate`] between `input` and `output`, tracking `heights`.
pub fn spawn_height_filter(
    mut input: ChannelSetReceiver,
    output: ChannelSetSender,
    mut heights: watch::Receiver<Height>,
    mut shutdown: broadcast::Receiver<ShutdownCause>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut gate = HeightGate::new(*heights.borrow_and_update());
        let mut heights_open = true;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::debug!("height filter shutting down");
                    break;
                }
                changed = heights.changed(), if heights_open => {
                    if changed.is_err() {
                        heights_open = false;
                        continue;
                    }
                    let height = *heights.borrow_and_update();
                    let released = gate.advance(height);
                    tracing::trace!(height, released = released.len(), "height filter advanced");
                    for item in released {
                        if !matches!(or_shutdown(&mut shutdown, output.send(item)).await, Ok(Ok(()))) {
                            return;
                        }
                    }
                }
                item = input.recv() => {
                    let Some(item) = item else { break };
                    match gate.admit(&item) {
                        Admission::Pass => {
                            if !matches!(or_shutdown(&mut shutdown, output.send(item)).await, Ok(Ok(()))) {
                                break;
                            }
                        }
                        Admission::Buffered => {}
                        dropped => {
                            tracing::trace!(
                                kind = %item.kind(),
                                height = item.height(),
                                current = gate.height(),
                                admission = ?dropped,
                                "dropping message outside admission window"
                            );
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_set::channel_set;
    use hyperdrive_messages::Fault;
    use hyperdrive_utils::ShutdownController;

    fn at(height: Height) -> Item {
        Item::from(Fault::new(0, height))
    }

    #[test]
    fn classifies_against_current_height() {
        let mut gate = HeightGate::new(10);
        assert_eq!(gate.admit(&at(9)), Admission::Stale);
        assert_eq!(gate.admit(&at(10)), Admission::Pass);
        assert_eq!(gate.admit(&at(11)), Admission::Buffered);
        assert_eq!(gate.admit(&at(10 + HEIGHT_CEILING)), Admission::Buffered);
        assert_eq!(gate.admit(&at(11 + HEIGHT_CEILING)), Admission::TooFar);
        assert_eq!(gate.buffered(), 2);
    }

    #[test]
    fn advance_releases_once_and_drops_skipped_heights() {
        let mut gate = HeightGate::new(1);
        gate.admit(&at(2));
        gate.admit(&at(3));
        gate.admit(&at(3));
        gate.admit(&at(5));

        assert_eq!(gate.advance(3), vec![at(3), at(3)]);
        assert_eq!(gate.buffered(), 1);
        assert!(gate.advance(3).is_empty());
        assert!(gate.advance(4).is_empty());
        assert_eq!(gate.advance(5), vec![at(5)]);
        assert_eq!(gate.buffered(), 0);
    }

    #[test]
    fn advance_backwards_is_ignored() {
        let mut gate = HeightGate::new(5);
        gate.admit(&at(6));
        assert!(gate.advance(2).is_empty());
        assert_eq!(gate.height(), 5);
        assert_eq!(gate.buffered(), 1);
    }

    #[tokio::test]
    async fn task_releases_buffered_items_on_height_update() {
        let (in_tx, in_rx) = channel_set(8);
        let (out_tx, mut out_rx) = channel_set(8);
        let (height_tx, height_rx) = watch::channel(1);
        let shutdown = ShutdownController::new();
        let _handle = spawn_height_filter(in_rx, out_tx, height_rx, shutdown.subscribe());

        in_tx.send(Fault::new(0, 2)).await.unwrap();
        in_tx.send(Fault::new(0, 0)).await.unwrap();
        in_tx.send(Fault::new(0, 1)).await.unwrap();
        assert_eq!(out_rx.recv().await.map(|i| i.height()), Some(1));

        height_tx.send(2).unwrap();
        assert_eq!(out_rx.recv().await.map(|i| i.height()), Some(2));
    }
}
