//! Fan-out and fan-in between channel sets.
//!
//! [`spawn_split`] copies every item from one source to every destination.
//! Sends wait for capacity, so the slowest destination sets the pace.
//! Destinations are only closed after the source closes (or on shutdown).
//! When the source closes, every item already taken from it is delivered
//! first; shutdown interrupts a send that is waiting for capacity.

use hyperdrive_utils::{or_shutdown, ShutdownCause};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::channel_set::{ChannelSetReceiver, ChannelSetSender};

/// Copy every item of `source` to each of `destinations`.
pub fn spawn_split(
    mut source: ChannelSetReceiver,
    destinations: Vec<ChannelSetSender>,
    mut shutdown: broadcast::Receiver<ShutdownCause>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::debug!(destinations = destinations.len(), "split shutting down");
                    break;
                }
                item = source.recv() => {
                    let Some(item) = item else {
                        tracing::debug!("split source closed");
                        break;
                    };
                    for destination in &destinations {
                        match or_shutdown(&mut shutdown, destination.send(item.clone())).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => tracing::trace!(error = %e, "split destination gone"),
                            Err(cause) => {
                                tracing::debug!(%cause, "split interrupted by shutdown");
                                return;
                            }
                        }
                    }
                }
            }
        }
    })
}

/// Forward every item of `source` into `destination`.
pub fn spawn_pipe(
    source: ChannelSetReceiver,
    destination: ChannelSetSender,
    shutdown: broadcast::Receiver<ShutdownCause>,
) -> JoinHandle<()> {
    spawn_split(source, vec![destination], shutdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_set::{channel_set, Item};
    use hyperdrive_messages::{Block, Fault};
    use hyperdrive_types::Epoch;
    use hyperdrive_utils::ShutdownController;

    #[tokio::test]
    async fn every_destination_gets_every_item() {
        let (src_tx, src_rx) = channel_set(4);
        let (a_tx, mut a_rx) = channel_set(4);
        let (b_tx, mut b_rx) = channel_set(4);
        let shutdown = ShutdownController::new();
        let handle = spawn_split(src_rx, vec![a_tx, b_tx], shutdown.subscribe());

        src_tx.send(Fault::new(1, 1)).await.unwrap();
        src_tx
            .send(Block::new(Epoch::default(), 0, 1, Vec::new()))
            .await
            .unwrap();
        drop(src_tx);
        handle.await.unwrap();

        for rx in [&mut a_rx, &mut b_rx] {
            let mut got = 0;
            while rx.recv().await.is_some() {
                got += 1;
            }
            assert_eq!(got, 2);
        }
    }

    #[tokio::test]
    async fn in_flight_items_survive_source_close_with_slow_reader() {
        let (src_tx, src_rx) = channel_set(16);
        let (fast_tx, mut fast_rx) = channel_set(16);
        // Capacity one forces the split to wait on this reader.
        let (slow_tx, mut slow_rx) = channel_set(1);
        let shutdown = ShutdownController::new();
        let handle = spawn_split(src_rx, vec![fast_tx, slow_tx], shutdown.subscribe());

        for height in 0..10 {
            src_tx.send(Fault::new(0, height)).await.unwrap();
        }
        drop(src_tx);

        let mut slow = Vec::new();
        while let Some(item) = slow_rx.recv().await {
            slow.push(item.height());
        }
        handle.await.unwrap();
        let mut fast = Vec::new();
        while let Some(item) = fast_rx.recv().await {
            fast.push(item.height());
        }

        let expected: Vec<_> = (0..10).collect();
        assert_eq!(slow, expected);
        assert_eq!(fast, expected);
    }

    #[tokio::test]
    async fn destinations_stay_open_until_source_closes() {
        let (src_tx, src_rx) = channel_set(1);
        let (dst_tx, mut dst_rx) = channel_set(1);
        let shutdown = ShutdownController::new();
        let _handle = spawn_pipe(src_rx, dst_tx, shutdown.subscribe());

        src_tx.send(Fault::new(0, 0)).await.unwrap();
        assert_eq!(dst_rx.recv().await, Some(Item::from(Fault::new(0, 0))));
        let pending = tokio::time::timeout(std::time::Duration::from_millis(20), dst_rx.recv()).await;
        assert!(pending.is_err(), "destination closed while source open");

        drop(src_tx);
        assert_eq!(dst_rx.recv().await, None);
    }

    #[tokio::test]
    async fn shutdown_stops_a_split_waiting_on_a_full_destination() {
        let (src_tx, src_rx) = channel_set(4);
        let (dst_tx, mut dst_rx) = channel_set(1);
        let shutdown = ShutdownController::new();
        let handle = spawn_split(src_rx, vec![dst_tx], shutdown.subscribe());

        src_tx.send(Fault::new(0, 0)).await.unwrap();
        src_tx.send(Fault::new(0, 1)).await.unwrap();
        src_tx.send(Fault::new(0, 2)).await.unwrap();
        shutdown.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("split stopped after shutdown")
            .unwrap();

        assert!(src_tx.is_closed());
        let mut delivered = 0;
        while dst_rx.recv().await.is_some() {
            delivered += 1;
        }
        assert!(delivered <= 1);
    }
}
