//! Stateless-shape filter task: one channel set in, one channel set out.

use hyperdrive_utils::{or_shutdown, ShutdownCause};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::channel_set::{ChannelSetReceiver, ChannelSetSender, Item};

/// Decides, item by item, what passes.
pub trait ItemFilter: Send + 'static {
    /// Name used in logs.
    const NAME: &'static str;

    fn admit(&mut self, item: Item) -> Option<Item>;
}

/// Forward every item `filter` admits from `input` to `output` until the
/// input closes, the output is dropped, or shutdown fires. Shutdown is also
/// observed while waiting on a full output. `output` is dropped when the task
/// returns.
pub fn spawn_filter<F: ItemFilter>(
    mut filter: F,
    mut input: ChannelSetReceiver,
    output: ChannelSetSender,
    mut shutdown: broadcast::Receiver<ShutdownCause>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let filter_name = F::NAME;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::debug!(filter = filter_name, "filter shutting down");
                    break;
                }
                item = input.recv() => {
                    let Some(item) = item else { break };
                    let Some(item) = filter.admit(item) else { continue };
                    match or_shutdown(&mut shutdown, output.send(item)).await {
                        Ok(Ok(())) => {}
                        Ok(Err(_)) => {
                            tracing::debug!(filter = filter_name, "output closed");
                            break;
                        }
                        Err(cause) => {
                            tracing::debug!(filter = filter_name, %cause, "filter shutting down");
                            break;
                        }
                    }
                }
            }
        }
    })
}
