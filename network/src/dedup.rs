//! Duplicate suppression for routed messages.
//!
//! Both filters remember a bounded window of recently seen delivery digests
//! (see [`Item::delivery_digest`]). The ingress [`DuplicateFilter`] keeps one
//! window per message kind; the egress [`BroadcastDedup`] keeps a single
//! window across kinds so each distinct delivery is gossiped at most once.

use hyperdrive_messages::MessageKind;
use hyperdrive_types::Digest;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::channel_set::Item;
use crate::filter::ItemFilter;

/// Default window: the last 65 536 digests.
pub const DEFAULT_DEDUP_CAPACITY: usize = 65_536;

/// Rolling set of recently seen digests.
///
/// Holds at most `capacity` digests in insertion order; the oldest is
/// forgotten when a new one arrives at capacity.
pub struct MessageDedup {
    capacity: usize,
    seen: HashSet<Digest>,
    order: VecDeque<Digest>,
}

impl MessageDedup {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Returns `true` if `digest` is already in the window. Otherwise
    /// records it and returns `false`.
    pub fn is_duplicate(&mut self, digest: &Digest) -> bool {
        if self.seen.contains(digest) {
            return true;
        }
        if self.capacity == 0 {
            return false;
        }
        if self.seen.len() >= self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.seen.remove(&old);
            }
        }
        self.seen.insert(*digest);
        self.order.push_back(*digest);
        false
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for MessageDedup {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}

/// Ingress filter with one window per message kind.
pub struct DuplicateFilter {
    capacity: usize,
    windows: HashMap<MessageKind, MessageDedup>,
}

impl DuplicateFilter {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            windows: HashMap::new(),
        }
    }
}

impl ItemFilter for DuplicateFilter {
    const NAME: &'static str = "dedup";

    fn admit(&mut self, item: Item) -> Option<Item> {
        let capacity = self.capacity;
        let window = self
            .windows
            .entry(item.kind())
            .or_insert_with(|| MessageDedup::new(capacity));
        if window.is_duplicate(&item.delivery_digest()) {
            tracing::trace!(kind = %item.kind(), hash = %item.hash(), "dropping duplicate");
            return None;
        }
        Some(item)
    }
}

/// Egress filter with a single window shared by every kind.
pub struct BroadcastDedup {
    window: MessageDedup,
}

impl BroadcastDedup {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: MessageDedup::new(capacity),
        }
    }
}

impl ItemFilter for BroadcastDedup {
    const NAME: &'static str = "broadcast-dedup";

    fn admit(&mut self, item: Item) -> Option<Item> {
        if self.window.is_duplicate(&item.delivery_digest()) {
            tracing::trace!(kind = %item.kind(), hash = %item.hash(), "already broadcast");
            return None;
        }
        Some(item)
    }
}
