//! Block-applied subscription.
//!
//! The ledger side owns a [`BlockFeed`] and calls [`BlockFeed::apply`] once
//! per finalized block. Subscribers run one after another, in registration
//! order, and `apply` does not return until the last one has finished, so a
//! subscriber never sees block `n + 1` before it is done with block `n`.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::types::Block;

/// A block-applied callback.
///
/// Callbacks cannot fail: whatever goes wrong inside a subscriber stays
/// there and must not disturb block application.
#[async_trait]
pub trait BlockHandler: Send + Sync {
    async fn on_block(&self, block: &Block);

    /// Name used in subscription logs.
    fn name(&self) -> &str;
}

/// Handle returned by [`BlockFeed::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Arc<dyn BlockHandler>)>,
}

/// Registry of block-applied subscribers.
#[derive(Default)]
pub struct BlockFeed {
    inner: Mutex<Subscribers>,
}

impl BlockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; it receives every block applied from now on.
    pub fn subscribe(&self, handler: Arc<dyn BlockHandler>) -> SubscriptionId {
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        tracing::debug!(subscriber = handler.name(), "block subscriber registered");
        inner.handlers.push((id, handler));
        id
    }

    /// Deregister a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.handlers.len();
        inner.handlers.retain(|(sid, _)| *sid != id);
        inner.handlers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().handlers.len()
    }

    /// Deliver `block` to every subscriber and wait for all of them.
    pub async fn apply(&self, block: &Block) {
        // Snapshot so the lock is not held across awaits.
        let handlers: Vec<Arc<dyn BlockHandler>> =
            self.lock().handlers.iter().map(|(_, h)| h.clone()).collect();
        for handler in handlers {
            handler.on_block(block).await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        // A poisoned list is still a valid list.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
