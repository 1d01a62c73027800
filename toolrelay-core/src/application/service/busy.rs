use crate::domain::ConversationId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Conversations that currently have a turn in flight.
#[derive(Debug, Default)]
pub struct BusyRegistry {
    active: Mutex<HashSet<ConversationId>>,
}

impl BusyRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark `id` busy unless it already is. The mark is cleared when the guard drops.
    pub fn try_acquire(self: &Arc<Self>, id: ConversationId) -> Option<BusyGuard> {
        let inserted = self
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id);
        if !inserted {
            debug!(conversation = id, "conversation busy");
            return None;
        }
        Some(BusyGuard {
            registry: Arc::clone(self),
            id,
        })
    }

    pub fn is_busy(&self, id: ConversationId) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&id)
    }
}

#[derive(Debug)]
pub struct BusyGuard {
    registry: Arc<BusyRegistry>,
    id: ConversationId,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.registry
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}
