//! Idempotency store.
//!
//! The single source of truth for which source events have already produced
//! a destination command. Shared by all source-chain polling tasks, so the
//! has-processed check and the pending mark happen in one critical section:
//! two concurrent observers of the same event cannot both treat it as unseen.
//!
//! In-memory for the process lifetime. An event left `pending` at restart is
//! retried; the destination gateway's own replay rejection is the final
//! safety net against double execution.

use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::codec::CommandId;

/// Lifecycle of a command derived from one source event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Claimed by an observer, not yet sent
    Pending,
    /// Transaction broadcast, receipt not yet seen
    Submitted,
    /// Receipt confirmed success
    Confirmed,
    /// Terminal failure, surfaced for operator review
    Failed,
}

/// Concurrency-safe keyed store of command statuses.
#[derive(Debug, Default)]
pub struct DedupStore {
    inner: RwLock<HashMap<CommandId, CommandStatus>>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic test-and-set: claims `id` as `Pending` if it has never been
    /// seen. Returns false if any status already exists, including `Failed` —
    /// failed commands are not silently re-attempted.
    pub async fn try_begin(&self, id: CommandId) -> bool {
        let mut map = self.inner.write().await;
        if map.contains_key(&id) {
            return false;
        }
        map.insert(id, CommandStatus::Pending);
        true
    }

    /// Whether any status is recorded for `id`.
    pub async fn has_processed(&self, id: CommandId) -> bool {
        self.inner.read().await.contains_key(&id)
    }

    pub async fn status_of(&self, id: CommandId) -> Option<CommandStatus> {
        self.inner.read().await.get(&id).copied()
    }

    pub async fn mark_submitted(&self, id: CommandId) {
        self.inner.write().await.insert(id, CommandStatus::Submitted);
    }

    pub async fn mark_confirmed(&self, id: CommandId) {
        self.inner.write().await.insert(id, CommandStatus::Confirmed);
    }

    pub async fn mark_failed(&self, id: CommandId) {
        self.inner.write().await.insert(id, CommandStatus::Failed);
    }

    /// Number of commands that reached `Confirmed`.
    pub async fn confirmed_count(&self) -> usize {
        self.inner
            .read()
            .await
            .values()
            .filter(|s| **s == CommandStatus::Confirmed)
            .count()
    }
}
