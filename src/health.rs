//! Health introspection.
//!
//! Aggregates per-chain connectivity and relayer identity into one snapshot.
//! Read-only: probing never triggers submissions or mutates pipeline state.

use futures::future;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::dedup::DedupStore;
use crate::evm_client::ChainClient;

/// Overall service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every configured chain is reachable
    Healthy,
    /// At least one chain endpoint is unreachable
    Degraded,
}

/// Point-in-time status snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    /// Connectivity per configured chain; every chain has an entry, even
    /// unreachable ones.
    pub chains: HashMap<String, bool>,
    /// Number of commands that reached `confirmed`
    pub processed_events: usize,
    /// The shared relayer address
    pub relayer_address: String,
}

/// Probes every configured chain and reports aggregate health.
pub struct HealthMonitor {
    clients: Vec<Arc<ChainClient>>,
    dedup: Arc<DedupStore>,
    relayer_address: String,
}

impl HealthMonitor {
    pub fn new(clients: Vec<Arc<ChainClient>>, dedup: Arc<DedupStore>) -> Self {
        let relayer_address = clients
            .first()
            .map(|c| c.relayer_address().to_string())
            .unwrap_or_default();
        Self {
            clients,
            dedup,
            relayer_address,
        }
    }

    /// Evaluates connectivity by attempting `latest_block` on every chain
    /// concurrently.
    pub async fn snapshot(&self) -> HealthSnapshot {
        let probes = self.clients.iter().map(|client| async move {
            let reachable = client.latest_block().await.is_ok();
            (client.name().to_string(), reachable)
        });

        let chains: HashMap<String, bool> = future::join_all(probes).await.into_iter().collect();
        let status = if chains.values().all(|ok| *ok) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        HealthSnapshot {
            status,
            chains,
            processed_events: self.dedup.confirmed_count().await,
            relayer_address: self.relayer_address.clone(),
        }
    }
}
