//! Status API.
//!
//! Small warp HTTP server exposing the health snapshot for operators and
//! monitoring systems. Read-only: no endpoint triggers submissions.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use warp::Filter;

use crate::config::ApiConfig;
use crate::health::HealthMonitor;

/// Standardized response envelope for all API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (if successful)
    pub data: Option<T>,
    /// Error message (if failed)
    pub error: Option<String>,
}

/// The status API server.
pub struct ApiServer {
    config: ApiConfig,
    monitor: Arc<HealthMonitor>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, monitor: Arc<HealthMonitor>) -> Self {
        Self { config, monitor }
    }

    /// Serves the API until `shutdown` flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr: std::net::SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Failed to parse API server address")?;

        info!("Status API listening on {}", addr);

        let (_, server) = warp::serve(self.routes()).bind_with_graceful_shutdown(addr, async move {
            let _ = shutdown.changed().await;
        });
        server.await;

        Ok(())
    }

    /// All API routes.
    pub fn routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        // Health snapshot endpoint, with /status as an alias
        let health = warp::path("health")
            .and(warp::get())
            .and(with_monitor(self.monitor.clone()))
            .and_then(get_health_handler);

        let status = warp::path("status")
            .and(warp::get())
            .and(with_monitor(self.monitor.clone()))
            .and_then(get_health_handler);

        health.or(status)
    }
}

fn with_monitor(
    monitor: Arc<HealthMonitor>,
) -> impl Filter<Extract = (Arc<HealthMonitor>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || monitor.clone())
}

/// Handler for the health endpoint: probes every chain and returns the
/// aggregate snapshot.
async fn get_health_handler(
    monitor: Arc<HealthMonitor>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let snapshot = monitor.snapshot().await;

    Ok(warp::reply::json(&ApiResponse {
        success: true,
        data: Some(snapshot),
        error: None,
    }))
}
