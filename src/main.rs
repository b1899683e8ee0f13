//! Gateway Relayer Service
//!
//! Watches gateway contracts on configured source chains for outbound-message
//! events and delivers the corresponding commands to destination gateways,
//! signed by the relayer identity.
//!
//! ## Security Requirements
//!
//! **CRITICAL**: This service holds the relayer wallet key and can submit
//! arbitrary approved commands. Ensure proper key management and access
//! controls for production use.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use gateway_relayer::api::ApiServer;
use gateway_relayer::config::Config;
use gateway_relayer::crypto::RelayerIdentity;
use gateway_relayer::health::HealthMonitor;
use gateway_relayer::relayer::Relayer;

/// Main application entry point.
///
/// 1. Initializes logging and tracing
/// 2. Loads configuration and the relayer identity
/// 3. Starts the status API and the relay loops
/// 4. Runs until ctrl-c, then shuts down cooperatively
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging for debugging and monitoring
    tracing_subscriber::fmt::init();

    info!("Starting Gateway Relayer Service");

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("Gateway Relayer Service");
        println!();
        println!("Usage: gateway-relayer [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --config <path>   Use custom config file path");
        println!("  --help, -h        Show this help message");
        println!();
        println!("Environment variables:");
        println!("  RELAYER_CONFIG_PATH    Path to config file (overrides --config)");
        println!("  RELAYER_PRIVATE_KEY    Hex-encoded relayer private key");
        return Ok(());
    }

    let mut config_path = None;
    let mut i = 1; // Skip program name
    while i < args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            config_path = Some(args[i + 1].clone());
            i += 1;
        }
        i += 1;
    }

    if let Some(path) = config_path {
        std::env::set_var("RELAYER_CONFIG_PATH", &path);
        info!("Using custom config: {}", path);
    }

    // Load configuration from config/relayer.toml (or RELAYER_CONFIG_PATH)
    let config = Config::load()?;
    info!("Configuration loaded: {} chains", config.chains.len());

    let identity = RelayerIdentity::from_env(&config.relayer.private_key_env)?;

    let api_config = config.api.clone();
    let relayer = Relayer::new(config, identity)?;
    let monitor = Arc::new(HealthMonitor::new(relayer.clients(), relayer.dedup()));

    // Cooperative shutdown: ctrl-c flips the flag, loops drain and exit.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    let api = ApiServer::new(api_config, monitor);
    let api_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        if let Err(e) = api.run(api_shutdown).await {
            tracing::error!("Status API terminated: {}", e);
        }
    });

    relayer.run(shutdown_rx).await
}
