//! Configuration Management Module
//!
//! Loads and validates configuration for the gateway relayer: the set of
//! chains to watch and submit to, the relayer key source, polling cadence,
//! and the status API binding.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chain name -> chain connection/gateway settings
    pub chains: HashMap<String, ChainConfig>,
    /// Relayer identity and submission settings
    pub relayer: RelayerConfig,
    /// Status API server configuration
    pub api: ApiConfig,
}

/// Which direction(s) of the relay a chain participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainRole {
    /// Only watched for outbound gateway events
    Source,
    /// Only accepts relayed command submissions
    Destination,
    /// Both watched and submitted to (the default)
    Both,
}

impl Default for ChainRole {
    fn default() -> Self {
        ChainRole::Both
    }
}

impl ChainRole {
    pub fn is_source(self) -> bool {
        matches!(self, ChainRole::Source | ChainRole::Both)
    }

    pub fn is_destination(self) -> bool {
        matches!(self, ChainRole::Destination | ChainRole::Both)
    }
}

/// Configuration for one chain connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL
    pub rpc_url: String,
    /// Numeric chain id (EIP-155)
    pub chain_id: u64,
    /// Address of the gateway contract on this chain
    pub gateway_address: String,
    /// Blocks required atop an event's block before it is treated as final
    pub block_confirmations: u64,
    /// Relay role of this chain
    #[serde(default)]
    pub role: ChainRole,
}

/// Relayer identity and submission parameters.
///
/// The private key is loaded from an environment variable at runtime for
/// security. The config file contains the variable name, never the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayerConfig {
    /// Environment variable holding the hex-encoded secp256k1 private key.
    /// Default: "RELAYER_PRIVATE_KEY"
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
    /// Polling interval for source-chain event discovery in milliseconds
    pub polling_interval_ms: u64,
    /// Gas limit applied to submitted transactions
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    /// Maximum submission attempts per command before it is marked failed
    #[serde(default = "default_max_submission_attempts")]
    pub max_submission_attempts: u32,
    /// Per-call RPC timeout in milliseconds
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
}

fn default_private_key_env() -> String {
    "RELAYER_PRIVATE_KEY".to_string()
}

fn default_gas_limit() -> u64 {
    2_000_000
}

fn default_max_submission_attempts() -> u32 {
    5
}

fn default_rpc_timeout_ms() -> u64 {
    15_000
}

impl RelayerConfig {
    /// Loads the private key from the configured environment variable.
    pub fn get_private_key(&self) -> anyhow::Result<String> {
        std::env::var(&self.private_key_env).map_err(|_| {
            anyhow::anyhow!(
                "Environment variable '{}' not set. Please set it with your relayer private key (hex encoded).",
                self.private_key_env
            )
        })
    }
}

/// Status API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host address to bind the API server to
    pub host: String,
    /// Port number to bind the API server to
    pub port: u16,
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl Config {
    /// Validates the configuration.
    ///
    /// Ensures at least one chain is configured, chain ids are unique, and
    /// at least one chain has a source role (otherwise there is nothing to
    /// relay).
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chains.is_empty() {
            return Err(anyhow::anyhow!(
                "Configuration error: no chains configured. At least one [chains.<name>] entry is required."
            ));
        }

        let mut seen_ids: HashSet<u64> = HashSet::new();
        for (name, chain) in &self.chains {
            if !seen_ids.insert(chain.chain_id) {
                return Err(anyhow::anyhow!(
                    "Configuration error: chain '{}' reuses chain ID {}. Each chain must have a unique chain ID.",
                    name,
                    chain.chain_id
                ));
            }
            if chain.gateway_address.trim().is_empty() {
                return Err(anyhow::anyhow!(
                    "Configuration error: chain '{}' has an empty gateway address.",
                    name
                ));
            }
        }

        if !self.chains.values().any(|c| c.role.is_source()) {
            return Err(anyhow::anyhow!(
                "Configuration error: no chain has a source role; nothing to relay."
            ));
        }

        Ok(())
    }

    /// Loads configuration from the TOML file.
    ///
    /// Reads `config/relayer.toml` (or the path in `RELAYER_CONFIG_PATH`),
    /// parses it, and validates it.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("RELAYER_CONFIG_PATH")
            .unwrap_or_else(|_| "config/relayer.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/relayer.template.toml config/relayer.toml\n\
                Then edit config/relayer.toml with your actual values.",
                config_path
            ))
        }
    }

    /// Names of chains with a source role.
    pub fn source_chains(&self) -> Vec<&str> {
        self.chains
            .iter()
            .filter(|(_, c)| c.role.is_source())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Names of chains with a destination role.
    pub fn destination_chains(&self) -> Vec<&str> {
        self.chains
            .iter()
            .filter(|(_, c)| c.role.is_destination())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
