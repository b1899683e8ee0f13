//! Gateway Relayer Library
//!
//! This crate relays state changes between independent chains: it watches a
//! gateway contract on each configured source chain for outbound-message
//! events, waits for per-chain finality, and submits the corresponding
//! command to the destination gateway — at most one destination-side effect
//! per source event.

pub mod api;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod dedup;
pub mod error;
pub mod evm_client;
pub mod gate;
pub mod health;
pub mod queue;
pub mod relayer;

// Re-export commonly used types
pub use codec::{Command, CommandId, CommandKind, EventKind, RelayEvent};
pub use config::{ApiConfig, ChainConfig, ChainRole, Config, RelayerConfig};
pub use crypto::RelayerIdentity;
pub use dedup::{CommandStatus, DedupStore};
pub use error::{ChainClientError, RelayError};
pub use evm_client::{ChainClient, EvmLog};
pub use health::{HealthMonitor, HealthSnapshot, HealthStatus};
pub use relayer::Relayer;
