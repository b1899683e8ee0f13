//! Error taxonomy for the relay engine.
//!
//! Chain-level errors distinguish transient failures (retried with backoff)
//! from deterministic ones (surfaced, never blind-retried).

use thiserror::Error;

/// Errors surfaced by a [`crate::evm_client::ChainClient`].
#[derive(Debug, Error)]
pub enum ChainClientError {
    /// RPC endpoint unreachable or returned a malformed response.
    #[error("chain endpoint unreachable: {0}")]
    Connectivity(String),

    /// The endpoint answered with a JSON-RPC error object.
    #[error("JSON-RPC error from {method} (code {code}): {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    /// A network call did not complete within its timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The submitted transaction was mined but reverted deterministically.
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },
}

impl ChainClientError {
    /// Whether retrying the same operation can reasonably succeed.
    ///
    /// Reverts and RPC-level rejections are deterministic; only connectivity
    /// failures and timeouts are worth retrying as-is.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ChainClientError::Connectivity(_) | ChainClientError::Timeout(_)
        )
    }
}

/// Errors in the relay pipeline between event discovery and submission.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A gateway log whose topic matches neither relayed event kind.
    #[error("unsupported event kind: topic {0}")]
    UnsupportedEventKind(String),

    /// A recognized event whose payload does not decode.
    #[error("malformed gateway event: {0}")]
    MalformedEvent(String),

    /// The event names a destination chain that is not configured
    /// (or not accepting submissions).
    #[error("unknown destination chain '{0}'")]
    UnknownDestinationChain(String),

    /// The relayer address is not whitelisted on a destination gateway.
    #[error("relayer {relayer} is not authorized on the gateway of chain '{chain}'")]
    NotAuthorized { chain: String, relayer: String },

    #[error(transparent)]
    Chain(#[from] ChainClientError),
}
