//! EVM JSON-RPC chain client.
//!
//! One client per configured chain, wrapping its RPC endpoint and the shared
//! relayer signer. Reads: chain head and gateway logs. Writes: locally-signed
//! legacy EIP-155 transactions via `eth_sendRawTransaction`, so the relay
//! works against public endpoints that hold no keys. Holds no pipeline state.

use reqwest::Client;
use serde::Deserialize;
use sha3::{Digest, Keccak256};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::codec::{self, function_selector};
use crate::config::ChainConfig;
use crate::crypto::RelayerIdentity;
use crate::error::ChainClientError;

/// How long to poll for a transaction receipt before reporting a timeout.
const RECEIPT_POLL_ATTEMPTS: u32 = 60;
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

// ============================================================================
// JSON-RPC TYPES
// ============================================================================

/// One log entry returned by `eth_getLogs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: String,
    pub transaction_hash: String,
    pub log_index: String,
}

#[derive(Debug, Deserialize)]
struct Receipt {
    status: Option<String>,
}

// ============================================================================
// CHAIN CLIENT
// ============================================================================

/// Capability wrapper over one chain's RPC endpoint and the relayer signer.
pub struct ChainClient {
    name: String,
    config: ChainConfig,
    http: Client,
    identity: Arc<RelayerIdentity>,
    gas_limit: u64,
    rpc_timeout: Duration,
}

impl ChainClient {
    pub fn new(
        name: &str,
        config: &ChainConfig,
        identity: Arc<RelayerIdentity>,
        gas_limit: u64,
        rpc_timeout_ms: u64,
    ) -> anyhow::Result<Self> {
        let rpc_timeout = Duration::from_millis(rpc_timeout_ms);
        let http = Client::builder()
            .timeout(rpc_timeout)
            .no_proxy() // Avoid macOS system-configuration issues in tests
            .build()?;

        Ok(Self {
            name: name.to_string(),
            config: config.clone(),
            http,
            identity,
            gas_limit,
            rpc_timeout,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    pub fn block_confirmations(&self) -> u64 {
        self.config.block_confirmations
    }

    /// The relayer address used to sign submissions on this chain.
    pub fn relayer_address(&self) -> &str {
        self.identity.address()
    }

    /// Current chain head block number via `eth_blockNumber`.
    pub async fn latest_block(&self) -> Result<u64, ChainClientError> {
        let block_hex: String = self.json_rpc("eth_blockNumber", vec![]).await?;
        parse_hex_u64(&block_hex)
            .map_err(|e| ChainClientError::Connectivity(format!("bad block number: {}", e)))
    }

    /// Gateway logs for the two relayed event kinds over an inclusive block
    /// range.
    pub async fn get_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<EvmLog>, ChainClientError> {
        let filter = serde_json::json!({
            "address": self.config.gateway_address,
            "fromBlock": format!("0x{:x}", from_block),
            "toBlock": format!("0x{:x}", to_block),
            // OR-list of topic0: either relayed event kind
            "topics": [[
                codec::event_topic(codec::CONTRACT_CALL_SIGNATURE),
                codec::event_topic(codec::TOKEN_SENT_SIGNATURE),
            ]],
        });

        self.json_rpc("eth_getLogs", vec![filter]).await
    }

    /// Signs and broadcasts a transaction carrying `calldata` to the gateway
    /// contract. Returns the transaction hash.
    ///
    /// The account nonce is fetched fresh on every call, so a retry after a
    /// timeout naturally picks up a refreshed nonce.
    pub async fn send_signed_tx(&self, calldata: &[u8]) -> Result<String, ChainClientError> {
        // 1. Fetch nonce and gas price
        let nonce_hex: String = self
            .json_rpc(
                "eth_getTransactionCount",
                vec![
                    serde_json::json!(self.identity.address()),
                    serde_json::json!("pending"),
                ],
            )
            .await?;
        let nonce = parse_hex_u64(&nonce_hex)
            .map_err(|e| ChainClientError::Connectivity(format!("bad nonce: {}", e)))?;

        let gas_price_hex: String = self.json_rpc("eth_gasPrice", vec![]).await?;
        let gas_price = parse_hex_u64(&gas_price_hex)
            .map_err(|e| ChainClientError::Connectivity(format!("bad gas price: {}", e)))?;

        let to_hex = self
            .config
            .gateway_address
            .strip_prefix("0x")
            .unwrap_or(&self.config.gateway_address);
        let to_bytes = hex::decode(to_hex)
            .map_err(|e| ChainClientError::Connectivity(format!("bad gateway address: {}", e)))?;

        // 2. RLP-encode unsigned tx for EIP-155 signing:
        //    [nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0]
        let unsigned_items: Vec<Vec<u8>> = vec![
            rlp_encode_u64(nonce),
            rlp_encode_u64(gas_price),
            rlp_encode_u64(self.gas_limit),
            to_bytes.clone(),
            vec![], // value = 0
            calldata.to_vec(),
            rlp_encode_u64(self.config.chain_id),
            vec![],
            vec![],
        ];
        let unsigned_rlp = rlp_encode_list(&unsigned_items);

        // 3. Keccak256 hash and sign
        let mut hasher = Keccak256::new();
        hasher.update(&unsigned_rlp);
        let tx_hash: [u8; 32] = hasher.finalize().into();

        let (r, s, recovery_id) = self
            .identity
            .sign_transaction_hash(&tx_hash)
            .map_err(|e| ChainClientError::Connectivity(format!("signing failed: {}", e)))?;

        // 4. EIP-155 v value: recovery_id + chainId * 2 + 35
        let v = (recovery_id as u64) + self.config.chain_id * 2 + 35;

        let signed_items: Vec<Vec<u8>> = vec![
            rlp_encode_u64(nonce),
            rlp_encode_u64(gas_price),
            rlp_encode_u64(self.gas_limit),
            to_bytes,
            vec![],
            calldata.to_vec(),
            rlp_encode_u64(v),
            trim_leading_zeros(&r),
            trim_leading_zeros(&s),
        ];
        let raw_tx = format!("0x{}", hex::encode(rlp_encode_list(&signed_items)));

        debug!(
            "{}: raw tx nonce={}, gas_price={}, chain_id={}",
            self.name, nonce, gas_price, self.config.chain_id
        );

        // 5. Broadcast
        self.json_rpc("eth_sendRawTransaction", vec![serde_json::json!(raw_tx)])
            .await
    }

    /// Polls for the receipt of `tx_hash` and verifies it succeeded.
    ///
    /// Distinguishes a deterministic revert (`Reverted`, not retried as-is)
    /// from an unconfirmed transaction (`Timeout`, retryable).
    pub async fn wait_receipt(&self, tx_hash: &str) -> Result<(), ChainClientError> {
        for _ in 0..RECEIPT_POLL_ATTEMPTS {
            let receipt: Option<Receipt> = self
                .json_rpc("eth_getTransactionReceipt", vec![serde_json::json!(tx_hash)])
                .await?;

            if let Some(receipt) = receipt {
                let status = receipt.status.as_deref().unwrap_or("0x0");
                if status == "0x1" {
                    return Ok(());
                }
                return Err(ChainClientError::Reverted {
                    tx_hash: tx_hash.to_string(),
                });
            }

            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }

        Err(ChainClientError::Timeout(format!(
            "no receipt for transaction {} on {}",
            tx_hash, self.name
        )))
    }

    /// Whether the relayer address is whitelisted on this chain's gateway,
    /// via `eth_call` of `isRelayerAuthorized(address)`.
    pub async fn is_relayer_authorized(&self) -> Result<bool, ChainClientError> {
        let selector = function_selector("isRelayerAuthorized(address)");

        let addr_clean = self
            .identity
            .address()
            .strip_prefix("0x")
            .unwrap_or_else(|| self.identity.address());
        let addr_bytes = hex::decode(addr_clean)
            .map_err(|e| ChainClientError::Connectivity(format!("bad relayer address: {}", e)))?;

        // selector + address left-padded to 32 bytes
        let mut calldata = Vec::with_capacity(36);
        calldata.extend_from_slice(&selector);
        calldata.extend_from_slice(&[0u8; 12]);
        calldata.extend_from_slice(&addr_bytes);

        let result: String = self
            .json_rpc(
                "eth_call",
                vec![
                    serde_json::json!({
                        "to": self.config.gateway_address,
                        "data": format!("0x{}", hex::encode(&calldata)),
                    }),
                    serde_json::json!("latest"),
                ],
            )
            .await?;

        // ABI-encoded bool: 32 bytes, last byte 0 or 1
        let clean = result.strip_prefix("0x").unwrap_or(&result);
        Ok(clean.ends_with('1'))
    }

    /// Generic JSON-RPC call helper with a per-call timeout.
    async fn json_rpc<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T, ChainClientError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let rpc_future = async {
            let resp = self
                .http
                .post(&self.config.rpc_url)
                .json(&request)
                .send()
                .await
                .map_err(|e| classify_reqwest_error(method, &self.config.rpc_url, e))?;
            resp.json::<serde_json::Value>().await.map_err(|e| {
                ChainClientError::Connectivity(format!(
                    "failed to parse {} response from {}: {}",
                    method, self.config.rpc_url, e
                ))
            })
        };

        let response = tokio::time::timeout(self.rpc_timeout, rpc_future)
            .await
            .map_err(|_| {
                ChainClientError::Timeout(format!(
                    "{} to {} exceeded {:?}",
                    method, self.config.rpc_url, self.rpc_timeout
                ))
            })??;

        if let Some(error) = response.get("error") {
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            return Err(ChainClientError::Rpc {
                method: method.to_string(),
                code,
                message,
            });
        }

        let result = response.get("result").ok_or_else(|| {
            ChainClientError::Connectivity(format!("no result in {} response", method))
        })?;

        serde_json::from_value(result.clone()).map_err(|e| {
            ChainClientError::Connectivity(format!(
                "failed to deserialize {} result: {}",
                method, e
            ))
        })
    }
}

fn classify_reqwest_error(method: &str, url: &str, e: reqwest::Error) -> ChainClientError {
    if e.is_timeout() {
        ChainClientError::Timeout(format!("{} to {}: {}", method, url, e))
    } else {
        ChainClientError::Connectivity(format!("{} to {}: {}", method, url, e))
    }
}

fn parse_hex_u64(hex_str: &str) -> Result<u64, String> {
    let clean = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    u64::from_str_radix(clean, 16).map_err(|e| e.to_string())
}

// ============================================================================
// RLP HELPERS
// ============================================================================

/// Minimal big-endian integer encoding (no leading zeros, empty for zero).
fn rlp_encode_u64(val: u64) -> Vec<u8> {
    if val == 0 {
        return vec![];
    }
    let bytes = val.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(8);
    bytes[start..].to_vec()
}

fn rlp_encode_item(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return data.to_vec();
    }
    if data.len() <= 55 {
        let mut out = vec![0x80 + data.len() as u8];
        out.extend_from_slice(data);
        out
    } else {
        let len_bytes = rlp_encode_u64(data.len() as u64);
        let mut out = vec![0xb7 + len_bytes.len() as u8];
        out.extend_from_slice(&len_bytes);
        out.extend_from_slice(data);
        out
    }
}

fn rlp_encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let mut payload = Vec::new();
    for item in items {
        payload.extend(rlp_encode_item(item));
    }

    if payload.len() <= 55 {
        let mut out = vec![0xc0 + payload.len() as u8];
        out.extend(payload);
        out
    } else {
        let len_bytes = rlp_encode_u64(payload.len() as u64);
        let mut out = vec![0xf7 + len_bytes.len() as u8];
        out.extend_from_slice(&len_bytes);
        out.extend(payload);
        out
    }
}

/// Canonical RLP integers carry no leading zero bytes.
fn trim_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

// ============================================================================
// TESTS
// ============================================================================
