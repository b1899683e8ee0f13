//! Shared test fixtures
//!
//! Deterministic identities, configuration builders, ABI log encoders, and
//! wiremock JSON-RPC mounting helpers used across the integration test files.

use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gateway_relayer::codec;
use gateway_relayer::config::{ApiConfig, ChainConfig, ChainRole, Config, RelayerConfig};
use gateway_relayer::crypto::RelayerIdentity;
use gateway_relayer::evm_client::{ChainClient, EvmLog};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

/// Well-known throwaway secp256k1 key; never funded anywhere.
#[allow(dead_code)]
pub const DUMMY_PRIVATE_KEY: &str =
    "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

#[allow(dead_code)]
pub const DUMMY_GATEWAY_ADDR: &str = "0xa1b2c3d4e5f60718293a4b5c6d7e8f9012345678";

#[allow(dead_code)]
pub const DUMMY_SENDER_ADDR: &str = "0x1111111111111111111111111111111111111111";

#[allow(dead_code)]
pub const DUMMY_CONTRACT_ADDR: &str = "0x2222222222222222222222222222222222222222";

// ============================================================================
// IDENTITY AND CONFIGURATION BUILDERS
// ============================================================================

#[allow(dead_code)]
pub fn test_identity() -> RelayerIdentity {
    RelayerIdentity::from_hex(DUMMY_PRIVATE_KEY).expect("test key is valid")
}

#[allow(dead_code)]
pub fn test_chain_config(rpc_url: &str, chain_id: u64, confirmations: u64, role: ChainRole) -> ChainConfig {
    ChainConfig {
        rpc_url: rpc_url.to_string(),
        chain_id,
        gateway_address: DUMMY_GATEWAY_ADDR.to_string(),
        block_confirmations: confirmations,
        role,
    }
}

/// A two-chain config: 'crossfi' as a 1-confirmation source and 'ethereum'
/// as a 12-confirmation destination.
#[allow(dead_code)]
pub fn build_test_config(source_url: &str, destination_url: &str) -> Config {
    let mut chains = std::collections::HashMap::new();
    chains.insert(
        "crossfi".to_string(),
        test_chain_config(source_url, 4157, 1, ChainRole::Source),
    );
    chains.insert(
        "ethereum".to_string(),
        test_chain_config(destination_url, 11155111, 12, ChainRole::Destination),
    );

    Config {
        chains,
        relayer: RelayerConfig {
            private_key_env: "RELAYER_PRIVATE_KEY".to_string(),
            polling_interval_ms: 100,
            gas_limit: 2_000_000,
            max_submission_attempts: 3,
            rpc_timeout_ms: 2_000,
        },
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
    }
}

#[allow(dead_code)]
pub fn make_client(name: &str, rpc_url: &str, chain_id: u64, confirmations: u64) -> Arc<ChainClient> {
    let config = test_chain_config(rpc_url, chain_id, confirmations, ChainRole::Both);
    Arc::new(
        ChainClient::new(name, &config, Arc::new(test_identity()), 2_000_000, 2_000)
            .expect("failed to create test client"),
    )
}

// ============================================================================
// MOCK SERVER SETUP HELPERS
// ============================================================================

/// Mounts a JSON-RPC method on the mock server with a fixed `result`.
#[allow(dead_code)]
pub async fn mount_rpc(server: &MockServer, rpc_method: &str, result: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({"method": rpc_method})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": result})),
        )
        .mount(server)
        .await;
}

// ============================================================================
// ABI LOG ENCODERS
// ============================================================================

fn uint_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn pad32(n: usize) -> usize {
    (n + 31) / 32 * 32
}

fn push_tail(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&uint_word(data.len() as u64));
    out.extend_from_slice(data);
    out.extend(std::iter::repeat(0u8).take((32 - data.len() % 32) % 32));
}

/// Pads a 20-byte address into a 32-byte indexed topic.
#[allow(dead_code)]
pub fn address_topic(address: &str) -> String {
    let clean = address.strip_prefix("0x").unwrap_or(address);
    format!("0x{:0>64}", clean)
}

/// ABI data section of a `ContractCall` event:
/// (string destinationChain, string destinationContractAddress, bytes payload).
#[allow(dead_code)]
pub fn encode_contract_call_data(
    destination_chain: &str,
    destination_contract: &str,
    payload: &[u8],
) -> String {
    let head = 3 * 32;
    let off0 = head;
    let off1 = off0 + 32 + pad32(destination_chain.len());
    let off2 = off1 + 32 + pad32(destination_contract.len());

    let mut data = Vec::new();
    data.extend_from_slice(&uint_word(off0 as u64));
    data.extend_from_slice(&uint_word(off1 as u64));
    data.extend_from_slice(&uint_word(off2 as u64));
    push_tail(&mut data, destination_chain.as_bytes());
    push_tail(&mut data, destination_contract.as_bytes());
    push_tail(&mut data, payload);

    format!("0x{}", hex::encode(data))
}

/// ABI data section of a `TokenSent` event:
/// (string destinationChain, string destinationAddress, string symbol, uint256 amount).
#[allow(dead_code)]
pub fn encode_token_sent_data(
    destination_chain: &str,
    destination_address: &str,
    symbol: &str,
    amount: u64,
) -> String {
    let head = 4 * 32;
    let off0 = head;
    let off1 = off0 + 32 + pad32(destination_chain.len());
    let off2 = off1 + 32 + pad32(destination_address.len());

    let mut data = Vec::new();
    data.extend_from_slice(&uint_word(off0 as u64));
    data.extend_from_slice(&uint_word(off1 as u64));
    data.extend_from_slice(&uint_word(off2 as u64));
    data.extend_from_slice(&uint_word(amount));
    push_tail(&mut data, destination_chain.as_bytes());
    push_tail(&mut data, destination_address.as_bytes());
    push_tail(&mut data, symbol.as_bytes());

    format!("0x{}", hex::encode(data))
}

/// A complete `ContractCall` gateway log.
#[allow(dead_code)]
pub fn contract_call_log(
    destination_chain: &str,
    destination_contract: &str,
    payload_hash: [u8; 32],
    block_number: u64,
    tx_hash: [u8; 32],
    log_index: u64,
) -> EvmLog {
    EvmLog {
        address: DUMMY_GATEWAY_ADDR.to_string(),
        topics: vec![
            codec::event_topic(codec::CONTRACT_CALL_SIGNATURE),
            address_topic(DUMMY_SENDER_ADDR),
            format!("0x{}", hex::encode(payload_hash)),
        ],
        data: encode_contract_call_data(destination_chain, destination_contract, b"payload"),
        block_number: format!("0x{:x}", block_number),
        transaction_hash: format!("0x{}", hex::encode(tx_hash)),
        log_index: format!("0x{:x}", log_index),
    }
}

/// A complete `TokenSent` gateway log.
#[allow(dead_code)]
pub fn token_sent_log(
    destination_chain: &str,
    destination_address: &str,
    symbol: &str,
    amount: u64,
    block_number: u64,
    tx_hash: [u8; 32],
    log_index: u64,
) -> EvmLog {
    EvmLog {
        address: DUMMY_GATEWAY_ADDR.to_string(),
        topics: vec![
            codec::event_topic(codec::TOKEN_SENT_SIGNATURE),
            address_topic(DUMMY_SENDER_ADDR),
        ],
        data: encode_token_sent_data(destination_chain, destination_address, symbol, amount),
        block_number: format!("0x{:x}", block_number),
        transaction_hash: format!("0x{}", hex::encode(tx_hash)),
        log_index: format!("0x{:x}", log_index),
    }
}

/// The same log as a JSON-RPC `eth_getLogs` entry.
#[allow(dead_code)]
pub fn log_as_json(log: &EvmLog) -> serde_json::Value {
    json!({
        "address": log.address,
        "topics": log.topics,
        "data": log.data,
        "blockNumber": log.block_number,
        "transactionHash": log.transaction_hash,
        "logIndex": log.log_index,
    })
}
