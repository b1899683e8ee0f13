//! Integration tests for the relay pipeline against mock JSON-RPC endpoints
//!
//! These tests exercise the chain client, the submission queue, and the
//! health monitor end to end over wiremock servers; no real chain is needed.

use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gateway_relayer::codec::{encode_command, parse_gateway_log};
use gateway_relayer::dedup::{CommandStatus, DedupStore};
use gateway_relayer::error::RelayError;
use gateway_relayer::health::{HealthMonitor, HealthStatus};
use gateway_relayer::queue::SubmissionQueue;
use gateway_relayer::relayer::Relayer;

#[path = "helpers.rs"]
mod helpers;
use helpers::{
    build_test_config, contract_call_log, log_as_json, make_client, mount_rpc, test_identity,
    DUMMY_CONTRACT_ADDR,
};

// ============================================================================
// MOCK SERVER SETUP HELPERS
// ============================================================================

/// Mounts the happy-path submission methods: nonce, gas price, and a
/// successful receipt. `eth_sendRawTransaction` is mounted separately so
/// individual tests can control its behavior and expectations.
async fn mount_submission_reads(server: &MockServer) {
    mount_rpc(server, "eth_getTransactionCount", json!("0x0")).await;
    mount_rpc(server, "eth_gasPrice", json!("0x3b9aca00")).await;
}

async fn mount_receipt(server: &MockServer, status: &str) {
    mount_rpc(
        server,
        "eth_getTransactionReceipt",
        json!({"status": status}),
    )
    .await;
}

fn tx_hash_result() -> serde_json::Value {
    json!(format!("0x{}", hex::encode([0x99u8; 32])))
}

// ============================================================================
// CHAIN CLIENT TESTS
// ============================================================================

/// Test chain head and log discovery over the wire
/// What is tested: eth_blockNumber and eth_getLogs responses parse into the
/// client types and decode into a relay event
#[tokio::test]
async fn test_latest_block_and_log_discovery() {
    let server = MockServer::start().await;
    mount_rpc(&server, "eth_blockNumber", json!("0x64")).await;

    let log = contract_call_log("ethereum", DUMMY_CONTRACT_ADDR, [0x33; 32], 95, [0xaa; 32], 0);
    mount_rpc(&server, "eth_getLogs", json!([log_as_json(&log)])).await;

    let client = make_client("crossfi", &server.uri(), 4157, 1);
    assert_eq!(client.latest_block().await.unwrap(), 100);

    let logs = client.get_logs(50, 100).await.unwrap();
    assert_eq!(logs.len(), 1);

    let event = parse_gateway_log(client.name(), &logs[0]).unwrap();
    assert_eq!(event.block_number, 95);
    assert_eq!(event.destination_chain, "ethereum");
}

/// Test that a JSON-RPC error object surfaces as a non-transient RPC error
#[tokio::test]
async fn test_rpc_error_object_is_not_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32000, "message": "execution reverted"},
        })))
        .mount(&server)
        .await;

    let client = make_client("crossfi", &server.uri(), 4157, 1);
    let err = client.latest_block().await.expect_err("must fail");
    assert!(!err.is_transient());
}

// ============================================================================
// AUTHORIZATION TESTS
// ============================================================================

/// Test that a destination refusing the whitelist check is reported as
/// NotAuthorized
/// Why: An unauthorized relayer must refuse submissions to that chain rather
/// than burn gas on doomed transactions
#[tokio::test]
async fn test_unauthorized_destination_is_refused() {
    let source = MockServer::start().await;
    let destination = MockServer::start().await;

    // eth_call returns ABI-encoded false
    mount_rpc(
        &destination,
        "eth_call",
        json!(format!("0x{:0>64}", "0")),
    )
    .await;

    let config = build_test_config(&source.uri(), &destination.uri());
    let relayer = Relayer::new(config, test_identity()).unwrap();

    match relayer.verify_destination("ethereum").await {
        Err(RelayError::NotAuthorized { chain, .. }) => assert_eq!(chain, "ethereum"),
        other => panic!("expected NotAuthorized, got {:?}", other),
    }
}

/// Test that a whitelisted relayer passes the authorization check
#[tokio::test]
async fn test_authorized_destination_is_accepted() {
    let source = MockServer::start().await;
    let destination = MockServer::start().await;

    mount_rpc(
        &destination,
        "eth_call",
        json!(format!("0x{:0>64}", "1")),
    )
    .await;

    let config = build_test_config(&source.uri(), &destination.uri());
    let relayer = Relayer::new(config, test_identity()).unwrap();

    relayer
        .verify_destination("ethereum")
        .await
        .expect("authorized relayer should pass");
}

/// Test that a destination absent from the config is rejected by name
#[tokio::test]
async fn test_unknown_destination_chain_is_rejected() {
    let server = MockServer::start().await;
    let config = build_test_config(&server.uri(), &server.uri());
    let relayer = Relayer::new(config, test_identity()).unwrap();

    assert!(matches!(
        relayer.verify_destination("polygon").await,
        Err(RelayError::UnknownDestinationChain(_))
    ));
}

// ============================================================================
// SUBMISSION AND IDEMPOTENCY TESTS
// ============================================================================

/// Test that the same event observed twice produces exactly one submission
/// What is tested: both observations derive the same command id; only the
/// first claims it, and the mock counts exactly one eth_sendRawTransaction
#[tokio::test]
async fn test_duplicate_observation_submits_once() {
    let destination = MockServer::start().await;
    mount_submission_reads(&destination).await;
    mount_receipt(&destination, "0x1").await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({"method": "eth_sendRawTransaction"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0", "id": 1, "result": tx_hash_result(),
        })))
        .expect(1)
        .mount(&destination)
        .await;

    let client = make_client("ethereum", &destination.uri(), 11155111, 12);
    let dedup = Arc::new(DedupStore::new());
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let queue = SubmissionQueue::spawn(Arc::clone(&client), Arc::clone(&dedup), 3, shutdown_rx);

    // The same source event, observed on two consecutive poll cycles
    let log = contract_call_log("ethereum", DUMMY_CONTRACT_ADDR, [0x33; 32], 100, [0xaa; 32], 2);
    let first = parse_gateway_log("crossfi", &log).unwrap();
    let second = parse_gateway_log("crossfi", &log).unwrap();

    let id = first.command_id();
    assert!(dedup.try_begin(id).await, "first observation claims the id");
    queue
        .sender()
        .send(encode_command(&first).unwrap())
        .await
        .unwrap();

    assert!(
        !dedup.try_begin(second.command_id()).await,
        "second observation must not claim the id"
    );

    queue.close().await;
    assert_eq!(dedup.status_of(id).await, Some(CommandStatus::Confirmed));
    assert_eq!(dedup.confirmed_count().await, 1);
    // MockServer verifies the expect(1) on drop
}

/// Test that a transient broadcast failure is retried to confirmation
/// What is tested: the first eth_sendRawTransaction attempt fails at the
/// transport level, the retry succeeds, and the command ends confirmed
#[tokio::test]
async fn test_transient_broadcast_failure_is_retried() {
    let destination = MockServer::start().await;
    mount_submission_reads(&destination).await;
    mount_receipt(&destination, "0x1").await;

    // First broadcast attempt dies with an empty 500; mounted first so it
    // consumes the first match, then expires
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({"method": "eth_sendRawTransaction"})))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&destination)
        .await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({"method": "eth_sendRawTransaction"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0", "id": 1, "result": tx_hash_result(),
        })))
        .expect(1)
        .mount(&destination)
        .await;

    let client = make_client("ethereum", &destination.uri(), 11155111, 12);
    let dedup = Arc::new(DedupStore::new());
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let queue = SubmissionQueue::spawn(Arc::clone(&client), Arc::clone(&dedup), 3, shutdown_rx);

    let log = contract_call_log("ethereum", DUMMY_CONTRACT_ADDR, [0x33; 32], 100, [0xab; 32], 0);
    let event = parse_gateway_log("crossfi", &log).unwrap();
    let id = event.command_id();

    assert!(dedup.try_begin(id).await);
    queue
        .sender()
        .send(encode_command(&event).unwrap())
        .await
        .unwrap();

    queue.close().await;
    assert_eq!(dedup.status_of(id).await, Some(CommandStatus::Confirmed));
}

/// Test that an on-chain revert is terminal
/// Why: A reverted command is deterministic; blind resubmission would burn
/// gas forever. It must end failed after a single broadcast.
#[tokio::test]
async fn test_reverted_submission_is_terminal() {
    let destination = MockServer::start().await;
    mount_submission_reads(&destination).await;
    mount_receipt(&destination, "0x0").await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({"method": "eth_sendRawTransaction"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0", "id": 1, "result": tx_hash_result(),
        })))
        .expect(1)
        .mount(&destination)
        .await;

    let client = make_client("ethereum", &destination.uri(), 11155111, 12);
    let dedup = Arc::new(DedupStore::new());
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let queue = SubmissionQueue::spawn(Arc::clone(&client), Arc::clone(&dedup), 3, shutdown_rx);

    let log = contract_call_log("ethereum", DUMMY_CONTRACT_ADDR, [0x33; 32], 100, [0xac; 32], 1);
    let event = parse_gateway_log("crossfi", &log).unwrap();
    let id = event.command_id();

    assert!(dedup.try_begin(id).await);
    queue
        .sender()
        .send(encode_command(&event).unwrap())
        .await
        .unwrap();

    queue.close().await;
    assert_eq!(dedup.status_of(id).await, Some(CommandStatus::Failed));
    // Failed commands are never silently re-attempted
    assert!(!dedup.try_begin(id).await);
}

// ============================================================================
// HEALTH MONITOR TESTS
// ============================================================================

/// Test that an unreachable chain degrades the snapshot without hiding the
/// healthy chains
/// Why: Partial failure is the normal operating condition; the snapshot must
/// carry an entry per configured chain either way
#[tokio::test]
async fn test_health_snapshot_reports_unreachable_chain() {
    let reachable = MockServer::start().await;
    mount_rpc(&reachable, "eth_blockNumber", json!("0x64")).await;

    let healthy = make_client("crossfi", &reachable.uri(), 4157, 1);
    // Discard port: connection refused immediately
    let unreachable = make_client("ethereum", "http://127.0.0.1:9", 11155111, 12);

    let dedup = Arc::new(DedupStore::new());
    let monitor = HealthMonitor::new(vec![healthy, unreachable], Arc::clone(&dedup));

    let snapshot = monitor.snapshot().await;
    assert_eq!(snapshot.status, HealthStatus::Degraded);
    assert_eq!(snapshot.chains.len(), 2);
    assert_eq!(snapshot.chains["crossfi"], true);
    assert_eq!(snapshot.chains["ethereum"], false);
    assert_eq!(snapshot.processed_events, 0);
    assert_eq!(snapshot.relayer_address, test_identity().address());
}

/// Test that the snapshot is healthy when every chain answers
#[tokio::test]
async fn test_health_snapshot_all_reachable() {
    let server = MockServer::start().await;
    mount_rpc(&server, "eth_blockNumber", json!("0x64")).await;

    let monitor = HealthMonitor::new(
        vec![make_client("crossfi", &server.uri(), 4157, 1)],
        Arc::new(DedupStore::new()),
    );

    let snapshot = monitor.snapshot().await;
    assert_eq!(snapshot.status, HealthStatus::Healthy);
    assert!(snapshot.chains["crossfi"]);
}
