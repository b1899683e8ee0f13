//! Relay orchestrator.
//!
//! Runs one polling task per source chain, each cycling
//! fetch-logs -> confirmation gate -> dedup claim -> encode -> enqueue, and
//! one serialized submission worker per destination chain. Source chains are
//! causally independent, so their tasks run in parallel; ordering is only
//! guaranteed within a chain, ascending `(blockNumber, logIndex)`.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::codec::{self, Command};
use crate::config::Config;
use crate::crypto::RelayerIdentity;
use crate::dedup::DedupStore;
use crate::error::RelayError;
use crate::evm_client::ChainClient;
use crate::gate;
use crate::queue::SubmissionQueue;

/// How far behind the finalized head the very first poll cycle starts.
///
/// There is no persisted watermark: on restart the cursor is re-derived from
/// the live chain head, and this lookback bounds how much history is
/// re-examined. The dedup store and the gateway's replay rejection absorb
/// anything re-observed inside the window.
const INITIAL_BLOCK_LOOKBACK: u64 = 50;

/// Cap on the block span of a single `eth_getLogs` query (public RPC limits).
const MAX_LOG_RANGE: u64 = 1000;

/// The relay engine: chain clients, dedup store, and task orchestration.
pub struct Relayer {
    config: Arc<Config>,
    clients: HashMap<String, Arc<ChainClient>>,
    dedup: Arc<DedupStore>,
}

impl Relayer {
    /// Builds one chain client per configured chain, all sharing the relayer
    /// identity.
    pub fn new(config: Config, identity: RelayerIdentity) -> Result<Self> {
        let identity = Arc::new(identity);
        let mut clients = HashMap::new();

        for (name, chain) in &config.chains {
            let client = ChainClient::new(
                name,
                chain,
                Arc::clone(&identity),
                config.relayer.gas_limit,
                config.relayer.rpc_timeout_ms,
            )
            .with_context(|| format!("Failed to create chain client for '{}'", name))?;
            clients.insert(name.clone(), Arc::new(client));
        }

        Ok(Self {
            config: Arc::new(config),
            clients,
            dedup: Arc::new(DedupStore::new()),
        })
    }

    /// Shared dedup store (for the health monitor).
    pub fn dedup(&self) -> Arc<DedupStore> {
        Arc::clone(&self.dedup)
    }

    /// All chain clients, keyed by chain name (for the health monitor).
    pub fn clients(&self) -> Vec<Arc<ChainClient>> {
        self.clients.values().cloned().collect()
    }

    /// Verifies the relayer address is whitelisted on one destination
    /// gateway.
    pub async fn verify_destination(&self, chain_name: &str) -> Result<(), RelayError> {
        let client = self
            .clients
            .get(chain_name)
            .ok_or_else(|| RelayError::UnknownDestinationChain(chain_name.to_string()))?;

        if client.is_relayer_authorized().await? {
            Ok(())
        } else {
            Err(RelayError::NotAuthorized {
                chain: chain_name.to_string(),
                relayer: client.relayer_address().to_string(),
            })
        }
    }

    /// Runs the relay until `shutdown` flips to true.
    ///
    /// Startup verifies the relayer authorization on every destination
    /// gateway; a chain that fails the check gets no submission queue and is
    /// refused until the whitelist is corrected. Shutdown is cooperative: the
    /// polling loops exit at their next suspension point and the submission
    /// workers finish their in-flight command first.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            "Starting relay: {} chains, polling_interval={}ms",
            self.clients.len(),
            self.config.relayer.polling_interval_ms
        );

        // Startup precondition: relayer must be whitelisted per destination.
        let mut queues: HashMap<String, SubmissionQueue> = HashMap::new();
        for name in self.config.destination_chains() {
            match self.verify_destination(name).await {
                Ok(()) => {
                    info!("{}: relayer {} authorized", name, self.clients[name].relayer_address());
                    queues.insert(
                        name.to_string(),
                        SubmissionQueue::spawn(
                            Arc::clone(&self.clients[name]),
                            Arc::clone(&self.dedup),
                            self.config.relayer.max_submission_attempts,
                            shutdown.clone(),
                        ),
                    );
                }
                Err(e) => {
                    // Fatal for this chain only: no submissions until the
                    // whitelist is corrected. Polling other chains continues.
                    error!("{}: submissions disabled: {}", name, e);
                }
            }
        }

        let senders: Arc<HashMap<String, mpsc::Sender<Command>>> = Arc::new(
            queues
                .iter()
                .map(|(name, q)| (name.clone(), q.sender()))
                .collect(),
        );

        // One independent polling task per source chain.
        let mut tasks = Vec::new();
        for name in self.config.source_chains() {
            let client = Arc::clone(&self.clients[name]);
            let dedup = Arc::clone(&self.dedup);
            let senders = Arc::clone(&senders);
            let interval = Duration::from_millis(self.config.relayer.polling_interval_ms);
            let shutdown = shutdown.clone();

            tasks.push(tokio::spawn(poll_source_chain(
                client, dedup, senders, interval, shutdown,
            )));
        }

        for task in tasks {
            let _ = task.await;
        }

        // Drain: let each submission worker finish its in-flight command.
        for (_, queue) in queues {
            queue.close().await;
        }

        info!("Relay stopped");
        Ok(())
    }
}

/// Polling loop for one source chain.
///
/// Connectivity failures back off exponentially (bounded) without killing the
/// loop; the chain shows up as degraded in the health snapshot for as long as
/// its endpoint is unreachable.
async fn poll_source_chain(
    client: Arc<ChainClient>,
    dedup: Arc<DedupStore>,
    senders: Arc<HashMap<String, mpsc::Sender<Command>>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(
        "Polling started for source chain '{}' ({} confirmations)",
        client.name(),
        client.block_confirmations()
    );

    let mut cursor: Option<u64> = None;
    let mut consecutive_failures: u32 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }

        match poll_cycle(&client, &dedup, &senders, &mut cursor).await {
            Ok(()) => consecutive_failures = 0,
            Err(e) => {
                consecutive_failures += 1;
                error!(
                    "Error polling '{}' (failure {}): {}",
                    client.name(),
                    consecutive_failures,
                    e
                );
            }
        }

        let delay = interval.saturating_mul(1u32 << consecutive_failures.min(5));
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }
    }

    info!("Polling stopped for source chain '{}'", client.name());
}

/// One discovery cycle: scan new blocks, gate, claim, encode, enqueue.
async fn poll_cycle(
    client: &ChainClient,
    dedup: &DedupStore,
    senders: &HashMap<String, mpsc::Sender<Command>>,
    cursor: &mut Option<u64>,
) -> Result<(), RelayError> {
    let latest = client.latest_block().await?;
    let confirmations = client.block_confirmations();
    let finalized = gate::finalized_height(latest, confirmations);

    let from_block = match *cursor {
        Some(last_scanned) => last_scanned + 1,
        None => finalized.saturating_sub(INITIAL_BLOCK_LOOKBACK),
    };

    if from_block > latest {
        return Ok(());
    }

    let to_block = from_block.saturating_add(MAX_LOG_RANGE - 1).min(latest);
    let logs = client.get_logs(from_block, to_block).await?;

    let mut events = Vec::with_capacity(logs.len());
    for log in &logs {
        match codec::parse_gateway_log(client.name(), log) {
            Ok(event) => events.push(event),
            Err(e @ RelayError::UnsupportedEventKind(_)) => {
                // Fatal for this event only: surfaced and skipped, never
                // retried. The pipeline continues.
                warn!("{}: skipping log in tx {}: {}", client.name(), log.transaction_hash, e);
            }
            Err(e) => {
                warn!("{}: undecodable gateway log: {}", client.name(), e);
            }
        }
    }

    // Within one source chain, events are processed in ascending
    // (blockNumber, logIndex) order.
    events.sort_by_key(|e| (e.block_number, e.log_index));

    for event in events {
        if !gate::is_final(event.block_number, latest, confirmations) {
            // Deferred, not discarded: the cursor stays below this block, so
            // the event is re-read next cycle.
            debug!(
                "{}: event at block {} deferred ({} of {} confirmations)",
                client.name(),
                event.block_number,
                latest.saturating_sub(event.block_number),
                confirmations
            );
            continue;
        }

        let id = event.command_id();
        if !dedup.try_begin(id).await {
            debug!("{}: duplicate observation of command {}", client.name(), id);
            continue;
        }

        let command = match codec::encode_command(&event) {
            Ok(command) => command,
            Err(e) => {
                warn!("{}: cannot encode command {}: {}", client.name(), id, e);
                dedup.mark_failed(id).await;
                continue;
            }
        };

        match senders.get(&command.destination_chain) {
            Some(sender) => {
                info!(
                    "{}: relaying command {} to '{}' (tx {}, log {})",
                    client.name(),
                    id,
                    command.destination_chain,
                    hex::encode(event.tx_hash),
                    event.log_index
                );
                if sender.send(command).await.is_err() {
                    // Queue closed during shutdown; the command stays pending
                    // for the next startup.
                    warn!("{}: submission queue closed, command {} deferred", client.name(), id);
                }
            }
            None => {
                error!(
                    "{}: command {} targets unknown or disabled destination '{}'",
                    client.name(),
                    id,
                    command.destination_chain
                );
                dedup.mark_failed(id).await;
            }
        }
    }

    // Advance only past the finalized window so deferred events re-enter the
    // scan next cycle.
    let new_cursor = to_block.min(finalized);
    if cursor.map_or(true, |c| new_cursor > c) {
        *cursor = Some(new_cursor);
    }

    Ok(())
}
