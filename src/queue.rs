//! Per-destination submission queue.
//!
//! One worker task per destination chain submits commands strictly
//! one-at-a-time against that chain's signer: the signer's on-chain nonce is
//! a single counter, and concurrent submission causes nonce collisions. This
//! queue is the one hard mutual-exclusion point in the system.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::codec::Command;
use crate::dedup::DedupStore;
use crate::evm_client::ChainClient;
use crate::error::ChainClientError;

const QUEUE_CAPACITY: usize = 256;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// Serialized submission pipeline for one destination chain.
pub struct SubmissionQueue {
    sender: mpsc::Sender<Command>,
    handle: JoinHandle<()>,
}

impl SubmissionQueue {
    /// Spawns the worker task for `client`'s chain.
    pub fn spawn(
        client: Arc<ChainClient>,
        dedup: Arc<DedupStore>,
        max_attempts: u32,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let handle = tokio::spawn(run_worker(client, dedup, receiver, max_attempts, shutdown));
        Self { sender, handle }
    }

    /// Handle used by polling tasks to enqueue commands.
    pub fn sender(&self) -> mpsc::Sender<Command> {
        self.sender.clone()
    }

    /// Closes the queue and waits for the worker to finish its in-flight
    /// submission.
    pub async fn close(self) {
        drop(self.sender);
        let _ = self.handle.await;
    }
}

async fn run_worker(
    client: Arc<ChainClient>,
    dedup: Arc<DedupStore>,
    mut receiver: mpsc::Receiver<Command>,
    max_attempts: u32,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Submission worker started for chain '{}'", client.name());

    loop {
        let command = tokio::select! {
            cmd = receiver.recv() => match cmd {
                Some(cmd) => cmd,
                None => break,
            },
            _ = shutdown.changed() => {
                // Commands still queued stay `pending` in the dedup store and
                // are re-attempted on the next startup.
                break;
            }
        };

        // The in-flight submission always runs to completion; shutdown is
        // only observed between commands.
        submit_with_retry(&client, &dedup, &command, max_attempts).await;
    }

    info!("Submission worker stopped for chain '{}'", client.name());
}

/// Submits one command, retrying transient failures with exponential backoff.
///
/// Reverts are terminal immediately; timeouts and connectivity failures are
/// retried up to `max_attempts` with a fresh nonce each time. Resubmission
/// after a receipt timeout relies on the gateway's replay rejection if the
/// earlier transaction later lands.
async fn submit_with_retry(
    client: &ChainClient,
    dedup: &DedupStore,
    command: &Command,
    max_attempts: u32,
) {
    for attempt in 1..=max_attempts {
        match client.send_signed_tx(&command.payload).await {
            Ok(tx_hash) => {
                dedup.mark_submitted(command.id).await;
                debug!(
                    "{}: command {} broadcast as {} (attempt {})",
                    client.name(),
                    command.id,
                    tx_hash,
                    attempt
                );

                match client.wait_receipt(&tx_hash).await {
                    Ok(()) => {
                        dedup.mark_confirmed(command.id).await;
                        info!(
                            "{}: command {} confirmed in {}",
                            client.name(),
                            command.id,
                            tx_hash
                        );
                        return;
                    }
                    Err(ChainClientError::Reverted { tx_hash }) => {
                        dedup.mark_failed(command.id).await;
                        error!(
                            "{}: command {} reverted in {}; not retried, operator review required",
                            client.name(),
                            command.id,
                            tx_hash
                        );
                        return;
                    }
                    Err(e) => {
                        // Receipt not seen in time: transient, retry with a
                        // refreshed nonce.
                        warn!(
                            "{}: command {} unconfirmed (attempt {}/{}): {}",
                            client.name(),
                            command.id,
                            attempt,
                            max_attempts,
                            e
                        );
                    }
                }
            }
            Err(e) if e.is_transient() => {
                warn!(
                    "{}: broadcast of command {} failed (attempt {}/{}): {}",
                    client.name(),
                    command.id,
                    attempt,
                    max_attempts,
                    e
                );
            }
            Err(e) => {
                // RPC rejections and reverts are deterministic; retrying the
                // identical transaction cannot succeed.
                dedup.mark_failed(command.id).await;
                error!(
                    "{}: command {} rejected: {}",
                    client.name(),
                    command.id,
                    e
                );
                return;
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }

    dedup.mark_failed(command.id).await;
    error!(
        "{}: command {} exhausted {} submission attempts",
        client.name(),
        command.id,
        max_attempts
    );
}

fn backoff_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let delay = RETRY_BASE_DELAY.saturating_mul(1u32 << exp);
    delay.min(RETRY_MAX_DELAY)
}
