//! Confirmation gating.
//!
//! Pure finality arithmetic: an event is acted upon only once enough blocks
//! have been mined on top of it. Events below the threshold are deferred to
//! the next poll cycle, never discarded.

/// Whether an event observed at `event_block` is final given the chain head
/// `latest_block` and the chain's required confirmation depth.
pub fn is_final(event_block: u64, latest_block: u64, required_confirmations: u64) -> bool {
    latest_block.saturating_sub(event_block) >= required_confirmations
}

/// The highest block number considered final at head `latest_block`.
///
/// The orchestrator's scan cursor only advances past this height so that
/// deferred events are re-read on the next cycle.
pub fn finalized_height(latest_block: u64, required_confirmations: u64) -> u64 {
    latest_block.saturating_sub(required_confirmations)
}
