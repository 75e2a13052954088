//! # Domain Invariants
//!
//! Rules that must hold after every committed step.

use super::entities::LedgerRecord;
use super::value_objects::BlockWindow;
use std::collections::HashSet;

/// Default blocks per query window (about 1.5h of Arbitrum blocks).
pub const DEFAULT_MAX_WINDOW: u64 = 3600;

/// Default attempt budget for the drive loop.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// Checkpoint file name inside the data directory.
pub const CHECKPOINT_FILE: &str = "fetch-state.json";

/// Topic dataset file name inside the data directory.
pub const TOPICS_FILE: &str = "topics.json";

/// Reply dataset file name inside the data directory.
pub const REPLIES_FILE: &str = "replies.json";

/// Invariant: every key appears at most once in a collection.
pub fn invariant_unique_keys<R: LedgerRecord>(records: &[R]) -> bool {
    let mut seen = HashSet::with_capacity(records.len());
    records.iter().all(|r| seen.insert(r.key()))
}

/// Invariant: a collection is in its kind-specific order.
pub fn invariant_sorted<R: LedgerRecord>(records: &[R]) -> bool {
    records
        .windows(2)
        .all(|w| R::ordering(&w[0], &w[1]) != std::cmp::Ordering::Greater)
}

/// Invariant: a checkpoint never moves backwards.
pub fn invariant_checkpoint_monotonic(previous: Option<u64>, next: u64) -> bool {
    previous.map_or(true, |p| next >= p)
}

/// Invariant: a window is non-empty and no wider than `max_window`.
pub fn invariant_window_bounded(window: &BlockWindow, max_window: u64) -> bool {
    window.from <= window.to && window.to - window.from < max_window
}
