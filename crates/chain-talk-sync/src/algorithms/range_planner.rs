//! # Range Planner
//!
//! Computes the next bounded query window from the checkpoint and the remote
//! height. The window size is fixed; it is never resized on provider errors.

use crate::domain::{BlockWindow, Checkpoint, RangePlan};

/// Plan the next window.
///
/// `from = max(genesis, last_synced + 1)`, `to = min(remote, from + max_window - 1)`.
/// Returns [`RangePlan::Exhausted`] when `from > remote`.
///
/// `max_window` must be non-zero; a zero window is treated as one block.
pub fn plan_window(
    last_synced: Option<u64>,
    remote_height: u64,
    genesis_height: u64,
    max_window: u64,
) -> RangePlan {
    let checkpoint = Checkpoint {
        last_synced_height: last_synced,
        updated_at: None,
    };
    plan_from_checkpoint(&checkpoint, remote_height, genesis_height, max_window)
}

/// Plan the next window from a loaded checkpoint.
pub fn plan_from_checkpoint(
    checkpoint: &Checkpoint,
    remote_height: u64,
    genesis_height: u64,
    max_window: u64,
) -> RangePlan {
    let from = checkpoint.next_height().max(genesis_height);

    if from > remote_height {
        return RangePlan::Exhausted;
    }

    let span = max_window.max(1) - 1;
    let to = remote_height.min(from.saturating_add(span));

    RangePlan::Window(BlockWindow { from, to })
}
