//! # Merge Engine
//!
//! Dedup-and-append of freshly fetched records into a persisted collection.
//!
//! Records already present (by key) are skipped, which makes re-applying the
//! same or an overlapping window a no-op. The result is re-sorted in the
//! collection's order.

use crate::domain::LedgerRecord;
use std::collections::HashSet;

/// Merge `incoming` into `existing`.
///
/// Existing records are kept as they are; only incoming records with an unseen
/// key are admitted. Duplicates inside `incoming` are admitted once.
pub fn merge_records<R: LedgerRecord>(existing: Vec<R>, incoming: Vec<R>) -> Vec<R> {
    let mut seen: HashSet<u64> = existing.iter().map(LedgerRecord::key).collect();
    let mut merged = existing;

    for record in incoming {
        if seen.insert(record.key()) {
            merged.push(record);
        }
    }

    merged.sort_by(R::ordering);
    merged
}
