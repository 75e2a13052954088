//! # Outbound Ports
//!
//! Traits for the synchronizer's collaborators: the remote ledger and the two
//! durable stores.

use crate::domain::{
    Checkpoint, EntityCounters, EventKind, RawLog, ReplyRecord, RetrievalError, SyncError,
    TopicRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tracing::warn;

/// Read-only access to the append-only remote ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current head height.
    async fn current_height(&self) -> Result<u64, RetrievalError>;

    /// Timestamp of the block at `height`.
    async fn block_timestamp(&self, height: u64) -> Result<DateTime<Utc>, RetrievalError>;

    /// All logs of `kind` emitted in `[from, to]`, in ledger order.
    ///
    /// Either the full range is returned or an error; never a partial result.
    async fn query_logs(
        &self,
        kind: EventKind,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawLog>, RetrievalError>;

    /// Contract-side id counters, when the ledger can provide them.
    async fn entity_counters(&self) -> Result<Option<EntityCounters>, RetrievalError> {
        Ok(None)
    }

    /// Endpoint identifier (for logging).
    fn endpoint(&self) -> &str;
}

/// Durable singleton checkpoint.
pub trait CheckpointStore: Send + Sync {
    /// Load the committed checkpoint, or the genesis default. Never fails.
    fn load(&self) -> Checkpoint;

    /// Commit `height`. A failed save must leave the previous value readable.
    fn save(&mut self, height: u64, at: DateTime<Utc>) -> Result<(), SyncError>;
}

/// Durable storage for the two record collections.
pub trait DatasetStore: Send + Sync {
    /// Load the persisted topics (empty when none were written yet).
    fn load_topics(&self) -> Result<Vec<TopicRecord>, SyncError>;

    /// Load the persisted replies (empty when none were written yet).
    fn load_replies(&self) -> Result<Vec<ReplyRecord>, SyncError>;

    /// Replace the persisted topics with `topics`.
    fn save_topics(&mut self, topics: &[TopicRecord]) -> Result<(), SyncError>;

    /// Replace the persisted replies with `replies`.
    fn save_replies(&mut self, replies: &[ReplyRecord]) -> Result<(), SyncError>;

    /// Replace both collections as one unit: on error, neither file keeps
    /// the new contents.
    ///
    /// The default writes topics, then replies, and rewrites the previous
    /// topics if the replies write fails.
    fn save_datasets(
        &mut self,
        topics: &[TopicRecord],
        replies: &[ReplyRecord],
    ) -> Result<(), SyncError> {
        let previous_topics = self.load_topics()?;
        self.save_topics(topics)?;
        if let Err(e) = self.save_replies(replies) {
            if let Err(restore) = self.save_topics(&previous_topics) {
                warn!("[sync] ⚠️ Could not restore topics after failed write: {}", restore);
            }
            return Err(e);
        }
        Ok(())
    }
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// In-memory ledger for tests.
pub struct MockLedger {
    /// Endpoint identifier.
    pub id: String,
    tip_height: AtomicU64,
    logs: Mutex<Vec<(EventKind, RawLog)>>,
    should_fail: AtomicBool,
    fail_kind: Mutex<Option<EventKind>>,
    log_queries: AtomicUsize,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self {
            id: "mock-ledger".to_string(),
            tip_height: AtomicU64::new(0),
            logs: Mutex::new(Vec::new()),
            should_fail: AtomicBool::new(false),
            fail_kind: Mutex::new(None),
            log_queries: AtomicUsize::new(0),
        }
    }
}

impl MockLedger {
    /// Mock ledger with head at `height`.
    pub fn at_height(height: u64) -> Self {
        let ledger = Self::default();
        ledger.set_height(height);
        ledger
    }

    /// Move the head.
    pub fn set_height(&self, height: u64) {
        self.tip_height.store(height, Ordering::SeqCst);
    }

    /// Append a log of `kind`.
    pub fn push_log(&self, kind: EventKind, log: RawLog) {
        self.logs.lock().push((kind, log));
    }

    /// Make every call fail with a network error.
    pub fn set_failing(&self, failing: bool) {
        self.should_fail.store(failing, Ordering::SeqCst);
    }

    /// Make `query_logs` fail for one event kind only.
    pub fn fail_kind(&self, kind: Option<EventKind>) {
        *self.fail_kind.lock() = kind;
    }

    /// Number of `query_logs` calls served so far.
    pub fn log_queries(&self) -> usize {
        self.log_queries.load(Ordering::SeqCst)
    }

    fn check_failing(&self) -> Result<(), RetrievalError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(RetrievalError::Network("Mock failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn current_height(&self) -> Result<u64, RetrievalError> {
        self.check_failing()?;
        Ok(self.tip_height.load(Ordering::SeqCst))
    }

    async fn block_timestamp(&self, height: u64) -> Result<DateTime<Utc>, RetrievalError> {
        self.check_failing()?;
        let secs = 1_700_000_000 + (height / 4) as i64;
        Utc.timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| RetrievalError::Decode(format!("bad timestamp {}", secs)))
    }

    async fn query_logs(
        &self,
        kind: EventKind,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawLog>, RetrievalError> {
        self.check_failing()?;
        self.log_queries.fetch_add(1, Ordering::SeqCst);
        if *self.fail_kind.lock() == Some(kind) {
            return Err(RetrievalError::Rpc {
                code: -32005,
                message: format!("Mock failure for {}", kind),
            });
        }

        let mut logs: Vec<RawLog> = self
            .logs
            .lock()
            .iter()
            .filter(|(k, log)| *k == kind && log.block_number >= from && log.block_number <= to)
            .map(|(_, log)| log.clone())
            .collect();
        logs.sort_by_key(|log| log.block_number);
        Ok(logs)
    }

    async fn entity_counters(&self) -> Result<Option<EntityCounters>, RetrievalError> {
        self.check_failing()?;
        let logs = self.logs.lock();
        let count = |kind| logs.iter().filter(|(k, _)| *k == kind).count() as u64;
        Ok(Some(EntityCounters {
            topics: count(EventKind::TopicCreated),
            replies: count(EventKind::ReplyCreated),
        }))
    }

    fn endpoint(&self) -> &str {
        &self.id
    }
}
