//! # Chain Talk Sync
//!
//! Incremental, crash-safe synchronizer for the forum contract's event log.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Mirror every `TopicCreated` and `ReplyCreated` event emitted by the forum
//! contract into two local JSON datasets, one bounded block window per step:
//! - Plan the next window from the durable checkpoint and the remote head
//! - Fetch and decode both event kinds for that window
//! - Merge by id into the persisted datasets and write them atomically
//! - Advance the checkpoint only after both datasets are written
//!
//! ## Guarantees
//!
//! | Property | Mechanism |
//! |----------|-----------|
//! | No gaps | Windows are contiguous from `genesis` onward |
//! | No duplicates | Merge keyed by `topicId` / `replyId` |
//! | Crash safety | Checkpoint is written last; files are replaced atomically |
//! | Bounded queries | Windows never exceed `max_window` heights |
//!
//! ## Module Structure
//!
//! ```text
//! chain-talk-sync/
//! ├── domain/          # Records, checkpoint, windows, errors, invariants
//! ├── algorithms/      # Range planner, merge, event decoding
//! ├── ports/           # API traits (inbound) + dependency traits (outbound)
//! ├── adapters/        # JSON-RPC ledger client, JSON file and memory stores
//! ├── application/     # LedgerSyncService and the event retriever
//! └── config.rs        # SyncConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{
    FileCheckpointStore, FileDatasetStore, JsonRpcLedgerClient, MemoryCheckpointStore,
    MemoryDatasetStore,
};
pub use algorithms::{decode_reply, decode_topic, merge_records, plan_from_checkpoint, plan_window};
pub use application::{EventRetriever, FetchedEvents, LedgerSyncService};
pub use config::{SyncConfig, DEFAULT_CONTRACT_ADDRESS, DEFAULT_GENESIS_HEIGHT, DEFAULT_RPC_URL};
pub use domain::{
    Address, BlockWindow, Checkpoint, DriveReport, EntityCounters, EventKind, LedgerRecord,
    RangePlan, RawLog, ReplyRecord, RetrievalError, StepOutcome, StepReport, StepState,
    SyncError, TopicRecord, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_WINDOW,
};
pub use ports::{CheckpointStore, DatasetStore, LedgerClient, LedgerSyncApi, MockLedger};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
