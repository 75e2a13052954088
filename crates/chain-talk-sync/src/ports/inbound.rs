//! # Inbound Ports
//!
//! API trait defining what the synchronizer offers its callers (CLI, scheduler).

use crate::domain::{Checkpoint, DriveReport, StepOutcome, SyncError};
use async_trait::async_trait;

/// Ledger sync API - inbound port.
#[async_trait]
pub trait LedgerSyncApi: Send + Sync {
    /// Run one plan → fetch → merge → persist → checkpoint cycle.
    ///
    /// Safe to re-run after any failure: nothing is committed unless the whole
    /// step succeeds.
    async fn sync_step(&mut self) -> Result<StepOutcome, SyncError>;

    /// Run steps until caught up, `max_attempts` steps ran, or a step failed.
    async fn drive(&mut self, max_attempts: u32) -> Result<DriveReport, SyncError>;

    /// Currently committed checkpoint.
    fn checkpoint(&self) -> Checkpoint;
}
