//! # Ledger Sync Service
//!
//! Application service driving the plan → fetch → merge → persist → checkpoint
//! cycle over the outbound ports.
//!
//! The checkpoint is the commit point. Datasets are written before it, so a
//! crash anywhere in a step leaves the checkpoint behind the data and the next
//! run re-fetches the same window; merge-by-key absorbs the overlap.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::algorithms::{merge_records, plan_from_checkpoint};
use crate::application::retriever::EventRetriever;
use crate::config::SyncConfig;
use crate::domain::{
    invariant_checkpoint_monotonic, invariant_sorted, invariant_unique_keys,
    invariant_window_bounded, BlockWindow, Checkpoint, DriveReport, RangePlan, StepOutcome,
    StepReport, StepState, SyncError,
};
use crate::ports::{CheckpointStore, DatasetStore, LedgerClient, LedgerSyncApi};

/// Ledger Sync Service - incremental, crash-safe event synchronizer.
pub struct LedgerSyncService<L: LedgerClient, C: CheckpointStore, D: DatasetStore> {
    /// Configuration.
    config: SyncConfig,
    /// Remote ledger.
    ledger: Arc<L>,
    /// Per-window fetcher.
    retriever: EventRetriever<L>,
    /// Commit point.
    checkpoints: C,
    /// Topic and reply collections.
    datasets: D,
}

impl<L: LedgerClient, C: CheckpointStore, D: DatasetStore> LedgerSyncService<L, C, D> {
    /// Create a new service. Fails on an unusable configuration.
    pub fn new(
        config: SyncConfig,
        ledger: Arc<L>,
        checkpoints: C,
        datasets: D,
    ) -> Result<Self, SyncError> {
        config.validate()?;
        let retriever = EventRetriever::new(ledger.clone(), config.concurrent_fetch);
        Ok(Self {
            config,
            ledger,
            retriever,
            checkpoints,
            datasets,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Checkpoint store.
    pub fn checkpoint_store(&self) -> &C {
        &self.checkpoints
    }

    /// Mutable checkpoint store.
    pub fn checkpoint_store_mut(&mut self) -> &mut C {
        &mut self.checkpoints
    }

    /// Dataset store.
    pub fn dataset_store(&self) -> &D {
        &self.datasets
    }

    /// Mutable dataset store.
    pub fn dataset_store_mut(&mut self) -> &mut D {
        &mut self.datasets
    }

    /// Tear the service down into its stores.
    pub fn into_parts(self) -> (C, D) {
        (self.checkpoints, self.datasets)
    }

    /// Log the wall-clock span covered by `window`.
    async fn log_time_range(&self, window: BlockWindow) -> Result<(), SyncError> {
        let from = self.ledger.block_timestamp(window.from).await?;
        let to = self.ledger.block_timestamp(window.to).await?;
        info!(
            "[sync] 🕐 Block time range: {} to {}",
            from.to_rfc3339(),
            to.to_rfc3339()
        );
        Ok(())
    }

    /// Log the contract's id counters. Informational only.
    async fn log_counters(&self) {
        match self.ledger.entity_counters().await {
            Ok(Some(counters)) => info!(
                "[sync] 📊 Contract counters: {} topics, {} replies",
                counters.topics, counters.replies
            ),
            Ok(None) => debug!("[sync] Ledger exposes no counters"),
            Err(e) => warn!("[sync] ⚠️ Could not read contract counters: {}", e),
        }
    }

    /// Body of a step once the window is known. Returns the step report.
    async fn sync_window(
        &mut self,
        window: BlockWindow,
        remote_height: u64,
        state: &mut StepState,
    ) -> Result<StepReport, SyncError> {
        self.log_time_range(window).await?;
        self.log_counters().await;

        let fetched = self.retriever.fetch_all(window).await?;
        *state = StepState::Fetched;
        debug!("[sync] Step state: {}", state);

        let existing_topics = self.datasets.load_topics()?;
        let existing_replies = self.datasets.load_replies()?;
        let (topics_before, replies_before) = (existing_topics.len(), existing_replies.len());
        let topics_fetched = fetched.topics.len();
        let replies_fetched = fetched.replies.len();

        let topics = merge_records(existing_topics, fetched.topics);
        let replies = merge_records(existing_replies, fetched.replies);
        debug_assert!(invariant_unique_keys(&topics) && invariant_sorted(&topics));
        debug_assert!(invariant_unique_keys(&replies) && invariant_sorted(&replies));
        *state = StepState::Merged;
        debug!("[sync] Step state: {}", state);

        self.datasets.save_datasets(&topics, &replies)?;
        *state = StepState::Persisted;
        debug!("[sync] Step state: {}", state);

        self.checkpoints.save(window.to, Utc::now())?;
        *state = StepState::CheckpointAdvanced;
        debug!("[sync] Step state: {}", state);

        Ok(StepReport {
            window,
            remote_height,
            topics_fetched,
            replies_fetched,
            topics_added: topics.len() - topics_before,
            replies_added: replies.len() - replies_before,
            total_topics: topics.len(),
            total_replies: replies.len(),
        })
    }
}

#[async_trait]
impl<L, C, D> LedgerSyncApi for LedgerSyncService<L, C, D>
where
    L: LedgerClient + 'static,
    C: CheckpointStore,
    D: DatasetStore,
{
    async fn sync_step(&mut self) -> Result<StepOutcome, SyncError> {
        let mut state = StepState::Start;
        debug!("[sync] Step state: {}", state);

        let remote_height = self.ledger.current_height().await?;
        let checkpoint = self.checkpoints.load();
        info!(
            "[sync] 🔗 {} at height {}, checkpoint {:?}",
            self.ledger.endpoint(),
            remote_height,
            checkpoint.last_synced_height
        );

        let window = match plan_from_checkpoint(
            &checkpoint,
            remote_height,
            self.config.genesis_height,
            self.config.max_window,
        ) {
            RangePlan::Exhausted => {
                info!("[sync] 🎉 Already caught up at height {}", remote_height);
                return Ok(StepOutcome::CaughtUp { remote_height });
            }
            RangePlan::Window(window) => window,
        };
        debug_assert!(invariant_window_bounded(&window, self.config.max_window));
        debug_assert!(invariant_checkpoint_monotonic(
            checkpoint.last_synced_height,
            window.to
        ));
        state = StepState::Planned;
        debug!("[sync] Step state: {}", state);
        info!(
            "[sync] 📦 Syncing window {} ({} heights)",
            window,
            window.len()
        );

        let report = match self
            .sync_window(window, remote_height, &mut state)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                error!("[sync] ❌ Step failed after state '{}': {}", state, e);
                return Err(e);
            }
        };

        info!(
            "[sync] ✅ Window {} synced: +{} topics, +{} replies ({} / {} total)",
            window,
            report.topics_added,
            report.replies_added,
            report.total_topics,
            report.total_replies
        );
        if report.reached_head() {
            info!("[sync] 🎉 Caught up with remote height {}", remote_height);
        } else {
            info!(
                "[sync] ⏭️ More history remains: next step starts at {} ({} heights behind)",
                window.to + 1,
                remote_height - window.to
            );
        }

        Ok(StepOutcome::Advanced(report))
    }

    async fn drive(&mut self, max_attempts: u32) -> Result<DriveReport, SyncError> {
        let mut report = DriveReport::default();

        while report.attempts < max_attempts {
            report.attempts += 1;
            debug!("[sync] Drive attempt {}/{}", report.attempts, max_attempts);

            let outcome = self.sync_step().await?;
            if let StepOutcome::Advanced(step) = &outcome {
                report.windows_synced += 1;
                report.topics_added += step.topics_added;
                report.replies_added += step.replies_added;
                report.last_synced_height = Some(step.window.to);
            }
            if outcome.is_caught_up() {
                info!(
                    "[sync] 🏁 Drive finished after {} step(s), {} window(s) synced",
                    report.attempts, report.windows_synced
                );
                return Ok(report);
            }
        }

        report.budget_exhausted = true;
        warn!(
            "[sync] ⚠️ Stopped after {} step(s) without catching up; run again to continue",
            report.attempts
        );
        Ok(report)
    }

    fn checkpoint(&self) -> Checkpoint {
        self.checkpoints.load()
    }
}
