//! In-memory checkpoint and dataset stores for tests.

use crate::domain::{Checkpoint, ReplyRecord, SyncError, TopicRecord};
use crate::ports::outbound::{CheckpointStore, DatasetStore};
use chrono::{DateTime, Utc};

/// In-memory checkpoint store for unit tests.
///
/// `fail_saves` makes every save fail without touching the stored value.
#[derive(Debug)]
pub struct MemoryCheckpointStore {
    genesis_height: u64,
    committed: Option<Checkpoint>,
    /// Fail every subsequent save.
    pub fail_saves: bool,
}

impl MemoryCheckpointStore {
    /// Empty store defaulting to `genesis_height - 1`.
    pub fn new(genesis_height: u64) -> Self {
        Self {
            genesis_height,
            committed: None,
            fail_saves: false,
        }
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self) -> Checkpoint {
        self.committed
            .clone()
            .unwrap_or_else(|| Checkpoint::at_genesis(self.genesis_height))
    }

    fn save(&mut self, height: u64, at: DateTime<Utc>) -> Result<(), SyncError> {
        if self.fail_saves {
            return Err(SyncError::persistence("memory://checkpoint", "injected failure"));
        }
        self.committed = Some(Checkpoint::committed(height, at));
        Ok(())
    }
}

/// In-memory dataset store for unit tests.
#[derive(Debug, Default)]
pub struct MemoryDatasetStore {
    /// Persisted topics.
    pub topics: Vec<TopicRecord>,
    /// Persisted replies.
    pub replies: Vec<ReplyRecord>,
    /// Fail every subsequent reply save (topics still succeed).
    pub fail_reply_saves: bool,
}

impl MemoryDatasetStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DatasetStore for MemoryDatasetStore {
    fn load_topics(&self) -> Result<Vec<TopicRecord>, SyncError> {
        Ok(self.topics.clone())
    }

    fn load_replies(&self) -> Result<Vec<ReplyRecord>, SyncError> {
        Ok(self.replies.clone())
    }

    fn save_topics(&mut self, topics: &[TopicRecord]) -> Result<(), SyncError> {
        self.topics = topics.to_vec();
        Ok(())
    }

    fn save_replies(&mut self, replies: &[ReplyRecord]) -> Result<(), SyncError> {
        if self.fail_reply_saves {
            return Err(SyncError::persistence("memory://replies", "injected failure"));
        }
        self.replies = replies.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_checkpoint_default_and_save() {
        let mut store = MemoryCheckpointStore::new(10);
        assert_eq!(store.load().last_synced_height, Some(9));
        store.save(20, Utc::now()).unwrap();
        assert_eq!(store.load().last_synced_height, Some(20));
    }

    #[test]
    fn test_memory_datasets_failed_reply_save_rolls_back_topics() {
        let topic = TopicRecord {
            topic_id: 1,
            author: Default::default(),
            timestamp: 10,
            content: "t".to_string(),
            block_number: 100,
            transaction_hash: "0x01".to_string(),
        };
        let mut store = MemoryDatasetStore::new();
        store.fail_reply_saves = true;

        assert!(store.save_datasets(&[topic], &[]).is_err());
        assert!(store.topics.is_empty());
    }

    #[test]
    fn test_memory_checkpoint_failed_save_keeps_previous() {
        let mut store = MemoryCheckpointStore::new(10);
        store.save(20, Utc::now()).unwrap();
        store.fail_saves = true;
        assert!(store.save(30, Utc::now()).is_err());
        assert_eq!(store.load().last_synced_height, Some(20));
    }
}
