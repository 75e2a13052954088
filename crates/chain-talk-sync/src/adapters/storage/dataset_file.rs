//! JSON file dataset store: `topics.json` and `replies.json`.

use super::atomic::{commit_staged, discard_staged, read_json, stage_json, write_json_atomic};
use crate::domain::{ReplyRecord, SyncError, TopicRecord, REPLIES_FILE, TOPICS_FILE};
use crate::ports::outbound::DatasetStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Topic and reply collections persisted as JSON arrays.
///
/// A missing file reads as an empty collection. A corrupt file is an error:
/// treating it as empty would drop every admitted record on the next write.
pub struct FileDatasetStore {
    topics_path: PathBuf,
    replies_path: PathBuf,
}

impl FileDatasetStore {
    /// Store with `topics.json` and `replies.json` under `data_dir`.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        let dir = data_dir.as_ref();
        Self {
            topics_path: dir.join(TOPICS_FILE),
            replies_path: dir.join(REPLIES_FILE),
        }
    }

    /// Path of the topic collection.
    pub fn topics_path(&self) -> &Path {
        &self.topics_path
    }

    /// Path of the reply collection.
    pub fn replies_path(&self) -> &Path {
        &self.replies_path
    }
}

impl DatasetStore for FileDatasetStore {
    fn load_topics(&self) -> Result<Vec<TopicRecord>, SyncError> {
        Ok(read_json(&self.topics_path)?.unwrap_or_default())
    }

    fn load_replies(&self) -> Result<Vec<ReplyRecord>, SyncError> {
        Ok(read_json(&self.replies_path)?.unwrap_or_default())
    }

    fn save_topics(&mut self, topics: &[TopicRecord]) -> Result<(), SyncError> {
        write_json_atomic(&self.topics_path, topics)?;
        info!(
            "[sync] 💾 Topics saved to {} ({} total)",
            self.topics_path.display(),
            topics.len()
        );
        Ok(())
    }

    fn save_replies(&mut self, replies: &[ReplyRecord]) -> Result<(), SyncError> {
        write_json_atomic(&self.replies_path, replies)?;
        info!(
            "[sync] 💾 Replies saved to {} ({} total)",
            self.replies_path.display(),
            replies.len()
        );
        Ok(())
    }

    /// Stages both files before renaming either. If the replies rename
    /// fails after topics landed, the previous topics file is put back.
    fn save_datasets(
        &mut self,
        topics: &[TopicRecord],
        replies: &[ReplyRecord],
    ) -> Result<(), SyncError> {
        let previous_topics: Option<Vec<TopicRecord>> = read_json(&self.topics_path)?;

        let staged_topics = stage_json(&self.topics_path, topics)?;
        let staged_replies = match stage_json(&self.replies_path, replies) {
            Ok(staged) => staged,
            Err(e) => {
                discard_staged(&staged_topics);
                return Err(e);
            }
        };

        if let Err(e) = commit_staged(&staged_topics, &self.topics_path) {
            discard_staged(&staged_topics);
            discard_staged(&staged_replies);
            return Err(e);
        }
        if let Err(e) = commit_staged(&staged_replies, &self.replies_path) {
            discard_staged(&staged_replies);
            self.restore_topics(previous_topics.as_deref());
            return Err(e);
        }

        info!(
            "[sync] 💾 Datasets saved to {} ({} topics, {} replies)",
            self.topics_path.parent().unwrap_or(&self.topics_path).display(),
            topics.len(),
            replies.len()
        );
        Ok(())
    }
}

impl FileDatasetStore {
    fn restore_topics(&self, previous: Option<&[TopicRecord]>) {
        let result = match previous {
            Some(topics) => write_json_atomic(&self.topics_path, topics),
            None => fs::remove_file(&self.topics_path)
                .map_err(|e| SyncError::persistence(&self.topics_path, e)),
        };
        if let Err(e) = result {
            warn!("[sync] ⚠️ Could not restore {}: {}", self.topics_path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Address;
    use std::fs;

    fn topic(id: u64) -> TopicRecord {
        TopicRecord {
            topic_id: id,
            author: Address::default(),
            timestamp: 1_000 + id,
            content: format!("topic {}", id),
            block_number: 10 + id,
            transaction_hash: format!("0x{:064x}", id),
        }
    }

    #[test]
    fn test_empty_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDatasetStore::new(dir.path());
        assert!(store.load_topics().unwrap().is_empty());
        assert!(store.load_replies().unwrap().is_empty());
    }

    #[test]
    fn test_roundtrip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileDatasetStore::new(dir.path());
        let topics = vec![topic(3), topic(1), topic(2)];

        store.save_topics(&topics).unwrap();
        assert_eq!(store.load_topics().unwrap(), topics);
    }

    #[test]
    fn test_numbers_written_as_strings() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileDatasetStore::new(dir.path());
        store.save_topics(&[topic(1)]).unwrap();

        let raw = fs::read_to_string(store.topics_path()).unwrap();
        assert!(raw.contains("\"topicId\": \"1\""));
        assert!(raw.contains("\"blockNumber\": \"11\""));
    }

    fn reply(id: u64) -> ReplyRecord {
        ReplyRecord {
            reply_id: id,
            topic_id: 1,
            author: Address::default(),
            timestamp: 2_000 + id,
            content: format!("reply {}", id),
            block_number: 20 + id,
            transaction_hash: format!("0x{:064x}", id),
        }
    }

    #[test]
    fn test_save_datasets_writes_both() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileDatasetStore::new(dir.path().join("data"));
        store.save_datasets(&[topic(1)], &[reply(1)]).unwrap();

        assert_eq!(store.load_topics().unwrap(), vec![topic(1)]);
        assert_eq!(store.load_replies().unwrap(), vec![reply(1)]);
        assert!(!store.topics_path().with_extension("tmp").exists());
        assert!(!store.replies_path().with_extension("tmp").exists());
    }

    #[test]
    fn test_failed_replies_write_keeps_topics() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileDatasetStore::new(dir.path());
        store.save_datasets(&[topic(1)], &[reply(1)]).unwrap();
        let topics_before = fs::read(store.topics_path()).unwrap();

        // A directory where the replies temp file goes makes staging fail.
        fs::create_dir(store.replies_path().with_extension("tmp")).unwrap();
        let result = store.save_datasets(&[topic(1), topic(2)], &[reply(1), reply(2)]);

        assert!(matches!(result, Err(SyncError::Persistence { .. })));
        assert_eq!(fs::read(store.topics_path()).unwrap(), topics_before);
        assert_eq!(store.load_replies().unwrap(), vec![reply(1)]);
        assert!(!store.topics_path().with_extension("tmp").exists());
    }

    #[test]
    fn test_failed_first_write_creates_no_topics_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileDatasetStore::new(dir.path());
        fs::create_dir(store.replies_path().with_extension("tmp")).unwrap();

        assert!(store.save_datasets(&[topic(1)], &[reply(1)]).is_err());
        assert!(!store.topics_path().exists());
    }

    #[test]
    fn test_corrupt_dataset_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDatasetStore::new(dir.path());
        fs::write(store.replies_path(), "[{").unwrap();
        assert!(matches!(
            store.load_replies(),
            Err(SyncError::Persistence { .. })
        ));
    }
}
