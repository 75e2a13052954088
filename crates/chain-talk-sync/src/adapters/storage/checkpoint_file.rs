//! JSON file checkpoint store: `fetch-state.json`.

use super::atomic::{read_json, write_json_atomic};
use crate::domain::{Checkpoint, SyncError, CHECKPOINT_FILE};
use crate::ports::outbound::CheckpointStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// On-disk shape of the checkpoint file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchState {
    last_fetched_block: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_update_time: Option<DateTime<Utc>>,
}

/// Checkpoint persisted as `fetch-state.json` in the data directory.
pub struct FileCheckpointStore {
    path: PathBuf,
    genesis_height: u64,
}

impl FileCheckpointStore {
    /// Store under `data_dir`, defaulting to `genesis_height - 1` when empty.
    pub fn new<P: AsRef<Path>>(data_dir: P, genesis_height: u64) -> Self {
        Self {
            path: data_dir.as_ref().join(CHECKPOINT_FILE),
            genesis_height,
        }
    }

    /// Path of the checkpoint file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Checkpoint {
        match read_json::<FetchState>(&self.path) {
            Ok(Some(state)) => Checkpoint {
                last_synced_height: Some(state.last_fetched_block),
                updated_at: state.last_update_time,
            },
            Ok(None) => {
                info!(
                    "[sync] No checkpoint at {}, starting from genesis {}",
                    self.path.display(),
                    self.genesis_height
                );
                Checkpoint::at_genesis(self.genesis_height)
            }
            Err(e) => {
                warn!("[sync] ⚠️ Unreadable checkpoint, using genesis default: {}", e);
                Checkpoint::at_genesis(self.genesis_height)
            }
        }
    }

    fn save(&mut self, height: u64, at: DateTime<Utc>) -> Result<(), SyncError> {
        let state = FetchState {
            last_fetched_block: height,
            last_update_time: Some(at),
        };
        write_json_atomic(&self.path, &state)?;
        info!(
            "[sync] 📝 Checkpoint updated: lastFetchedBlock={}, updateTime={}",
            height,
            at.to_rfc3339()
        );
        Ok(())
    }
}
