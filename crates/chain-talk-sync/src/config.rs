//! # Sync Configuration
//!
//! Addressing, window and storage parameters passed to the service constructor.

use crate::domain::{Address, SyncError, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_WINDOW};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Arbitrum One public RPC.
pub const DEFAULT_RPC_URL: &str = "https://arb1.arbitrum.io/rpc";

/// Deployed forum contract.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0xb9A8A83c8e599E19ad2E3E1C66721A63d2076380";

/// Block the forum contract was created in.
pub const DEFAULT_GENESIS_HEIGHT: u64 = 419_912_164;

/// Synchronizer configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Ledger JSON-RPC endpoint.
    pub rpc_url: String,

    /// Contract emitting the events.
    pub contract_address: Address,

    /// First height that can hold events (contract creation block).
    pub genesis_height: u64,

    /// Maximum heights per query window. Sized to the provider's log limits.
    pub max_window: u64,

    /// Directory holding the checkpoint and dataset files.
    pub data_dir: PathBuf,

    /// Step budget for the drive loop.
    pub max_attempts: u32,

    /// Fetch topics and replies of a window concurrently.
    pub concurrent_fetch: bool,

    /// Per-request timeout for the ledger client, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            contract_address: Address::from_str(DEFAULT_CONTRACT_ADDRESS).unwrap_or_default(),
            genesis_height: DEFAULT_GENESIS_HEIGHT,
            max_window: DEFAULT_MAX_WINDOW,
            data_dir: PathBuf::from("./data"),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            concurrent_fetch: false,
            request_timeout_secs: 30,
        }
    }
}

impl SyncConfig {
    /// Create a config for testing (smaller values).
    pub fn for_testing() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contract_address: Address::default(),
            genesis_height: 100,
            max_window: 3600,
            data_dir: PathBuf::from("./target/test-data"),
            max_attempts: 10,
            concurrent_fetch: false,
            request_timeout_secs: 5,
        }
    }

    /// Reject parameters the synchronizer cannot run with.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.rpc_url.trim().is_empty() {
            return Err(SyncError::Configuration("rpc_url is empty".to_string()));
        }
        if self.max_window == 0 {
            return Err(SyncError::Configuration(
                "max_window must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(SyncError::Configuration(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(SyncError::Configuration(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Ledger request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
