//! Chain-Talk Fetch: command-line driver for the ledger event synchronizer.
//!
//! Configuration is layered: built-in defaults, then `CT_*` environment
//! variables, then command-line flags.
//!
//! ```text
//! chain-talk-fetch step              # sync one window
//! chain-talk-fetch all --max-attempts 50
//! chain-talk-fetch status            # local checkpoint and dataset sizes
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chain_talk_sync::{
    Address, CheckpointStore, DatasetStore, FileCheckpointStore, FileDatasetStore,
    JsonRpcLedgerClient, LedgerSyncApi, LedgerSyncService, StepOutcome, SyncConfig,
};

/// Chain-Talk Fetch: mirror forum contract events into local JSON datasets
#[derive(Parser, Debug)]
#[command(name = "chain-talk-fetch", version)]
#[command(about = "Incrementally sync forum topics and replies from the ledger")]
struct Args {
    /// Ledger JSON-RPC endpoint (overrides CT_RPC_URL)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Forum contract address (overrides CT_CONTRACT_ADDRESS)
    #[arg(long, global = true)]
    contract: Option<String>,

    /// Contract creation height (overrides CT_GENESIS_HEIGHT)
    #[arg(long, global = true)]
    genesis_height: Option<u64>,

    /// Maximum heights per query window (overrides CT_MAX_WINDOW)
    #[arg(long, global = true)]
    max_window: Option<u64>,

    /// Directory for the checkpoint and dataset files (overrides CT_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Fetch topics and replies of a window concurrently
    #[arg(long, global = true)]
    concurrent: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync a single window and exit
    Step,
    /// Sync windows until caught up or the attempt budget runs out
    All {
        /// Maximum number of steps
        #[arg(long)]
        max_attempts: Option<u32>,
    },
    /// Print the local checkpoint and dataset sizes
    Status,
}

/// Parse an environment override, warning on values that do not parse.
fn env_override<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparsable {}={}", key, raw);
            None
        }
    }
}

/// Load configuration from environment and flags.
fn load_config(args: &Args) -> Result<SyncConfig> {
    let mut config = SyncConfig::default();

    if let Ok(url) = std::env::var("CT_RPC_URL") {
        config.rpc_url = url;
    }
    if let Some(address) = env_override::<Address>("CT_CONTRACT_ADDRESS") {
        config.contract_address = address;
    }
    if let Some(height) = env_override("CT_GENESIS_HEIGHT") {
        config.genesis_height = height;
    }
    if let Some(window) = env_override("CT_MAX_WINDOW") {
        config.max_window = window;
    }
    if let Ok(dir) = std::env::var("CT_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }

    if let Some(url) = &args.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(contract) = &args.contract {
        config.contract_address = Address::from_str(contract)
            .map_err(|e| anyhow::anyhow!("invalid --contract {}: {}", contract, e))?;
    }
    if let Some(height) = args.genesis_height {
        config.genesis_height = height;
    }
    if let Some(window) = args.max_window {
        config.max_window = window;
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if args.concurrent {
        config.concurrent_fetch = true;
    }
    if let Command::All {
        max_attempts: Some(attempts),
    } = args.command
    {
        config.max_attempts = attempts;
    }

    config.validate()?;
    Ok(config)
}

fn print_status(config: &SyncConfig) -> Result<()> {
    let checkpoints = FileCheckpointStore::new(&config.data_dir, config.genesis_height);
    let datasets = FileDatasetStore::new(&config.data_dir);
    let checkpoint = checkpoints.load();
    let topics = datasets.load_topics()?;
    let replies = datasets.load_replies()?;

    match checkpoint.last_synced_height {
        Some(height) => info!("Last synced height: {}", height),
        None => info!("Last synced height: none"),
    }
    if let Some(at) = checkpoint.updated_at {
        info!("Last update: {}", at.to_rfc3339());
    }
    info!("Topics: {} ({})", topics.len(), datasets.topics_path().display());
    info!("Replies: {} ({})", replies.len(), datasets.replies_path().display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = load_config(&args).context("invalid configuration")?;

    info!("===========================================");
    info!("  Chain-Talk Fetch v{}", chain_talk_sync::VERSION);
    info!("  Contract: {}", config.contract_address);
    info!("  Data dir: {}", config.data_dir.display());
    info!("===========================================");

    if let Command::Status = args.command {
        return print_status(&config);
    }

    let ledger = JsonRpcLedgerClient::new(
        config.rpc_url.clone(),
        config.contract_address,
        config.request_timeout(),
    )
    .context("failed to create ledger client")?;
    let checkpoints = FileCheckpointStore::new(&config.data_dir, config.genesis_height);
    let datasets = FileDatasetStore::new(&config.data_dir);
    let max_attempts = config.max_attempts;
    let mut service = LedgerSyncService::new(config, Arc::new(ledger), checkpoints, datasets)?;

    match args.command {
        Command::Step => match service.sync_step().await.context("sync step failed")? {
            StepOutcome::CaughtUp { remote_height } => {
                info!("Nothing to sync, already at height {}", remote_height);
            }
            StepOutcome::Advanced(report) => {
                info!(
                    "Synced {}: {} topics, {} replies in dataset",
                    report.window, report.total_topics, report.total_replies
                );
            }
        },
        Command::All { .. } => {
            let report = service
                .drive(max_attempts)
                .await
                .context("sync run failed")?;
            info!(
                "{} step(s), {} window(s), +{} topics, +{} replies",
                report.attempts, report.windows_synced, report.topics_added, report.replies_added
            );
            if report.budget_exhausted {
                warn!("Attempt budget exhausted before reaching the remote head");
            }
        }
        Command::Status => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "chain-talk-fetch",
            "--max-window",
            "100",
            "--data-dir",
            "/tmp/ct",
            "all",
            "--max-attempts",
            "7",
        ]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.max_window, 100);
        assert_eq!(config.max_attempts, 7);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/ct"));
    }

    #[test]
    fn test_invalid_contract_rejected() {
        let args = Args::parse_from(["chain-talk-fetch", "--contract", "0x1234", "step"]);
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_zero_window_rejected() {
        let args = Args::parse_from(["chain-talk-fetch", "--max-window", "0", "step"]);
        assert!(load_config(&args).is_err());
    }
}
