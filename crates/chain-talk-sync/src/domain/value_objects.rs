//! # Domain Value Objects
//!
//! Immutable value types shared by the planner, retriever and stores.

use chrono::{DateTime, Utc};
use primitive_types::{H160, H256};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// 20-byte account address.
///
/// Displays and serializes in EIP-55 mixed-case checksum form; parses any case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub H160);

impl Address {
    /// Address from the low 20 bytes of a 32-byte ABI word (indexed topic).
    pub fn from_word(word: &H256) -> Self {
        Address(H160::from_slice(&word.as_bytes()[12..]))
    }

    /// Lowercase `0x`-prefixed hex.
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0.as_bytes()))
    }

    /// EIP-55 checksummed hex.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0.as_bytes());
        let hash = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s.strip_prefix("0x").unwrap_or(s);
        if hex_part.len() != 40 {
            return Err(format!("invalid address length: {}", s));
        }
        let bytes = hex::decode(hex_part).map_err(|e| format!("invalid address {}: {}", s, e))?;
        Ok(Address(H160::from_slice(&bytes)))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(de::Error::custom)
    }
}

/// The two contract events the synchronizer materializes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `TopicCreated(uint256 indexed topicId, address indexed author, uint256 timestamp, string content)`
    TopicCreated,
    /// `ReplyCreated(uint256 indexed replyId, uint256 indexed topicId, address indexed author, uint256 timestamp, string content)`
    ReplyCreated,
}

impl EventKind {
    /// Canonical ABI signature.
    pub fn signature(&self) -> &'static str {
        match self {
            EventKind::TopicCreated => "TopicCreated(uint256,address,uint256,string)",
            EventKind::ReplyCreated => "ReplyCreated(uint256,uint256,address,uint256,string)",
        }
    }

    /// Log topic0 selecting this event.
    pub fn topic0(&self) -> H256 {
        H256::from(keccak256(self.signature().as_bytes()))
    }

    /// Number of indexed parameters (topics after topic0).
    pub fn indexed_count(&self) -> usize {
        match self {
            EventKind::TopicCreated => 2,
            EventKind::ReplyCreated => 3,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::TopicCreated => f.write_str("TopicCreated"),
            EventKind::ReplyCreated => f.write_str("ReplyCreated"),
        }
    }
}

/// Raw log entry as returned by the ledger, before ABI decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawLog {
    /// topic0 (event selector) followed by indexed parameters.
    pub topics: Vec<H256>,
    /// ABI-encoded non-indexed parameters.
    pub data: Vec<u8>,
    /// Height of the block containing the log.
    pub block_number: u64,
    /// Transaction that emitted the log.
    pub transaction_hash: H256,
}

/// Inclusive, non-empty range of block heights.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockWindow {
    /// First height in the window.
    pub from: u64,
    /// Last height in the window (inclusive).
    pub to: u64,
}

impl BlockWindow {
    /// Number of heights covered.
    pub fn len(&self) -> u64 {
        self.to - self.from + 1
    }

    /// Always false; a planned window holds at least one height.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for BlockWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// Result of range planning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangePlan {
    /// Next window to query.
    Window(BlockWindow),
    /// Nothing new past the checkpoint.
    Exhausted,
}

/// Durable marker of the highest fully synchronized height.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Checkpoint {
    /// Highest synced height; `None` before anything was synced at genesis 0.
    pub last_synced_height: Option<u64>,
    /// When the checkpoint was last committed.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Checkpoint {
    /// Default checkpoint for a fresh dataset: `genesis - 1`.
    pub fn at_genesis(genesis_height: u64) -> Self {
        Self {
            last_synced_height: genesis_height.checked_sub(1),
            updated_at: None,
        }
    }

    /// Committed checkpoint at `height`.
    pub fn committed(height: u64, at: DateTime<Utc>) -> Self {
        Self {
            last_synced_height: Some(height),
            updated_at: Some(at),
        }
    }

    /// Height the next window starts from, before clamping to genesis.
    pub fn next_height(&self) -> u64 {
        self.last_synced_height.map_or(0, |h| h.saturating_add(1))
    }
}

/// Counter values exposed by the forum contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityCounters {
    /// `getTopicIdCounter()`
    pub topics: u64,
    /// `getReplyIdCounter()`
    pub replies: u64,
}

/// Position of a sync step in its state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepState {
    /// Nothing done yet.
    Start,
    /// Window planned.
    Planned,
    /// Both event kinds fetched.
    Fetched,
    /// Datasets merged in memory.
    Merged,
    /// Datasets written.
    Persisted,
    /// Checkpoint saved; terminal success.
    CheckpointAdvanced,
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepState::Start => "start",
            StepState::Planned => "planned",
            StepState::Fetched => "fetched",
            StepState::Merged => "merged",
            StepState::Persisted => "persisted",
            StepState::CheckpointAdvanced => "checkpoint-advanced",
        };
        f.write_str(name)
    }
}

/// Summary of a step that synchronized a window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepReport {
    /// Window that was synchronized.
    pub window: BlockWindow,
    /// Remote height observed at the start of the step.
    pub remote_height: u64,
    /// Topic events retrieved in the window.
    pub topics_fetched: usize,
    /// Reply events retrieved in the window.
    pub replies_fetched: usize,
    /// Topics newly admitted (not already present).
    pub topics_added: usize,
    /// Replies newly admitted (not already present).
    pub replies_added: usize,
    /// Topic dataset size after the write.
    pub total_topics: usize,
    /// Reply dataset size after the write.
    pub total_replies: usize,
}

impl StepReport {
    /// Whether this window reached the observed remote height.
    pub fn reached_head(&self) -> bool {
        self.window.to >= self.remote_height
    }
}

/// Outcome of one sync step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Plan exhausted: nothing new past the checkpoint.
    CaughtUp {
        /// Remote height observed.
        remote_height: u64,
    },
    /// A window was synchronized and the checkpoint advanced.
    Advanced(StepReport),
}

impl StepOutcome {
    /// Whether the remote height has been fully consumed.
    pub fn is_caught_up(&self) -> bool {
        match self {
            StepOutcome::CaughtUp { .. } => true,
            StepOutcome::Advanced(report) => report.reached_head(),
        }
    }
}

/// Summary of a drive loop run.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct DriveReport {
    /// Steps executed.
    pub attempts: u32,
    /// Windows synchronized.
    pub windows_synced: u32,
    /// Topics admitted across all steps.
    pub topics_added: usize,
    /// Replies admitted across all steps.
    pub replies_added: usize,
    /// True when the loop stopped on the attempt budget instead of catching up.
    pub budget_exhausted: bool,
    /// Checkpoint height after the last step, if any step advanced it.
    pub last_synced_height: Option<u64>,
}
