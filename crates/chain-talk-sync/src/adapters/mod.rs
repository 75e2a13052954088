//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound ports: JSON-RPC ledger access and file/memory stores.

mod json_rpc;
pub mod storage;

pub use json_rpc::{parse_quantity, JsonRpcLedgerClient};
pub use storage::{FileCheckpointStore, FileDatasetStore, MemoryCheckpointStore, MemoryDatasetStore};
