//! Storage adapters: JSON files for production, memory for tests.

pub mod atomic;
pub mod checkpoint_file;
pub mod dataset_file;
pub mod memory;

pub use checkpoint_file::FileCheckpointStore;
pub use dataset_file::FileDatasetStore;
pub use memory::{MemoryCheckpointStore, MemoryDatasetStore};
