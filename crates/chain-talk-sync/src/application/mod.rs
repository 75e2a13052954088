//! # Application Module
//!
//! Application services orchestrating the domain and outbound ports.

pub mod retriever;
pub mod service;

pub use retriever::{EventRetriever, FetchedEvents};
pub use service::LedgerSyncService;
