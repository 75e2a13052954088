//! # Algorithms Module
//!
//! Pure functions behind the sync step: window planning, log decoding and merging.

pub mod event_decoder;
pub mod merge;
pub mod range_planner;

pub use event_decoder::{decode_reply, decode_topic, encode_body, u64_word};
pub use merge::merge_records;
pub use range_planner::{plan_from_checkpoint, plan_window};
