//! # Domain Module
//!
//! Core types for the ledger synchronizer: records, checkpoint, windows and errors.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use value_objects::*;
