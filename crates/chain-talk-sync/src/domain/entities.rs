//! # Domain Entities
//!
//! Topic and reply records materialized from contract events. Records are
//! created once when first observed and never changed afterwards.
//!
//! Numeric fields are serialized as decimal strings so consumers reading the
//! JSON files never lose precision.

use super::value_objects::Address;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::cmp::Ordering;

/// Behaviour shared by both record collections.
pub trait LedgerRecord: Clone {
    /// Unique key within the collection.
    fn key(&self) -> u64;

    /// Event timestamp as emitted by the contract.
    fn timestamp(&self) -> u64;

    /// Collection order. Ties on timestamp are broken by key so the order
    /// does not depend on sort stability.
    fn ordering(a: &Self, b: &Self) -> Ordering;
}

/// A `TopicCreated` event.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopicRecord {
    /// Unique topic id.
    #[serde_as(as = "DisplayFromStr")]
    pub topic_id: u64,
    /// Author address.
    pub author: Address,
    /// Contract timestamp (seconds).
    #[serde_as(as = "DisplayFromStr")]
    pub timestamp: u64,
    /// Topic body.
    pub content: String,
    /// Block the event was emitted in.
    #[serde_as(as = "DisplayFromStr")]
    pub block_number: u64,
    /// Emitting transaction.
    pub transaction_hash: String,
}

/// A `ReplyCreated` event.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRecord {
    /// Unique reply id.
    #[serde_as(as = "DisplayFromStr")]
    pub reply_id: u64,
    /// Topic replied to. Not checked against the topic collection.
    #[serde_as(as = "DisplayFromStr")]
    pub topic_id: u64,
    /// Author address.
    pub author: Address,
    /// Contract timestamp (seconds).
    #[serde_as(as = "DisplayFromStr")]
    pub timestamp: u64,
    /// Reply body.
    pub content: String,
    /// Block the event was emitted in.
    #[serde_as(as = "DisplayFromStr")]
    pub block_number: u64,
    /// Emitting transaction.
    pub transaction_hash: String,
}

impl LedgerRecord for TopicRecord {
    fn key(&self) -> u64 {
        self.topic_id
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Most recent first.
    fn ordering(a: &Self, b: &Self) -> Ordering {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.topic_id.cmp(&a.topic_id))
    }
}

impl LedgerRecord for ReplyRecord {
    fn key(&self) -> u64 {
        self.reply_id
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Oldest first, so threads read chronologically.
    fn ordering(a: &Self, b: &Self) -> Ordering {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.reply_id.cmp(&b.reply_id))
    }
}
