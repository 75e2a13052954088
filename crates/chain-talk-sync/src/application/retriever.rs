//! # Event Retriever
//!
//! Fetches one window of logs per event kind and decodes them into records.
//! A kind's fetch is all-or-nothing: one undecodable log fails the whole kind.

use std::sync::Arc;

use tracing::info;

use crate::algorithms::{decode_reply, decode_topic};
use crate::domain::{BlockWindow, EventKind, ReplyRecord, RetrievalError, TopicRecord};
use crate::ports::LedgerClient;

/// Records retrieved for one window.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchedEvents {
    /// Decoded `TopicCreated` events.
    pub topics: Vec<TopicRecord>,
    /// Decoded `ReplyCreated` events.
    pub replies: Vec<ReplyRecord>,
}

/// Window fetcher over a ledger client.
pub struct EventRetriever<L: LedgerClient> {
    ledger: Arc<L>,
    concurrent: bool,
}

impl<L: LedgerClient> EventRetriever<L> {
    /// Create a retriever; `concurrent` issues both kinds' queries at once.
    pub fn new(ledger: Arc<L>, concurrent: bool) -> Self {
        Self { ledger, concurrent }
    }

    /// Fetch and decode topics created in `window`.
    pub async fn fetch_topics(
        &self,
        window: BlockWindow,
    ) -> Result<Vec<TopicRecord>, RetrievalError> {
        info!("[sync] 🔍 Fetching topics in {}", window);
        let logs = self
            .ledger
            .query_logs(EventKind::TopicCreated, window.from, window.to)
            .await?;
        info!("[sync] 📝 Found {} topic event logs", logs.len());

        logs.iter().map(decode_topic).collect()
    }

    /// Fetch and decode replies created in `window`.
    pub async fn fetch_replies(
        &self,
        window: BlockWindow,
    ) -> Result<Vec<ReplyRecord>, RetrievalError> {
        info!("[sync] 🔍 Fetching replies in {}", window);
        let logs = self
            .ledger
            .query_logs(EventKind::ReplyCreated, window.from, window.to)
            .await?;
        info!("[sync] 📝 Found {} reply event logs", logs.len());

        logs.iter().map(decode_reply).collect()
    }

    /// Fetch both kinds for `window`.
    pub async fn fetch_all(&self, window: BlockWindow) -> Result<FetchedEvents, RetrievalError> {
        let (topics, replies) = if self.concurrent {
            tokio::try_join!(self.fetch_topics(window), self.fetch_replies(window))?
        } else {
            let topics = self.fetch_topics(window).await?;
            let replies = self.fetch_replies(window).await?;
            (topics, replies)
        };

        Ok(FetchedEvents { topics, replies })
    }
}
