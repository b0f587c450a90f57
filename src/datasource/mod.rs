//! Candidate token producers.
//!
//! Two suppliers implement the same contract: [`console::ConsoleSupplier`]
//! reads addresses interactively, [`http::HttpSupplier`] drains a buffer
//! filled by a background feed poller. The orchestrator does not care which
//! one it is wired to.

pub mod console;
pub mod http;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

pub use console::ConsoleSupplier;
pub use http::{FeedHandle, HttpSupplier};

/// A token address waiting for a purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCandidate {
    pub address: String,
    pub received_at: DateTime<Utc>,
}

impl TokenCandidate {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            received_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait TokenSupplier: Send {
    /// Returns the next batch of candidates, blocking until one is due.
    /// `None` means the supply has ended (console sentinel or feed closed)
    /// and the caller should wind down.
    async fn retrieve(&mut self) -> Result<Option<Vec<TokenCandidate>>>;
}

/// Lock-protected candidate buffer shared between the feed poller and the
/// supplier. Reads drain: every buffered candidate is delivered exactly once
/// and bursts between reads are coalesced into a single batch.
#[derive(Debug, Clone, Default)]
pub(crate) struct CandidateQueue {
    buffer: Arc<Mutex<Vec<TokenCandidate>>>,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_all(&self, candidates: impl IntoIterator<Item = TokenCandidate>) {
        let mut buffer = self.buffer.lock().await;
        buffer.extend(candidates);
    }

    pub async fn drain(&self) -> Vec<TokenCandidate> {
        let mut buffer = self.buffer.lock().await;
        std::mem::take(&mut *buffer)
    }
}
