//! Chat transport boundary towards the purchase agent.
//!
//! The worker only ever talks to the agent through [`ChatTransport`]; the
//! grammers-backed implementation lives in [`client`].

pub mod client;

use async_trait::async_trait;
use thiserror::Error;

pub use client::{connect, find_contact, TelegramTransport};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to send message: {0}")]
    Send(String),
    #[error("failed to fetch messages: {0}")]
    Fetch(String),
    #[error("unexpected messages container: {0}")]
    UnexpectedShape(&'static str),
    #[error("inline action failed: {0}")]
    Action(String),
}

/// One inline keyboard button attached to an agent reply.
#[derive(Debug, Clone)]
pub struct InlineButton {
    pub label: String,
    pub data: Vec<u8>,
}

/// A single text message from the agent chat, plus whatever inline keyboard
/// it carries (empty for plain replies).
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: i32,
    pub text: String,
    pub buttons: Vec<Vec<InlineButton>>,
}

impl ChatMessage {
    pub fn button(&self, row: usize, col: usize) -> Option<&InlineButton> {
        self.buttons.get(row).and_then(|r| r.get(col))
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends `text` to the agent peer. Every send carries a fresh random
    /// message id so the server does not coalesce identical sends.
    async fn send(&self, text: &str) -> Result<(), TransportError>;

    /// Fetches up to `limit` of the most recent messages, newest first.
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<ChatMessage>, TransportError>;

    /// Presses the inline button with the given callback payload on the
    /// message identified by `message_id`.
    async fn press_button(&self, message_id: i32, data: &[u8]) -> Result<(), TransportError>;
}
