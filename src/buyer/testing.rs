//! Scripted fakes for the transport and supplier seams, test-only.

use crate::datasource::{TokenCandidate, TokenSupplier};
use crate::telegram::{ChatMessage, ChatTransport, InlineButton, TransportError};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn reply(text: &str) -> ChatMessage {
    ChatMessage {
        id: 1,
        text: text.to_string(),
        buttons: Vec::new(),
    }
}

pub fn reply_with_button(text: &str, label: &str) -> ChatMessage {
    ChatMessage {
        id: 1,
        text: text.to_string(),
        buttons: vec![vec![InlineButton {
            label: label.to_string(),
            data: b"press".to_vec(),
        }]],
    }
}

#[derive(Debug, Clone)]
pub enum FakeFetch {
    Reply(Vec<ChatMessage>),
    Fail,
    BadShape,
}

/// Transport whose fetches follow a script. Once the script runs out the
/// last entry repeats forever, so "keeps answering the same thing" scenarios
/// need only one entry.
pub struct FakeTransport {
    script: Mutex<VecDeque<FakeFetch>>,
    last: Mutex<Option<FakeFetch>>,
    fail_send: bool,
    sends: Mutex<Vec<String>>,
    fetches: AtomicUsize,
    presses: Mutex<Vec<(i32, Vec<u8>)>>,
}

impl FakeTransport {
    pub fn new(script: Vec<FakeFetch>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            fail_send: false,
            sends: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            presses: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_send() -> Self {
        let mut transport = Self::new(Vec::new());
        transport.fail_send = true;
        transport
    }

    pub fn sends(&self) -> usize {
        self.sends.lock().unwrap().len()
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn presses(&self) -> usize {
        self.presses.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        if self.fail_send {
            return Err(TransportError::Send("scripted send failure".to_string()));
        }
        self.sends.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn fetch_recent(&self, _limit: usize) -> Result<Vec<ChatMessage>, TransportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let next = {
            let mut script = self.script.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            match script.pop_front() {
                Some(entry) => {
                    *last = Some(entry.clone());
                    Some(entry)
                }
                None => last.clone(),
            }
        };

        match next {
            None => Ok(Vec::new()),
            Some(FakeFetch::Reply(messages)) => Ok(messages),
            Some(FakeFetch::Fail) => {
                Err(TransportError::Fetch("scripted fetch failure".to_string()))
            }
            Some(FakeFetch::BadShape) => {
                Err(TransportError::UnexpectedShape("messages.channelMessages"))
            }
        }
    }

    async fn press_button(&self, message_id: i32, data: &[u8]) -> Result<(), TransportError> {
        self.presses.lock().unwrap().push((message_id, data.to_vec()));
        Ok(())
    }
}

/// Supplier that serves pre-baked batches, then reports the supply closed.
pub struct FakeSupplier {
    batches: VecDeque<Vec<TokenCandidate>>,
}

impl FakeSupplier {
    pub fn new(batches: Vec<Vec<&str>>) -> Self {
        Self {
            batches: batches
                .into_iter()
                .map(|batch| batch.into_iter().map(TokenCandidate::new).collect())
                .collect(),
        }
    }
}

#[async_trait]
impl TokenSupplier for FakeSupplier {
    async fn retrieve(&mut self) -> Result<Option<Vec<TokenCandidate>>> {
        Ok(self.batches.pop_front())
    }
}
