//! In-memory record of tokens whose purchase attempt already concluded in
//! this process lifetime. Append-only, never persisted.

use super::worker::AttemptStatus;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct DedupLedger {
    entries: HashMap<String, AttemptStatus>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    pub fn get(&self, token: &str) -> Option<&AttemptStatus> {
        self.entries.get(token)
    }

    /// Records the terminal status for a token. Re-recording overwrites;
    /// there is no removal and no expiry.
    pub fn record(&mut self, token: &str, status: AttemptStatus) {
        self.entries.insert(token.to_string(), status);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
