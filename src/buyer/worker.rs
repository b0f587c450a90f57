//! Drives one purchase attempt through the send → poll → classify → decide
//! loop, under a retry budget and a caller-supplied deadline.

use super::classify::{classify, ReplyKind};
use super::retry::RetryBudget;
use crate::datasource::TokenCandidate;
use crate::telegram::{ChatMessage, ChatTransport, TransportError};
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

/// Lifecycle of a purchase attempt. Everything except `Pending`, `Sent` and
/// `AwaitingReply` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Pending,
    Sent,
    AwaitingReply,
    Succeeded,
    NotFound,
    InsufficientBalance,
    /// The attempt deadline expired. Distinct from `Failed` with
    /// "retries exceeded", which is fetch-budget exhaustion.
    TimedOut,
    Failed,
    Cancelled,
}

impl AttemptStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            AttemptStatus::Pending | AttemptStatus::Sent | AttemptStatus::AwaitingReply
        )
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttemptStatus::Pending => "pending",
            AttemptStatus::Sent => "sent",
            AttemptStatus::AwaitingReply => "awaiting reply",
            AttemptStatus::Succeeded => "succeeded",
            AttemptStatus::NotFound => "token not found",
            AttemptStatus::InsufficientBalance => "insufficient balance",
            AttemptStatus::TimedOut => "timed out",
            AttemptStatus::Failed => "failed",
            AttemptStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One full send-poll-classify-decide cycle for a single candidate.
#[derive(Debug, Clone)]
pub struct PurchaseAttempt {
    pub token: String,
    /// Number of poll cycles executed.
    pub attempt_count: u32,
    pub started_at: DateTime<Utc>,
    pub status: AttemptStatus,
    pub reason: Option<String>,
}

impl PurchaseAttempt {
    fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            attempt_count: 0,
            started_at: Utc::now(),
            status: AttemptStatus::Pending,
            reason: None,
        }
    }

    fn finish(&mut self, status: AttemptStatus, reason: impl Into<String>) {
        self.status = status;
        self.reason = Some(reason.into());
    }
}

/// Inline button press performed after the agent's first substantive reply.
#[derive(Debug, Clone)]
pub struct InlineAction {
    pub row: usize,
    pub col: usize,
    /// The button label must contain this before it is pressed.
    pub marker: String,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
    pub fetch_window: usize,
    pub fetch_retries: u32,
    pub inline_action: Option<InlineAction>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            fetch_window: 3,
            fetch_retries: 5,
            inline_action: None,
        }
    }
}

pub struct PurchaseWorker<T: ChatTransport> {
    transport: T,
    config: WorkerConfig,
    shutdown: watch::Receiver<bool>,
}

impl<T: ChatTransport> PurchaseWorker<T> {
    pub fn new(transport: T, config: WorkerConfig, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            transport,
            config,
            shutdown,
        }
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs one attempt to completion. Always returns a terminal attempt;
    /// deadline expiry yields `TimedOut` no matter where the loop was.
    pub async fn attempt(&self, candidate: &TokenCandidate, deadline: Duration) -> PurchaseAttempt {
        let mut attempt = PurchaseAttempt::new(&candidate.address);
        tracing::info!("buying token {}", candidate.address);

        if time::timeout(deadline, self.drive(&mut attempt)).await.is_err() {
            attempt.finish(AttemptStatus::TimedOut, "attempt deadline exceeded");
        }
        attempt
    }

    async fn drive(&self, attempt: &mut PurchaseAttempt) {
        if let Err(e) = self.transport.send(&attempt.token).await {
            attempt.finish(AttemptStatus::Failed, format!("send failed: {e}"));
            return;
        }
        attempt.status = AttemptStatus::Sent;

        let mut budget = RetryBudget::new(self.config.fetch_retries);
        let mut pending_action = self.config.inline_action.clone();
        let mut ticker = time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // the first tick completes immediately

        attempt.status = AttemptStatus::AwaitingReply;
        loop {
            ticker.tick().await;

            if *self.shutdown.borrow() {
                attempt.finish(AttemptStatus::Cancelled, "shutdown requested");
                return;
            }

            attempt.attempt_count += 1;
            let message = match self.fetch_newest().await {
                Ok(message) => {
                    budget.reset();
                    message
                }
                Err(TransportError::UnexpectedShape(shape)) => {
                    tracing::error!("unexpected reply shape for {}: {}", attempt.token, shape);
                    attempt.finish(
                        AttemptStatus::Failed,
                        format!("unexpected reply shape: {shape}"),
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!("failed to fetch reply for {}: {}", attempt.token, e);
                    if !budget.consume() {
                        attempt.finish(AttemptStatus::Failed, "retries exceeded");
                        return;
                    }
                    continue;
                }
            };

            let reply = classify(&message.text, &attempt.token);
            match reply.kind {
                ReplyKind::Echo => continue,
                ReplyKind::TransactionSent | ReplyKind::Ambiguous => {
                    if let Some(action) = pending_action.take() {
                        if let Err(reason) = self.press(&message, &action).await {
                            attempt.finish(AttemptStatus::Failed, reason);
                            return;
                        }
                    }
                }
                ReplyKind::NotFound => {
                    attempt.finish(
                        AttemptStatus::NotFound,
                        format!("token not found: {}", reply.raw_text),
                    );
                    return;
                }
                ReplyKind::InsufficientBalance => {
                    attempt.finish(
                        AttemptStatus::InsufficientBalance,
                        format!("insufficient balance: {}", reply.raw_text),
                    );
                    return;
                }
                ReplyKind::TimedOutOrRetry => {
                    attempt.finish(
                        AttemptStatus::Failed,
                        format!("tx might have timed out: {}", reply.raw_text),
                    );
                    return;
                }
                ReplyKind::Success => {
                    attempt.finish(AttemptStatus::Succeeded, reply.raw_text);
                    return;
                }
            }
        }
    }

    async fn fetch_newest(&self) -> Result<ChatMessage, TransportError> {
        let messages = self.transport.fetch_recent(self.config.fetch_window).await?;
        messages
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::Fetch("no messages in history".to_string()))
    }

    /// Validates and presses the configured inline button on `message`.
    /// Any mismatch is a configuration problem for this attempt, not retried.
    async fn press(&self, message: &ChatMessage, action: &InlineAction) -> Result<(), String> {
        let Some(button) = message.button(action.row, action.col) else {
            return Err(format!(
                "no inline button at row {} col {}",
                action.row, action.col
            ));
        };
        if !button.label.contains(&action.marker) {
            return Err(format!(
                "button label {:?} does not contain {:?}",
                button.label, action.marker
            ));
        }

        tracing::info!("pressing button {:?}", button.label);
        self.transport
            .press_button(message.id, &button.data)
            .await
            .map_err(|e| e.to_string())
    }
}
