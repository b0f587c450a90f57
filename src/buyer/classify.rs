//! Maps the agent's free-text replies to purchase outcomes.
//!
//! The agent has no structured API; these ordered substring rules are the
//! whole contract. Rule order is significant: an earlier match always wins.

/// Outcome kind of one agent reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// The chat still shows the address we just sent; keep waiting.
    Echo,
    NotFound,
    /// Transaction submitted but not yet confirmed; keep waiting.
    TransactionSent,
    InsufficientBalance,
    /// The agent suggests the tx may have timed out; outcome unknowable from
    /// here, surfaced as a failure and never retried automatically.
    TimedOutOrRetry,
    Success,
    /// Unrecognized text. Deliberately treated as "keep waiting", bounded
    /// only by the attempt deadline; unanticipated failure text therefore
    /// surfaces as a deadline timeout rather than a specific reason.
    Ambiguous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedReply {
    pub kind: ReplyKind,
    pub raw_text: String,
}

/// Pure classification of one reply against the token just sent.
pub fn classify(raw_text: &str, sent_token: &str) -> ClassifiedReply {
    let kind = if raw_text.eq_ignore_ascii_case(sent_token) {
        ReplyKind::Echo
    } else if raw_text.contains("Token not found") {
        ReplyKind::NotFound
    } else if raw_text.contains("Transaction sent") {
        ReplyKind::TransactionSent
    } else if raw_text.contains("Insufficient balance") {
        ReplyKind::InsufficientBalance
    } else if raw_text.contains("tx might have timed out")
        || raw_text.contains("confirm before retrying")
    {
        ReplyKind::TimedOutOrRetry
    } else if raw_text.contains("Buy Success!") {
        ReplyKind::Success
    } else {
        ReplyKind::Ambiguous
    };

    ClassifiedReply {
        kind,
        raw_text: raw_text.to_string(),
    }
}
