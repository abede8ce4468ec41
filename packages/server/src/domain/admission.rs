//! Admission control for inbound client messages.
//!
//! [`AdmissionController::evaluate`] is a pure function of the connection
//! state, the raw message and the current instant. Checks run in a fixed
//! order and stop at the first failure:
//!
//! 1. sliding-window rate limit
//! 2. lifetime quota
//! 3. shape (text, trimmed length within bounds)
//! 4. sanitization
//! 5. content denylist on the sanitized text
//!
//! Only an accepted message consumes a rate-window slot and a quota unit.

use super::{
    connection::ConnectionState,
    error::RejectReason,
    sanitize::sanitize,
    value_object::{Origin, Timestamp},
};

pub const RATE_WINDOW_MILLIS: i64 = 1_000;
pub const MAX_MESSAGES_PER_WINDOW: usize = 5;
pub const LIFETIME_QUOTA: u64 = 1_000;
pub const MAX_MESSAGE_CHARS: usize = 200;

/// Denylist used when none is configured.
pub const DEFAULT_FORBIDDEN_WORDS: &[&str] = &["spam", "scam", "phishing"];

/// Inbound frame as received from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawMessage<'a> {
    Text(&'a str),
    /// Anything that is not text (binary frames).
    NonText,
}

/// Text cleared for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedMessage {
    pub origin: Origin,
    pub text: String,
}

/// Outcome of one admission evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(AcceptedMessage),
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }
}

/// Tunables of the admission policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionPolicy {
    pub rate_window_millis: i64,
    pub max_messages_per_window: usize,
    pub lifetime_quota: u64,
    pub max_message_chars: usize,
    /// Case-sensitive substrings rejected after sanitization.
    pub forbidden_words: Vec<String>,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            rate_window_millis: RATE_WINDOW_MILLIS,
            max_messages_per_window: MAX_MESSAGES_PER_WINDOW,
            lifetime_quota: LIFETIME_QUOTA,
            max_message_chars: MAX_MESSAGE_CHARS,
            forbidden_words: DEFAULT_FORBIDDEN_WORDS
                .iter()
                .map(|w| w.to_string())
                .collect(),
        }
    }
}

impl AdmissionPolicy {
    /// Default limits with a custom denylist. Empty words are dropped.
    pub fn with_forbidden_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            forbidden_words: words
                .into_iter()
                .map(Into::into)
                .filter(|w: &String| !w.is_empty())
                .collect(),
            ..Self::default()
        }
    }
}

/// Per-worker policy engine; holds no connection state of its own.
#[derive(Debug, Clone, Default)]
pub struct AdmissionController {
    policy: AdmissionPolicy,
}

impl AdmissionController {
    pub fn new(policy: AdmissionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    /// Decide whether `raw` from `connection` is admitted at instant `now`.
    ///
    /// On acceptance the connection's window and lifetime counter are
    /// updated in place. On rejection only expired window entries are
    /// pruned, which does not change any later decision.
    pub fn evaluate(
        &self,
        connection: &mut ConnectionState,
        raw: RawMessage<'_>,
        now: Timestamp,
    ) -> Verdict {
        let window = self.policy.rate_window_millis;
        connection
            .recent_send_timestamps
            .retain(|sent| now.millis_since(*sent) < window);
        if connection.recent_send_timestamps.len() >= self.policy.max_messages_per_window {
            return Verdict::Rejected(RejectReason::RateLimitExceeded);
        }

        if connection.lifetime_sent_count >= self.policy.lifetime_quota {
            return Verdict::Rejected(RejectReason::QuotaExceeded);
        }

        let text = match raw {
            RawMessage::Text(text) => text.trim(),
            RawMessage::NonText => return Verdict::Rejected(RejectReason::InvalidMessage),
        };
        let chars = text.chars().count();
        if chars == 0 || chars > self.policy.max_message_chars {
            return Verdict::Rejected(RejectReason::InvalidMessage);
        }

        let cleaned = sanitize(text);
        if cleaned.is_empty() {
            return Verdict::Rejected(RejectReason::InvalidMessage);
        }

        if self
            .policy
            .forbidden_words
            .iter()
            .any(|word| cleaned.contains(word.as_str()))
        {
            return Verdict::Rejected(RejectReason::ForbiddenContent);
        }

        connection.recent_send_timestamps.push_back(now);
        connection.lifetime_sent_count += 1;

        Verdict::Accepted(AcceptedMessage {
            origin: Origin::Client,
            text: cleaned,
        })
    }
}
