//! Value objects of the fan-out domain.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of one accepted connection.
///
/// Assigned at accept time and only meaningful inside the worker process
/// that accepted the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // short form for log lines
        write!(f, "{}", &self.0.simple().to_string()[..8])
    }
}

/// Claims produced by a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Display name presented at handshake, or the connection id when absent.
    pub subject: String,
}

impl Identity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

/// Who produced a broadcast text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Client,
    Server,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Client => "client",
            Origin::Server => "server",
        }
    }
}

/// Millisecond instant used by the admission window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self`.
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        self.0 - earlier.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_are_unique() {
        // テスト項目: 生成された ConnectionId は重複しない
        // given (前提条件):
        let a = ConnectionId::generate();

        // when (操作):
        let b = ConnectionId::generate();

        // then (期待する結果):
        assert_ne!(a, b);
    }

    #[test]
    fn test_origin_serializes_lowercase() {
        // テスト項目: Origin は小文字の文字列としてシリアライズされる
        // given (前提条件):
        let origins = [Origin::Client, Origin::Server];

        // when (操作):
        let json: Vec<String> = origins
            .iter()
            .map(|o| serde_json::to_string(o).unwrap())
            .collect();

        // then (期待する結果):
        assert_eq!(json, vec!["\"client\"", "\"server\""]);
    }

    #[test]
    fn test_timestamp_millis_since() {
        // テスト項目: 2 つの Timestamp の差がミリ秒で得られる
        // given (前提条件):
        let earlier = Timestamp::new(1_000);
        let later = Timestamp::new(1_999);

        // when (操作):
        let elapsed = later.millis_since(earlier);

        // then (期待する結果):
        assert_eq!(elapsed, 999);
    }
}
