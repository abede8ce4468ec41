//! Domain error types.

use thiserror::Error;

/// Reason an inbound message was not admitted.
///
/// The `Display` text is what the sending connection sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("quota exceeded")]
    QuotaExceeded,

    #[error("invalid message")]
    InvalidMessage,

    #[error("forbidden content")]
    ForbiddenContent,
}

/// Authentication failures at handshake. No registry entry exists for any of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("authentication failed: no credential presented")]
    MissingCredential,

    #[error("authentication failed: invalid credential")]
    InvalidCredential,

    #[error("authentication failed: origin '{0}' is not allowed")]
    OriginNotAllowed(String),
}

/// Connection registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("connection '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("connection '{0}' is not registered")]
    UnknownConnection(String),
}

/// Errors pushing frames to connections
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' not found")]
    ConnectionNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}

/// Errors on the coordinator → worker channel
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("malformed channel message: {0}")]
    Malformed(String),

    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode channel message: {0}")]
    Encode(#[from] serde_json::Error),
}
