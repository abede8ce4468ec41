//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{AuthError, MessagePushError, RegistryError};

/// Connection setup failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error(transparent)]
    AuthenticationFailed(#[from] AuthError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Inbound message handling failures. Rejections are not errors.
#[derive(Debug, Error)]
pub enum SendMessageError {
    /// Lookup failed for a connection that should be registered
    #[error("connection '{0}' is not registered")]
    UnknownConnection(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Push(#[from] MessagePushError),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Operator relay and drain failures
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error(transparent)]
    Push(#[from] MessagePushError),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}
