//! Error types for the Hiroba client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server refused the handshake (401 or 403)
    #[error("Server rejected the credentials (HTTP {0})")]
    AuthenticationRejected(u16),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),
}
