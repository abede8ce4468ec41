//! Authenticator trait 定義

use async_trait::async_trait;

use super::{error::AuthError, value_object::Identity};

/// What a client presented while opening its connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handshake {
    pub token: Option<String>,
    pub origin: Option<String>,
    pub name: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Verify the handshake and return the connection's identity.
    ///
    /// `fallback_subject` is used when the client did not name itself.
    async fn authenticate(
        &self,
        handshake: &Handshake,
        fallback_subject: &str,
    ) -> Result<Identity, AuthError>;
}
