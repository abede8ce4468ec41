//! Shared-secret token authentication.
//!
//! Every client presents the same token that the operator configured; the
//! check is a constant-time comparison. The `Origin` header, when the client
//! sends one, must be in the allowlist.

use async_trait::async_trait;
use subtle::ConstantTimeEq;

use crate::domain::{AuthError, Authenticator, Handshake, Identity};

/// Longest display name kept from the handshake.
const MAX_NAME_CHARS: usize = 32;

pub struct SharedTokenAuthenticator {
    token: String,
    allowed_origins: Vec<String>,
}

impl SharedTokenAuthenticator {
    pub fn new(token: impl Into<String>, allowed_origins: Vec<String>) -> Self {
        Self {
            token: token.into(),
            allowed_origins,
        }
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed.eq_ignore_ascii_case(origin))
    }
}

#[async_trait]
impl Authenticator for SharedTokenAuthenticator {
    async fn authenticate(
        &self,
        handshake: &Handshake,
        fallback_subject: &str,
    ) -> Result<Identity, AuthError> {
        if let Some(origin) = handshake.origin.as_deref()
            && !self.origin_allowed(origin)
        {
            return Err(AuthError::OriginNotAllowed(origin.to_string()));
        }

        let token = handshake
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingCredential)?;
        if !bool::from(token.as_bytes().ct_eq(self.token.as_bytes())) {
            return Err(AuthError::InvalidCredential);
        }

        let subject = handshake
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| n.chars().take(MAX_NAME_CHARS).collect::<String>())
            .unwrap_or_else(|| fallback_subject.to_string());

        Ok(Identity::new(subject))
    }
}
