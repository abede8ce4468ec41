//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use crate::error::ClientError;

/// Check if the client should exit immediately based on the error type.
///
/// # Returns
///
/// `true` if the error requires immediate exit (rejected credentials),
/// `false` otherwise
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(error, ClientError::AuthenticationRejected(_))
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    // Don't reconnect if the error requires immediate exit
    if should_exit_immediately(error) {
        return false;
    }

    // Don't reconnect if we've exhausted all attempts
    current_attempt < max_attempts
}

/// Map the HTTP status of a refused handshake to a client error.
pub fn classify_handshake_status(status: u16) -> ClientError {
    match status {
        401 | 403 => ClientError::AuthenticationRejected(status),
        _ => ClientError::ConnectionError(format!("handshake failed with HTTP {}", status)),
    }
}

/// Append the display name to the server URL as a `name` query parameter.
pub fn build_connect_url(url: &str, name: Option<&str>) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => {
            let separator = if url.contains('?') { '&' } else { '?' };
            format!("{}{}name={}", url, separator, encode_query_value(name.trim()))
        }
        _ => url.to_string(),
    }
}

/// Percent-encode everything but RFC 3986 unreserved characters.
fn encode_query_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
