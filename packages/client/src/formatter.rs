//! Message formatting utilities for client display.

use hiroba_server::{
    domain::Origin,
    infrastructure::dto::websocket::{BroadcastMessage, ErrorMessage},
};
use hiroba_shared::time::timestamp_to_local_rfc3339;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a broadcast from a peer (`[client]`) or the operator (`[server]`)
    pub fn format_broadcast(message: &BroadcastMessage) -> String {
        let tag = match message.origin {
            Origin::Server => "[server]",
            Origin::Client => "[client]",
        };
        format!("\n{} {}\n", tag, message.text)
    }

    /// Format the notice of a message the server refused
    pub fn format_rejected(message: &ErrorMessage) -> String {
        format!("\n! rejected: {}\n", message.reason)
    }

    /// Format a confirmation message after sending
    ///
    /// # Arguments
    ///
    /// * `sent_at` - Unix timestamp when the message was sent (milliseconds)
    pub fn format_sent_confirmation(sent_at: i64) -> String {
        format!("sent at {}\n", timestamp_to_local_rfc3339(sent_at))
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}
