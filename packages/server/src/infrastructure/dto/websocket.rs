//! WebSocket message DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::{AcceptedMessage, OperatorMessage, Origin, RejectReason};

/// Discriminant of server → client frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    Message,
    Error,
}

/// A broadcast text, from a peer client or from the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub r#type: MessageType,
    pub origin: Origin,
    pub text: String,
}

impl BroadcastMessage {
    pub fn new(origin: Origin, text: impl Into<String>) -> Self {
        Self {
            r#type: MessageType::Message,
            origin,
            text: text.into(),
        }
    }
}

/// Notice sent only to the sender of a rejected message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub r#type: MessageType,
    pub reason: String,
}

impl From<AcceptedMessage> for BroadcastMessage {
    fn from(message: AcceptedMessage) -> Self {
        Self::new(message.origin, message.text)
    }
}

impl From<OperatorMessage> for BroadcastMessage {
    fn from(message: OperatorMessage) -> Self {
        Self::new(message.origin(), message.text)
    }
}

impl From<RejectReason> for ErrorMessage {
    fn from(reason: RejectReason) -> Self {
        Self {
            r#type: MessageType::Error,
            reason: reason.to_string(),
        }
    }
}

/// Any frame a client may receive
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ServerFrame {
    Broadcast(BroadcastMessage),
    Error(ErrorMessage),
}
