//! Channel frame DTO.
//!
//! On the wire a worker tells the two instruction shapes apart by the
//! presence of the `shutdown` field:
//!
//! ```text
//! {"shutdown":true,"message":"<reason>"}
//! {"from":"server","message":"<text>"}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{ChannelError, ChannelMessage, OperatorMessage, ShutdownSignal};

const SERVER_ORIGIN: &str = "server";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub message: String,
}

impl From<ChannelMessage> for ChannelFrame {
    fn from(message: ChannelMessage) -> Self {
        match message {
            ChannelMessage::Shutdown(signal) => Self {
                shutdown: Some(true),
                from: None,
                message: signal.reason,
            },
            ChannelMessage::Operator(operator) => Self {
                shutdown: None,
                from: Some(SERVER_ORIGIN.to_string()),
                message: operator.text,
            },
        }
    }
}

impl TryFrom<ChannelFrame> for ChannelMessage {
    type Error = ChannelError;

    fn try_from(frame: ChannelFrame) -> Result<Self, Self::Error> {
        if frame.shutdown == Some(true) {
            return Ok(ChannelMessage::Shutdown(ShutdownSignal::new(frame.message)));
        }
        match frame.from.as_deref() {
            Some(SERVER_ORIGIN) if !frame.message.is_empty() => {
                Ok(ChannelMessage::Operator(OperatorMessage::new(frame.message)))
            }
            Some(SERVER_ORIGIN) => Err(ChannelError::Malformed("empty operator message".into())),
            Some(other) => Err(ChannelError::Malformed(format!("unexpected origin '{other}'"))),
            None => Err(ChannelError::Malformed("neither shutdown nor from".into())),
        }
    }
}

/// Encode one instruction as a single JSON line (without the newline).
pub fn encode_line(message: ChannelMessage) -> Result<String, ChannelError> {
    Ok(serde_json::to_string(&ChannelFrame::from(message))?)
}

/// Decode one JSON line into an instruction.
pub fn decode_line(line: &str) -> Result<ChannelMessage, ChannelError> {
    let frame: ChannelFrame =
        serde_json::from_str(line).map_err(|e| ChannelError::Malformed(e.to_string()))?;
    ChannelMessage::try_from(frame)
}
