//! Instructions sent from the coordinator to every worker.

use super::value_object::Origin;

/// Text typed at the coordinator console, relayed to every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorMessage {
    pub text: String,
}

impl OperatorMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn origin(&self) -> Origin {
        Origin::Server
    }
}

/// Tells a worker to drain and exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownSignal {
    pub reason: String,
}

impl ShutdownSignal {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Closed set of coordinator instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    Operator(OperatorMessage),
    Shutdown(ShutdownSignal),
}
