//! Per-connection admission state.

use std::collections::VecDeque;

use super::value_object::{ConnectionId, Identity, Timestamp};

/// State the owning worker keeps for one live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub id: ConnectionId,
    pub identity: Identity,
    /// Send instants still inside the rate window, oldest first.
    pub recent_send_timestamps: VecDeque<Timestamp>,
    /// Accepted messages over the whole life of the connection. Never reset.
    pub lifetime_sent_count: u64,
}

impl ConnectionState {
    pub fn new(id: ConnectionId, identity: Identity) -> Self {
        Self {
            id,
            identity,
            recent_send_timestamps: VecDeque::new(),
            lifetime_sent_count: 0,
        }
    }
}
