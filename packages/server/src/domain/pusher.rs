//! MessagePusher trait 定義
//!
//! 接続中のクライアントへフレームを届けるためのインターフェース。
//! 具体的な実装（WebSocket）は Infrastructure 層が提供します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{error::MessagePushError, value_object::ConnectionId};

/// Frame queued for one connection's outbound task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    /// Close the connection after everything queued before it has been sent.
    Close,
}

/// Sending half of a connection's outbound queue
pub type PusherChannel = mpsc::UnboundedSender<OutboundFrame>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// Attach the outbound queue of a newly registered connection
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// Detach a connection's outbound queue
    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// Push one text frame to a single connection
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// Push one text frame to every target. Failures for individual targets are tolerated.
    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// Queue a close after pending frames on every attached connection.
    /// Returns how many connections were asked to close.
    async fn close_all(&self) -> usize;
}
