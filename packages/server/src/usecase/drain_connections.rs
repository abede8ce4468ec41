//! UseCase: シャットダウン時の接続の排出
//!
//! 最後のお知らせを全接続に配信し、その後で全接続に Close を積む。
//! 送信キューは FIFO なので、お知らせは必ず Close より先に届く。

use std::sync::Arc;

use crate::{
    domain::{ConnectionRepository, MessagePusher, OperatorMessage, ShutdownSignal},
    infrastructure::dto::websocket::BroadcastMessage,
};

use super::error::BroadcastError;

/// 接続排出のユースケース
pub struct DrainConnectionsUseCase {
    repository: Arc<dyn ConnectionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl DrainConnectionsUseCase {
    pub fn new(
        repository: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// Send the final notice (when there is a signal) and close every connection.
    ///
    /// Returns the number of connections asked to close.
    pub async fn execute(&self, signal: Option<&ShutdownSignal>) -> Result<usize, BroadcastError> {
        if let Some(signal) = signal {
            let notice = OperatorMessage::new(signal.reason.clone());
            let json = serde_json::to_string(&BroadcastMessage::from(notice))?;
            let targets = self.repository.connection_ids().await;
            self.message_pusher.broadcast(targets, &json).await?;
        }
        Ok(self.message_pusher.close_all().await)
    }
}
