//! UseCase: コーディネータからのオペレータメッセージの配信

use std::sync::Arc;

use crate::{
    domain::{ConnectionRepository, MessagePusher, OperatorMessage},
    infrastructure::dto::websocket::BroadcastMessage,
};

use super::error::BroadcastError;

/// オペレータメッセージ配信のユースケース
pub struct RelayOperatorMessageUseCase {
    repository: Arc<dyn ConnectionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl RelayOperatorMessageUseCase {
    pub fn new(
        repository: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// このワーカーに登録されている全ての接続へ配信し、配信先の数を返す
    pub async fn execute(&self, message: OperatorMessage) -> Result<usize, BroadcastError> {
        let json = serde_json::to_string(&BroadcastMessage::from(message))?;
        let targets = self.repository.connection_ids().await;
        let count = targets.len();
        self.message_pusher.broadcast(targets, &json).await?;
        Ok(count)
    }
}
