//! UseCase: 受信メッセージの受付判定と配信
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 受理されたメッセージは送信者以外の同一ワーカー内の接続に配信される
//! - 拒否されたメッセージは送信者にだけ理由が通知され、配信されない
//!
//! ### どのような状況を想定しているか
//! - 正常系：3 接続中 1 接続からの送信
//! - 異常系：レート制限・禁止語による拒否
//! - エッジケース：送信者のみが接続している場合、未登録の接続

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::{
    domain::{
        AdmissionController, ConnectionId, ConnectionRepository, MessagePusher, RawMessage,
        RejectReason, Timestamp, Verdict,
    },
    infrastructure::dto::websocket::{BroadcastMessage, ErrorMessage},
};

use super::error::SendMessageError;

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Broadcast to these peers (never the sender)
    Delivered { targets: Vec<ConnectionId> },
    /// Only the sender was told why
    Rejected(RejectReason),
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    repository: Arc<dyn ConnectionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    admission: AdmissionController,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    pub fn new(
        repository: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        admission: AdmissionController,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            admission,
            clock,
        }
    }

    /// 受信メッセージを判定し、受理されたら配信する
    ///
    /// Messages of one connection are handled one at a time by its receive
    /// task, so the read-evaluate-save sequence below never interleaves with
    /// another evaluation for the same connection.
    pub async fn execute(
        &self,
        from: &ConnectionId,
        raw: RawMessage<'_>,
    ) -> Result<SendOutcome, SendMessageError> {
        let mut state = self
            .repository
            .get(from)
            .await
            .ok_or_else(|| SendMessageError::UnknownConnection(from.to_string()))?;

        let now = Timestamp::new(self.clock.now_millis());
        let verdict = self.admission.evaluate(&mut state, raw, now);
        let subject = state.identity.subject.clone();
        self.repository.save(state).await?;

        match verdict {
            Verdict::Accepted(message) => {
                tracing::info!("Message from '{}' accepted: {}", subject, message.text);
                let json = serde_json::to_string(&BroadcastMessage::from(message))?;
                let targets = self.broadcast_targets(from).await;
                self.message_pusher.broadcast(targets.clone(), &json).await?;
                tracing::debug!("Fanned out message from '{}' to {} peers", subject, targets.len());
                Ok(SendOutcome::Delivered { targets })
            }
            Verdict::Rejected(reason) => {
                tracing::warn!("Message from '{}' rejected: {}", subject, reason);
                let json = serde_json::to_string(&ErrorMessage::from(reason))?;
                self.message_pusher.push_to(from, &json).await?;
                Ok(SendOutcome::Rejected(reason))
            }
        }
    }

    /// 送信者以外の全ての接続
    async fn broadcast_targets(&self, exclude: &ConnectionId) -> Vec<ConnectionId> {
        self.repository
            .connection_ids()
            .await
            .into_iter()
            .filter(|id| id != exclude)
            .collect()
    }
}
