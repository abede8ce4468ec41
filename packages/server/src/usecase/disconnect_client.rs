//! UseCase: 切断処理

use std::sync::Arc;

use crate::domain::{ConnectionId, ConnectionRepository, ConnectionState, MessagePusher};

/// 切断のユースケース
pub struct DisconnectClientUseCase {
    repository: Arc<dyn ConnectionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectClientUseCase {
    pub fn new(
        repository: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// 接続の全ての状態を削除する。以後この ID のメッセージは処理されない。
    pub async fn execute(&self, connection_id: &ConnectionId) -> Option<ConnectionState> {
        self.message_pusher.unregister_client(connection_id).await;
        self.repository.remove(connection_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Identity, MockMessagePusher},
        infrastructure::repository::InMemoryConnectionRepository,
    };

    #[tokio::test]
    async fn test_disconnect_removes_state() {
        // テスト項目: 切断するとレジストリから削除され、送信キューも解除される
        // given (前提条件):
        let repository = Arc::new(InMemoryConnectionRepository::new());
        let alice = ConnectionId::generate();
        repository.register(alice, Identity::new("alice")).await.unwrap();
        let mut pusher = MockMessagePusher::new();
        pusher
            .expect_unregister_client()
            .withf(move |id| *id == alice)
            .times(1)
            .return_const(());
        let usecase = DisconnectClientUseCase::new(repository.clone(), Arc::new(pusher));

        // when (操作):
        let removed = usecase.execute(&alice).await;

        // then (期待する結果):
        assert_eq!(removed.map(|s| s.id), Some(alice));
        assert_eq!(repository.get(&alice).await, None);
    }

    #[tokio::test]
    async fn test_disconnect_twice_is_harmless() {
        // テスト項目: 二度目の切断は何も返さない
        // given (前提条件):
        let repository = Arc::new(InMemoryConnectionRepository::new());
        let alice = ConnectionId::generate();
        repository.register(alice, Identity::new("alice")).await.unwrap();
        let mut pusher = MockMessagePusher::new();
        pusher.expect_unregister_client().times(2).return_const(());
        let usecase = DisconnectClientUseCase::new(repository, Arc::new(pusher));
        usecase.execute(&alice).await;

        // when (操作):
        let removed = usecase.execute(&alice).await;

        // then (期待する結果):
        assert!(removed.is_none());
    }
}
