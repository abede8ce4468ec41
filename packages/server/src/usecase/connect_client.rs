//! UseCase: 接続受付処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectClientUseCase::execute() メソッド
//! - 認証に成功した接続だけがレジストリと MessagePusher に登録されること
//!
//! ### どのような状況を想定しているか
//! - 正常系：正しいトークンでの接続
//! - 異常系：認証失敗（レジストリに何も残らない）

use std::sync::Arc;

use crate::domain::{
    Authenticator, ConnectionId, ConnectionRepository, ConnectionState, Handshake, MessagePusher,
    PusherChannel,
};

use super::error::ConnectError;

/// 接続受付のユースケース
pub struct ConnectClientUseCase {
    authenticator: Arc<dyn Authenticator>,
    repository: Arc<dyn ConnectionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl ConnectClientUseCase {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        repository: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            authenticator,
            repository,
            message_pusher,
        }
    }

    /// 接続を認証し、登録する
    ///
    /// # Returns
    ///
    /// * `Ok(ConnectionState)` - 登録された接続の初期状態
    /// * `Err(ConnectError)` - 認証失敗（何も登録されない）
    pub async fn execute(
        &self,
        handshake: &Handshake,
        sender: PusherChannel,
    ) -> Result<ConnectionState, ConnectError> {
        let id = ConnectionId::generate();

        // 1. 認証（失敗した場合はレジストリに触れない）
        let identity = self
            .authenticator
            .authenticate(handshake, &id.to_string())
            .await?;

        // 2. レジストリに登録
        let state = self.repository.register(id, identity).await?;

        // 3. 送信キューを MessagePusher に登録
        self.message_pusher.register_client(id, sender).await;

        Ok(state)
    }
}
