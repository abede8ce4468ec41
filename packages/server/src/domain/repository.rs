//! Repository trait 定義
//!
//! ワーカー内の接続レジストリへのインターフェース。
//! UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。

use async_trait::async_trait;

use super::{
    connection::ConnectionState,
    error::RegistryError,
    value_object::{ConnectionId, Identity},
};

/// Connection registry owned by one worker process.
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// Create admission state for a freshly authenticated connection.
    async fn register(
        &self,
        id: ConnectionId,
        identity: Identity,
    ) -> Result<ConnectionState, RegistryError>;

    /// Snapshot of a connection's state, if it is still registered.
    async fn get(&self, id: &ConnectionId) -> Option<ConnectionState>;

    /// Persist state produced by an admission evaluation.
    async fn save(&self, state: ConnectionState) -> Result<(), RegistryError>;

    /// Delete all state of a connection.
    async fn remove(&self, id: &ConnectionId) -> Option<ConnectionState>;

    /// Every registered connection id.
    async fn connection_ids(&self) -> Vec<ConnectionId>;

    async fn count(&self) -> usize;
}
