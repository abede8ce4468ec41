//! InMemory Connection Repository 実装
//!
//! ドメイン層が定義する ConnectionRepository trait の具体的な実装。
//! ワーカープロセス内の HashMap を接続のアリーナとして使用します。
//! 他のプロセスからは一切参照されません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, ConnectionRepository, ConnectionState, Identity, RegistryError};

/// インメモリ接続レジストリ
#[derive(Default)]
pub struct InMemoryConnectionRepository {
    connections: Mutex<HashMap<ConnectionId, ConnectionState>>,
}

impl InMemoryConnectionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn register(
        &self,
        id: ConnectionId,
        identity: Identity,
    ) -> Result<ConnectionState, RegistryError> {
        let mut connections = self.connections.lock().await;
        if connections.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id.to_string()));
        }
        let state = ConnectionState::new(id, identity);
        connections.insert(id, state.clone());
        Ok(state)
    }

    async fn get(&self, id: &ConnectionId) -> Option<ConnectionState> {
        let connections = self.connections.lock().await;
        connections.get(id).cloned()
    }

    async fn save(&self, state: ConnectionState) -> Result<(), RegistryError> {
        let mut connections = self.connections.lock().await;
        match connections.get_mut(&state.id) {
            Some(slot) => {
                *slot = state;
                Ok(())
            }
            None => Err(RegistryError::UnknownConnection(state.id.to_string())),
        }
    }

    async fn remove(&self, id: &ConnectionId) -> Option<ConnectionState> {
        let mut connections = self.connections.lock().await;
        connections.remove(id)
    }

    async fn connection_ids(&self) -> Vec<ConnectionId> {
        let connections = self.connections.lock().await;
        connections.keys().copied().collect()
    }

    async fn count(&self) -> usize {
        let connections = self.connections.lock().await;
        connections.len()
    }
}
