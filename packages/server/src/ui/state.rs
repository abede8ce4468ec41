//! Worker state shared by the handlers.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use hiroba_shared::time::Clock;

use crate::{
    domain::{ConnectionRepository, HandshakeLimiter, Timestamp},
    usecase::{
        ConnectClientUseCase, DisconnectClientUseCase, DrainConnectionsUseCase,
        RelayOperatorMessageUseCase, SendMessageUseCase,
    },
};

use super::tracker::ConnectionTracker;

/// Shared application state of one worker process
pub struct AppState {
    /// Index of this worker within the coordinator's pool
    pub worker_index: usize,
    pub connect_client_usecase: Arc<ConnectClientUseCase>,
    pub disconnect_client_usecase: Arc<DisconnectClientUseCase>,
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub relay_operator_message_usecase: Arc<RelayOperatorMessageUseCase>,
    pub drain_connections_usecase: Arc<DrainConnectionsUseCase>,
    /// Read-only view for the health endpoint
    pub repository: Arc<dyn ConnectionRepository>,
    pub tracker: Arc<ConnectionTracker>,
    /// Per-peer budget of connection attempts
    pub handshake_limiter: HandshakeLimiter,
    clock: Arc<dyn Clock>,
    draining: AtomicBool,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        worker_index: usize,
        connect_client_usecase: Arc<ConnectClientUseCase>,
        disconnect_client_usecase: Arc<DisconnectClientUseCase>,
        send_message_usecase: Arc<SendMessageUseCase>,
        relay_operator_message_usecase: Arc<RelayOperatorMessageUseCase>,
        drain_connections_usecase: Arc<DrainConnectionsUseCase>,
        repository: Arc<dyn ConnectionRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            worker_index,
            connect_client_usecase,
            disconnect_client_usecase,
            send_message_usecase,
            relay_operator_message_usecase,
            drain_connections_usecase,
            repository,
            tracker: ConnectionTracker::new(),
            handshake_limiter: HandshakeLimiter::default(),
            clock,
            draining: AtomicBool::new(false),
        }
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Flip into draining. Returns `false` if a drain had already started.
    pub fn begin_draining(&self) -> bool {
        !self.draining.swap(true, Ordering::SeqCst)
    }
}
