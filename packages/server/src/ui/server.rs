//! Worker process: one HTTP/WebSocket server sharing the public port with its siblings.

use std::{error::Error, io, net::SocketAddr, sync::Arc};

use axum::{Router, routing::get};
use hiroba_shared::time::{Clock, SystemClock};
use tokio::{
    io::AsyncBufRead,
    net::{TcpListener, TcpSocket},
    sync::oneshot,
};
use tower_http::trace::TraceLayer;

use crate::{
    config::{DEFAULT_SHUTDOWN_REASON, ServerConfig},
    domain::{
        AdmissionController, Authenticator, ChannelMessage, ConnectionRepository, MessagePusher,
        ShutdownSignal,
    },
    infrastructure::{
        auth::SharedTokenAuthenticator, channel::ChannelReader,
        message_pusher::WebSocketMessagePusher, repository::InMemoryConnectionRepository,
    },
    usecase::{
        ConnectClientUseCase, DisconnectClientUseCase, DrainConnectionsUseCase,
        RelayOperatorMessageUseCase, SendMessageUseCase,
    },
};

use super::{
    handler::{health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// WebSocket fan-out server of one worker
///
/// # Example
///
/// ```ignore
/// let listener = bind_listener(&config.host, config.port).await?;
/// let channel = ChannelReader::new(BufReader::new(tokio::io::stdin()));
/// WorkerServer::new(&config, 0).serve(listener, channel).await?;
/// ```
pub struct WorkerServer {
    state: Arc<AppState>,
}

impl WorkerServer {
    pub fn new(config: &ServerConfig, worker_index: usize) -> Self {
        Self::with_clock(config, worker_index, Arc::new(SystemClock))
    }

    /// Wire the worker's object graph with the given clock.
    pub fn with_clock(config: &ServerConfig, worker_index: usize, clock: Arc<dyn Clock>) -> Self {
        let repository: Arc<dyn ConnectionRepository> =
            Arc::new(InMemoryConnectionRepository::new());
        let message_pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());
        let authenticator: Arc<dyn Authenticator> = Arc::new(SharedTokenAuthenticator::new(
            config.client_token.clone(),
            config.allowed_origins.clone(),
        ));

        let connect_client_usecase = Arc::new(ConnectClientUseCase::new(
            authenticator,
            repository.clone(),
            message_pusher.clone(),
        ));
        let disconnect_client_usecase = Arc::new(DisconnectClientUseCase::new(
            repository.clone(),
            message_pusher.clone(),
        ));
        let send_message_usecase = Arc::new(SendMessageUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            AdmissionController::new(config.admission_policy()),
            clock.clone(),
        ));
        let relay_operator_message_usecase = Arc::new(RelayOperatorMessageUseCase::new(
            repository.clone(),
            message_pusher.clone(),
        ));
        let drain_connections_usecase = Arc::new(DrainConnectionsUseCase::new(
            repository.clone(),
            message_pusher,
        ));

        Self {
            state: Arc::new(AppState::new(
                worker_index,
                connect_client_usecase,
                disconnect_client_usecase,
                send_message_usecase,
                relay_operator_message_usecase,
                drain_connections_usecase,
                repository,
                clock,
            )),
        }
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until the coordinator channel, or an OS signal, drains this worker.
    ///
    /// Drain order: final notice, close frames, wait for every connection
    /// task to finish, then stop accepting and release the listener.
    pub async fn serve<R>(
        self,
        listener: TcpListener,
        channel: ChannelReader<R>,
    ) -> Result<(), Box<dyn Error>>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let app = self.router();
        let local_addr = listener.local_addr()?;
        tracing::info!("Worker {} listening on {}", self.state.worker_index, local_addr);

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let lifecycle = tokio::spawn(run_lifecycle(self.state.clone(), channel, stop_tx));

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            // A dropped sender also stops the server
            let _ = stop_rx.await;
        })
        .await?;

        if let Err(e) = lifecycle.await {
            tracing::error!("UnhandledFault: lifecycle task failed: {}", e);
        }
        tracing::info!("Worker {} shutdown complete", self.state.worker_index);

        Ok(())
    }
}

async fn run_lifecycle<R>(
    state: Arc<AppState>,
    mut channel: ChannelReader<R>,
    stop: oneshot::Sender<()>,
) where
    R: AsyncBufRead + Unpin,
{
    let os_signal = shutdown_signal();
    tokio::pin!(os_signal);

    let signal = loop {
        tokio::select! {
            message = channel.next_message() => match message {
                Ok(Some(ChannelMessage::Operator(message))) => {
                    match state.relay_operator_message_usecase.execute(message).await {
                        Ok(count) => tracing::info!("Relayed operator message to {} connection(s)", count),
                        Err(e) => tracing::warn!("Failed to relay operator message: {}", e),
                    }
                }
                Ok(Some(ChannelMessage::Shutdown(signal))) => {
                    tracing::info!("Shutdown requested: {}", signal.reason);
                    break Some(signal);
                }
                Ok(None) => {
                    tracing::warn!("Coordinator channel closed");
                    break None;
                }
                Err(e) => {
                    tracing::error!("Coordinator channel failed: {}", e);
                    break None;
                }
            },
            _ = &mut os_signal => {
                break Some(ShutdownSignal::new(DEFAULT_SHUTDOWN_REASON));
            }
        }
    };

    drain(&state, signal.as_ref()).await;
    let _ = stop.send(());
}

/// Drain every connection of this worker. Only the first call does anything.
pub async fn drain(state: &AppState, signal: Option<&ShutdownSignal>) {
    if !state.begin_draining() {
        return;
    }

    match state.drain_connections_usecase.execute(signal).await {
        Ok(count) => tracing::info!("Draining {} connection(s)", count),
        Err(e) => tracing::warn!("Failed to send the final notice: {}", e),
    }
    state.tracker.wait_idle().await;
    tracing::info!("All connections closed");
}

/// Bind the public port so that sibling workers can bind it too.
pub async fn bind_listener(host: &str, port: u16) -> io::Result<TcpListener> {
    let addr: SocketAddr = tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("could not resolve {}:{}", host, port),
            )
        })?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    #[cfg(unix)]
    socket.set_reuseport(true)?;
    socket.bind(addr)?;
    socket.listen(1024)
}

/// Log panics as `UnhandledFault` instead of printing them to stderr.
///
/// Tokio keeps the worker alive when a spawned task panics; this only
/// makes the fault visible in the structured log.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        tracing::error!(location = %location, "UnhandledFault: {}", info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            client_token: "s3cret".to_string(),
            allowed_origins: vec!["*".to_string()],
            forbidden_words: vec!["spam".to_string()],
        }
    }

    #[tokio::test]
    async fn test_drain_is_idempotent() {
        // テスト項目: drain は 2 回呼ばれても 1 回目だけが実行される
        // given (前提条件):
        let server = WorkerServer::new(&config(), 0);
        let state = server.state();

        // when (操作):
        drain(&state, None).await;
        drain(&state, Some(&ShutdownSignal::new("again"))).await;

        // then (期待する結果):
        assert!(state.is_draining());
        assert!(!state.begin_draining());
        assert_eq!(state.tracker.live(), 0);
    }

    #[tokio::test]
    async fn test_bind_listener_allows_two_listeners_on_one_port() {
        // テスト項目: 同じポートに 2 つのリスナーを bind できる
        // given (前提条件):
        let first = bind_listener("127.0.0.1", 0).await.unwrap();
        let port = first.local_addr().unwrap().port();

        // when (操作):
        let second = bind_listener("127.0.0.1", port).await;

        // then (期待する結果):
        #[cfg(unix)]
        assert!(second.is_ok());
        #[cfg(not(unix))]
        let _ = second;
    }
}
