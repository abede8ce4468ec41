//! WebSocket connection handlers.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ConnectInfo, Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{AuthError, ConnectionId, Handshake, OutboundFrame, RawMessage},
    ui::{state::AppState, tracker::TrackerGuard},
    usecase::{ConnectError, SendMessageError, SendOutcome},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
    pub name: Option<String>,
}

/// Build the handshake from the query and the request headers.
///
/// A `token` query parameter wins over an `Authorization: Bearer` header.
pub fn handshake_from_request(query: ConnectQuery, headers: &HeaderMap) -> Handshake {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    Handshake {
        token: query.token.or(bearer),
        origin,
        name: query.name,
    }
}

fn status_for(error: &ConnectError) -> StatusCode {
    match error {
        ConnectError::AuthenticationFailed(AuthError::OriginNotAllowed(_)) => StatusCode::FORBIDDEN,
        ConnectError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
        ConnectError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Response {
    if state.is_draining() {
        tracing::debug!("Refusing connection while draining");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    if !state.handshake_limiter.try_acquire(peer.ip(), state.now()) {
        tracing::warn!(peer = %peer.ip(), "Too many connection attempts");
        return StatusCode::TOO_MANY_REQUESTS.into_response();
    }

    let handshake = handshake_from_request(query, &headers);

    // Held until the socket task ends, so a drain waits for this connection too
    let guard = state.tracker.enter();

    let (tx, rx) = mpsc::unbounded_channel();
    let connection = match state.connect_client_usecase.execute(&handshake, tx).await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!("AuthenticationFailed: {}", e);
            return status_for(&e).into_response();
        }
    };
    let connection_id = connection.id;
    let subject = connection.identity.subject;

    // A drain that started while we were registering has already sent its
    // close frames, possibly before this connection was attached.
    if state.is_draining() {
        state
            .disconnect_client_usecase
            .execute(&connection_id)
            .await;
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    tracing::info!(
        connection = %connection_id,
        subject = %subject,
        "Client connected"
    );

    let failed_state = state.clone();
    ws.on_failed_upgrade(move |e| {
        tracing::error!(connection = %connection_id, "TransportFault: upgrade failed: {}", e);
        tokio::spawn(async move {
            failed_state
                .disconnect_client_usecase
                .execute(&connection_id)
                .await;
        });
    })
    .on_upgrade(move |socket| handle_socket(socket, state, connection_id, subject, rx, guard))
}

/// Spawns a task that drains the outbound queue into the WebSocket sender.
///
/// `OutboundFrame::Close` sends a close frame and ends the task, so every
/// frame queued before it reaches the client first.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<OutboundFrame>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                OutboundFrame::Text(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                OutboundFrame::Close => {
                    let close = Message::Close(Some(CloseFrame {
                        code: close_code::AWAY,
                        reason: "server shutting down".into(),
                    }));
                    if let Err(e) = sender.send(close).await {
                        tracing::debug!("Failed to send close frame: {}", e);
                    }
                    break;
                }
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    connection_id: ConnectionId,
    subject: String,
    rx: mpsc::UnboundedReceiver<OutboundFrame>,
    _guard: TrackerGuard,
) {
    let (sender, mut receiver) = socket.split();

    let state_clone = state.clone();

    // Spawn a task to receive messages from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!(connection = %connection_id, "TransportFault: {}", e);
                    break;
                }
            };

            let raw = match &msg {
                Message::Text(text) => RawMessage::Text(text.as_str()),
                Message::Binary(_) => RawMessage::NonText,
                Message::Close(_) => {
                    tracing::debug!(connection = %connection_id, "Client requested close");
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                Message::Ping(_) | Message::Pong(_) => continue,
            };

            match state_clone
                .send_message_usecase
                .execute(&connection_id, raw)
                .await
            {
                Ok(SendOutcome::Delivered { targets }) => {
                    tracing::debug!(
                        connection = %connection_id,
                        "Delivered message to {} peer(s)",
                        targets.len()
                    );
                }
                Ok(SendOutcome::Rejected(reason)) => {
                    tracing::warn!(connection = %connection_id, "Rejected message: {}", reason);
                }
                Err(SendMessageError::UnknownConnection(_)) => {
                    // Already removed by a concurrent disconnect
                    tracing::debug!(connection = %connection_id, "Dropped message of a closed connection");
                }
                Err(e) => {
                    tracing::warn!(connection = %connection_id, "Failed to handle message: {}", e);
                }
            }
        }
    });

    // Spawn a task to push queued frames to this client
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        result = &mut recv_task => {
            log_task_panic(&connection_id, result);
            send_task.abort();
        }
        result = &mut send_task => {
            log_task_panic(&connection_id, result);
            recv_task.abort();
        }
    };

    state
        .disconnect_client_usecase
        .execute(&connection_id)
        .await;
    tracing::info!(
        connection = %connection_id,
        subject = %subject,
        "Client disconnected"
    );
}

fn log_task_panic(connection_id: &ConnectionId, result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!(connection = %connection_id, "UnhandledFault: connection task panicked: {}", e);
        }
    }
}
