//! WebSocket client session management.

use futures_util::{SinkExt, StreamExt};
use hiroba_server::infrastructure::dto::websocket::ServerFrame;
use hiroba_shared::time::now_millis;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        self,
        client::IntoClientRequest,
        http::{HeaderValue, header::AUTHORIZATION},
        protocol::Message,
    },
};

use crate::{
    domain::{build_connect_url, classify_handshake_status},
    error::ClientError,
};

use super::{
    formatter::MessageFormatter,
    ui::{PROMPT, redisplay_prompt},
};

/// Run the WebSocket client session
///
/// The token travels in an `Authorization: Bearer` header; the display
/// name, if any, in the `name` query parameter.
pub async fn run_client_session(
    url: &str,
    token: &str,
    name: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let url = build_connect_url(url, name);
    let mut request = url.as_str().into_client_request()?;
    request.headers_mut().insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token))?,
    );

    let (ws_stream, _response) = match connect_async(request).await {
        Ok(result) => result,
        Err(tungstenite::Error::Http(response)) => {
            return Err(Box::new(classify_handshake_status(
                response.status().as_u16(),
            )));
        }
        Err(e) => return Err(Box::new(ClientError::ConnectionError(e.to_string()))),
    };

    tracing::info!("Connected to {}", url);
    println!("\nType messages and press Enter to send. Press Ctrl+C to exit.\n");

    let (mut write, mut read) = ws_stream.split();

    // Spawn a task to handle incoming messages
    let mut read_task = tokio::spawn(async move {
        let mut connection_error = false;

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let formatted = match serde_json::from_str::<ServerFrame>(&text) {
                        Ok(ServerFrame::Broadcast(message)) => {
                            MessageFormatter::format_broadcast(&message)
                        }
                        Ok(ServerFrame::Error(message)) => MessageFormatter::format_rejected(&message),
                        Err(_) => MessageFormatter::format_raw_message(&text),
                    };
                    print!("{}", formatted);
                    redisplay_prompt();
                }
                Ok(Message::Close(frame)) => {
                    match frame {
                        Some(frame) => tracing::info!("Server closed the connection: {}", frame.reason.as_str()),
                        None => tracing::info!("Server closed the connection"),
                    }
                    connection_error = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    connection_error = true;
                    break;
                }
                _ => {}
            }
        }

        connection_error
    });

    // Create channel for rustyline input
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            // Channel closed, exit thread
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    // Spawn a task to send typed lines as text frames
    let mut write_task = tokio::spawn(async move {
        let mut write_error = false;

        while let Some(line) = input_rx.recv().await {
            if let Err(e) = write.send(Message::Text(line.into())).await {
                tracing::warn!("Failed to send message: {}", e);
                write_error = true;
                break;
            }

            let formatted = MessageFormatter::format_sent_confirmation(now_millis());
            print!("{}", formatted);
            redisplay_prompt();
        }

        write_error
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        read_result = &mut read_task => {
            write_task.abort();
            let connection_error = read_result.unwrap_or(false);
            if connection_error {
                return Err(Box::new(ClientError::ConnectionError(
                    "Connection lost".to_string(),
                )));
            }
        }
        write_result = &mut write_task => {
            read_task.abort();
            let write_error = write_result.unwrap_or(false);
            if write_error {
                return Err(Box::new(ClientError::ConnectionError(
                    "Connection lost".to_string(),
                )));
            }
        }
    }

    Ok(())
}
