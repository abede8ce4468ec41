//! Integration tests for the coordinator process and its worker pool.

use std::{
    io::Write,
    process::{Child, ChildStdin, Command, ExitStatus, Stdio},
    time::{Duration, Instant},
};

use futures_util::StreamExt;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TOKEN: &str = "s3cret";

/// Helper struct to manage the coordinator process lifecycle
struct TestCluster {
    process: Child,
    stdin: Option<ChildStdin>,
    port: u16,
}

impl TestCluster {
    /// Start a coordinator with the given number of workers
    fn start(port: u16, workers: usize) -> Self {
        let mut process = Command::new(env!("CARGO_BIN_EXE_hiroba-server"))
            .args([
                "--port",
                &port.to_string(),
                "--client-token",
                TOKEN,
                "--allowed-origins",
                "*",
                "--workers",
                &workers.to_string(),
            ])
            .env("RUST_LOG", "warn")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to start server");

        let stdin = process.stdin.take();

        TestCluster {
            process,
            stdin,
            port,
        }
    }

    fn url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws?token={}", self.port, TOKEN)
    }

    /// Connect once a worker accepts connections
    async fn connect(&self) -> WsStream {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            match connect_async(self.url()).await {
                Ok((ws, _)) => return ws,
                Err(_) if Instant::now() < deadline => {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                Err(e) => panic!("workers never became ready: {}", e),
            }
        }
    }

    /// Type a line into the operator console
    fn send_console_line(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().expect("console closed");
        writeln!(stdin, "{}", line).unwrap();
        stdin.flush().unwrap();
    }

    /// Wait for the coordinator to exit with timeout
    async fn wait_for_exit(&mut self, timeout: Duration) -> Result<ExitStatus, String> {
        let start = Instant::now();
        loop {
            if let Ok(Some(status)) = self.process.try_wait() {
                return Ok(status);
            }
            if start.elapsed() > timeout {
                return Err(format!("Timeout waiting for coordinator after {:?}", timeout));
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for TestCluster {
    fn drop(&mut self) {
        // Closing the console pipe and the coordinator ends the workers too
        self.stdin.take();
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

async fn next_json(ws: &mut WsStream) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        match message {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

async fn expect_close(ws: &mut WsStream) {
    let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for close")
        .expect("stream ended")
        .expect("websocket error");
    assert!(matches!(message, Message::Close(_)), "got {:?}", message);
}

#[cfg(unix)]
#[tokio::test]
async fn test_console_line_reaches_clients_on_every_worker() {
    // テスト項目: コンソールの入力は全ワーカーの全接続に届く
    // given (前提条件):
    let mut cluster = TestCluster::start(18380, 2);
    let mut clients = Vec::new();
    for _ in 0..4 {
        clients.push(cluster.connect().await);
    }

    // when (操作):
    cluster.send_console_line("maintenance at 5");

    // then (期待する結果):
    let expected = json!({"type": "message", "origin": "server", "text": "maintenance at 5"});
    for client in &mut clients {
        assert_eq!(next_json(client).await, expected);
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_shutdown_command_drains_clients_and_exits() {
    // テスト項目: shutdown コマンドで全クライアントに通知と Close が届き、コーディネーターが終了する
    // given (前提条件):
    let mut cluster = TestCluster::start(18381, 2);
    let mut alice = cluster.connect().await;
    let mut bob = cluster.connect().await;

    // when (操作):
    cluster.send_console_line("shutdown");

    // then (期待する結果):
    let notice = json!({"type": "message", "origin": "server", "text": "the server is shutting down"});
    assert_eq!(next_json(&mut alice).await, notice);
    expect_close(&mut alice).await;
    assert_eq!(next_json(&mut bob).await, notice);
    expect_close(&mut bob).await;

    let status = cluster
        .wait_for_exit(Duration::from_secs(5))
        .await
        .expect("coordinator should exit after shutdown");
    assert!(status.success(), "coordinator exited with {:?}", status);
}

#[test]
fn test_missing_client_token_fails_to_start() {
    // テスト項目: クライアントトークンが無いとサーバーは起動しない
    // given (前提条件):
    let mut command = Command::new(env!("CARGO_BIN_EXE_hiroba-server"));
    command
        .args(["--port", "18382"])
        .env_remove("CLIENT_TOKEN")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    // when (操作):
    let status = command.status().expect("Failed to run server");

    // then (期待する結果):
    assert!(!status.success());
}
