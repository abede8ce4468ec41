//! Integration tests for one worker, served in-process on an ephemeral port.
//!
//! The coordinator channel is replaced by an in-memory duplex pipe so the
//! tests can relay operator messages and request shutdown directly.

use std::{net::SocketAddr, time::Duration};

use futures_util::{SinkExt, StreamExt};
use hiroba_server::{
    config::ServerConfig,
    infrastructure::channel::ChannelReader,
    ui::{WorkerServer, bind_listener, handler::HealthDto},
};
use serde_json::{Value, json};
use tokio::{
    io::{AsyncWriteExt, BufReader, DuplexStream},
    net::TcpStream,
    task::JoinHandle,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        self,
        client::IntoClientRequest,
        http::{HeaderValue, header::ORIGIN},
        protocol::{Message, frame::coding::CloseCode},
    },
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TOKEN: &str = "s3cret";

/// Helper struct to manage an in-process worker
struct TestWorker {
    addr: SocketAddr,
    /// Write end of the coordinator channel
    channel: Option<DuplexStream>,
    handle: JoinHandle<()>,
}

impl TestWorker {
    async fn start() -> Self {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            client_token: TOKEN.to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            forbidden_words: vec!["spam".to_string()],
        };

        let listener = bind_listener(&config.host, config.port).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (coordinator_side, worker_side) = tokio::io::duplex(4096);
        let channel = ChannelReader::new(BufReader::new(worker_side));
        let server = WorkerServer::new(&config, 0);

        let handle = tokio::spawn(async move {
            if let Err(e) = server.serve(listener, channel).await {
                panic!("worker failed: {}", e);
            }
        });

        TestWorker {
            addr,
            channel: Some(coordinator_side),
            handle,
        }
    }

    fn ws_url(&self, query: &str) -> String {
        format!("ws://{}/ws?{}", self.addr, query)
    }

    async fn connect(&self, name: &str) -> WsStream {
        let (ws, _) = connect_async(self.ws_url(&format!("token={}&name={}", TOKEN, name)))
            .await
            .expect("Failed to connect");
        ws
    }

    async fn send_channel_line(&mut self, line: &str) {
        let channel = self.channel.as_mut().expect("channel already closed");
        channel.write_all(line.as_bytes()).await.unwrap();
        channel.write_all(b"\n").await.unwrap();
        channel.flush().await.unwrap();
    }

    async fn health(&self) -> HealthDto {
        reqwest::get(format!("http://{}/api/health", self.addr))
            .await
            .unwrap()
            .json::<HealthDto>()
            .await
            .unwrap()
    }

    async fn wait_for_exit(self) {
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("worker did not stop in time")
            .expect("worker task failed");
    }
}

/// Receive the next JSON text frame
async fn next_json(ws: &mut WsStream) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(2), ws.next())
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

/// Assert nothing arrives for a short while
async fn assert_silent(ws: &mut WsStream) {
    let result = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(result.is_err(), "unexpected frame: {:?}", result);
}

/// Receive the close frame that ends a drain
async fn expect_close(ws: &mut WsStream) {
    let message = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for close")
        .expect("stream ended")
        .expect("websocket error");
    match message {
        Message::Close(Some(frame)) => assert_eq!(frame.code, CloseCode::Away),
        other => panic!("expected close, got {:?}", other),
    }
}

fn handshake_status(result: Result<(WsStream, tungstenite::handshake::client::Response), tungstenite::Error>) -> u16 {
    match result {
        Err(tungstenite::Error::Http(response)) => response.status().as_u16(),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("handshake unexpectedly succeeded"),
    }
}

#[tokio::test]
async fn test_handshake_without_token_is_rejected() {
    // テスト項目: トークン無しのハンドシェイクは 401 で拒否される
    // given (前提条件):
    let worker = TestWorker::start().await;

    // when (操作):
    let result = connect_async(worker.ws_url("name=alice")).await;

    // then (期待する結果):
    assert_eq!(handshake_status(result), 401);
    assert_eq!(worker.health().await.connections, 0);
}

#[tokio::test]
async fn test_handshake_with_wrong_token_is_rejected() {
    // テスト項目: 誤ったトークンのハンドシェイクは 401 で拒否される
    // given (前提条件):
    let worker = TestWorker::start().await;

    // when (操作):
    let result = connect_async(worker.ws_url("token=wrong")).await;

    // then (期待する結果):
    assert_eq!(handshake_status(result), 401);
}

#[tokio::test]
async fn test_handshake_from_unknown_origin_is_forbidden() {
    // テスト項目: 許可されていない Origin からのハンドシェイクは 403 で拒否される
    // given (前提条件):
    let worker = TestWorker::start().await;
    let mut request = worker
        .ws_url(&format!("token={}", TOKEN))
        .into_client_request()
        .unwrap();
    request
        .headers_mut()
        .insert(ORIGIN, HeaderValue::from_static("http://evil.example"));

    // when (操作):
    let result = connect_async(request).await;

    // then (期待する結果):
    assert_eq!(handshake_status(result), 403);
}

#[tokio::test]
async fn test_message_is_broadcast_to_everyone_but_the_sender() {
    // テスト項目: 受理されたメッセージは送信者以外の全接続に届く
    // given (前提条件):
    let worker = TestWorker::start().await;
    let mut alice = worker.connect("alice").await;
    let mut bob = worker.connect("bob").await;
    let mut carol = worker.connect("carol").await;

    // when (操作):
    alice.send(Message::Text("hello".into())).await.unwrap();

    // then (期待する結果):
    let expected = json!({"type": "message", "origin": "client", "text": "hello"});
    assert_eq!(next_json(&mut bob).await, expected);
    assert_eq!(next_json(&mut carol).await, expected);
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn test_markup_is_stripped_before_broadcast() {
    // テスト項目: マークアップは除去されてから配信される
    // given (前提条件):
    let worker = TestWorker::start().await;
    let mut alice = worker.connect("alice").await;
    let mut bob = worker.connect("bob").await;

    // when (操作):
    alice
        .send(Message::Text("<b>hi</b><script>alert(1)</script>".into()))
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(next_json(&mut bob).await["text"], "hi");
}

#[tokio::test]
async fn test_sixth_message_in_one_second_is_rate_limited() {
    // テスト項目: 1 秒以内の 6 通目はレート制限で拒否され、送信者にだけ通知される
    // given (前提条件):
    let worker = TestWorker::start().await;
    let mut alice = worker.connect("alice").await;
    let mut bob = worker.connect("bob").await;

    // when (操作):
    for i in 0..6 {
        alice
            .send(Message::Text(format!("message {}", i).into()))
            .await
            .unwrap();
    }

    // then (期待する結果):
    for i in 0..5 {
        assert_eq!(next_json(&mut bob).await["text"], format!("message {}", i));
    }
    assert_silent(&mut bob).await;
    assert_eq!(
        next_json(&mut alice).await,
        json!({"type": "error", "reason": "rate limit exceeded"})
    );
}

#[tokio::test]
async fn test_forbidden_and_invalid_messages_are_rejected() {
    // テスト項目: 禁止語・長すぎるメッセージ・バイナリは拒否され、接続は維持される
    // given (前提条件):
    let worker = TestWorker::start().await;
    let mut alice = worker.connect("alice").await;
    let mut bob = worker.connect("bob").await;

    // when (操作):
    alice.send(Message::Text("buy spam now".into())).await.unwrap();
    alice.send(Message::Text("x".repeat(201).into())).await.unwrap();
    alice.send(Message::Binary(vec![1, 2, 3].into())).await.unwrap();
    alice.send(Message::Text("still here".into())).await.unwrap();

    // then (期待する結果):
    assert_eq!(next_json(&mut alice).await["reason"], "forbidden content");
    assert_eq!(next_json(&mut alice).await["reason"], "invalid message");
    assert_eq!(next_json(&mut alice).await["reason"], "invalid message");
    assert_eq!(next_json(&mut bob).await["text"], "still here");
}

#[tokio::test]
async fn test_operator_message_reaches_every_connection() {
    // テスト項目: オペレーターのメッセージは全接続に origin=server で届く
    // given (前提条件):
    let mut worker = TestWorker::start().await;
    let mut alice = worker.connect("alice").await;
    let mut bob = worker.connect("bob").await;

    // when (操作):
    worker
        .send_channel_line(r#"{"from":"server","message":"maintenance at 5"}"#)
        .await;

    // then (期待する結果):
    let expected = json!({"type": "message", "origin": "server", "text": "maintenance at 5"});
    assert_eq!(next_json(&mut alice).await, expected);
    assert_eq!(next_json(&mut bob).await, expected);
}

#[tokio::test]
async fn test_client_messages_stay_on_their_worker() {
    // テスト項目: クライアントのメッセージは別ワーカーの接続には届かず、オペレーターのメッセージは両方に届く
    // given (前提条件):
    let mut worker_a = TestWorker::start().await;
    let mut worker_b = TestWorker::start().await;
    let mut alice = worker_a.connect("alice").await;
    let mut bob = worker_a.connect("bob").await;
    let mut carol = worker_b.connect("carol").await;

    // when (操作):
    alice.send(Message::Text("only on a".into())).await.unwrap();

    // then (期待する結果):
    assert_eq!(next_json(&mut bob).await["text"], "only on a");
    assert_silent(&mut carol).await;

    // when (操作):
    let line = r#"{"from":"server","message":"to everyone"}"#;
    worker_a.send_channel_line(line).await;
    worker_b.send_channel_line(line).await;

    // then (期待する結果):
    let expected = json!({"type": "message", "origin": "server", "text": "to everyone"});
    assert_eq!(next_json(&mut bob).await, expected);
    assert_eq!(next_json(&mut carol).await, expected);
}

#[tokio::test]
async fn test_malformed_channel_line_is_ignored() {
    // テスト項目: 不正なチャネル行は無視され、ワーカーは動き続ける
    // given (前提条件):
    let mut worker = TestWorker::start().await;
    let mut alice = worker.connect("alice").await;

    // when (操作):
    worker.send_channel_line("not json").await;
    worker
        .send_channel_line(r#"{"from":"client","message":"spoofed"}"#)
        .await;
    worker
        .send_channel_line(r#"{"from":"server","message":"real"}"#)
        .await;

    // then (期待する結果):
    assert_eq!(next_json(&mut alice).await["text"], "real");
    assert_eq!(worker.health().await.status, "ok");
}

#[tokio::test]
async fn test_shutdown_sends_notice_then_close_and_stops_worker() {
    // テスト項目: シャットダウンで最終通知、Close の順に届き、ワーカーが停止する
    // given (前提条件):
    let mut worker = TestWorker::start().await;
    let mut alice = worker.connect("alice").await;
    let mut bob = worker.connect("bob").await;

    // when (操作):
    worker
        .send_channel_line(r#"{"shutdown":true,"message":"the server is shutting down"}"#)
        .await;

    // then (期待する結果):
    let notice = json!({"type": "message", "origin": "server", "text": "the server is shutting down"});
    assert_eq!(next_json(&mut alice).await, notice);
    expect_close(&mut alice).await;
    assert_eq!(next_json(&mut bob).await, notice);
    expect_close(&mut bob).await;
    drop(alice);
    drop(bob);
    worker.wait_for_exit().await;
}

#[tokio::test]
async fn test_channel_eof_drains_without_notice() {
    // テスト項目: チャネルが閉じると通知無しで接続を閉じてワーカーが停止する
    // given (前提条件):
    let mut worker = TestWorker::start().await;
    let mut alice = worker.connect("alice").await;

    // when (操作):
    worker.channel.take();

    // then (期待する結果):
    expect_close(&mut alice).await;
    drop(alice);
    worker.wait_for_exit().await;
}

#[tokio::test]
async fn test_health_reports_connections() {
    // テスト項目: ヘルスチェックは状態・ワーカー番号・接続数を返す
    // given (前提条件):
    let worker = TestWorker::start().await;
    let _alice = worker.connect("alice").await;
    let _bob = worker.connect("bob").await;

    // when (操作):
    let health = worker.health().await;

    // then (期待する結果):
    assert_eq!(health.status, "ok");
    assert_eq!(health.worker, 0);
    assert_eq!(health.pid, std::process::id());
    assert_eq!(health.connections, 2);
}

#[tokio::test]
async fn test_closed_connection_is_removed_from_registry() {
    // テスト項目: クライアントが切断すると接続数から外れる
    // given (前提条件):
    let worker = TestWorker::start().await;
    let mut alice = worker.connect("alice").await;
    let _bob = worker.connect("bob").await;

    // when (操作):
    alice.close(None).await.unwrap();
    drop(alice);

    // then (期待する結果):
    let mut connections = usize::MAX;
    for _ in 0..20 {
        connections = worker.health().await.connections;
        if connections == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(connections, 1);
}
