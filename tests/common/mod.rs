//! In-process WebSocket server for integration tests.
#![allow(dead_code)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use whitebit_api_client::ws::{WhitebitWsClient, WsConfig, WsConnection};

const WAIT: Duration = Duration::from_secs(5);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Accepts one client and exposes its frames to the test.
pub struct MockServer {
    pub url: String,
    incoming: mpsc::UnboundedReceiver<Value>,
    outgoing: mpsc::UnboundedSender<Message>,
}

impl MockServer {
    pub async fn start() -> Self {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let (in_tx, incoming) = mpsc::unbounded_channel();
        let (outgoing, mut out_rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = accept_async(tcp).await.unwrap();
            let (mut sink, mut stream) = ws.split();
            loop {
                tokio::select! {
                    out = out_rx.recv() => match out {
                        Some(msg) => {
                            if sink.send(msg).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                    msg = stream.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            let value: Value = serde_json::from_str(text.as_str()).unwrap();
                            let _ = in_tx.send(value);
                        }
                        // Keep reading so the close reply gets flushed.
                        Some(Ok(_)) => {}
                        Some(Err(_)) | None => break,
                    },
                }
            }
        });

        Self {
            url,
            incoming,
            outgoing,
        }
    }

    pub async fn connect(&self) -> WsConnection {
        self.connect_with(WsConfig::default()).await
    }

    pub async fn connect_with(&self, config: WsConfig) -> WsConnection {
        let mut client = WhitebitWsClient::with_url(self.url.clone());
        *client.config_mut() = config;
        client.connect().await.unwrap()
    }

    /// Next frame the client sent.
    pub async fn next_request(&mut self) -> Value {
        tokio::time::timeout(WAIT, self.incoming.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("server task stopped")
    }

    pub async fn no_request_within(&mut self, window: Duration) -> bool {
        tokio::time::timeout(window, self.incoming.recv()).await.is_err()
    }

    pub fn send(&self, frame: Value) {
        self.outgoing
            .send(Message::Text(frame.to_string().into()))
            .unwrap();
    }

    pub fn respond(&self, request: &Value, result: Value) {
        self.send(json!({"id": request["id"], "result": result, "error": null}));
    }

    pub fn push(&self, channel: &str, params: Value) {
        self.send(json!({"id": null, "method": channel, "params": params}));
    }

    pub fn close(&self) {
        let _ = self.outgoing.send(Message::Close(None));
    }

    /// Round-trip a `ping` so every command queued before it has been applied
    /// by the read loop.
    pub async fn barrier(&mut self, conn: &WsConnection) {
        let conn = conn.clone();
        let pending = tokio::spawn(async move { conn.ping().await });
        let request = self.next_request().await;
        assert_eq!(request["method"], "ping");
        self.respond(&request, json!("pong"));
        assert_eq!(pending.await.unwrap().unwrap(), "pong");
    }
}

/// Receive with a deadline so a broken test fails instead of hanging.
pub async fn within<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(WAIT, future)
        .await
        .expect("timed out")
}
