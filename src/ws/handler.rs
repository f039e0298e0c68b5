//! The read loop: sole owner of the pending-request table and the
//! subscription registry.
//!
//! Callers never touch either table directly. They send a
//! [`HandlerCommand`] and the loop applies it between frames, so a request
//! is always registered before its frame is written and a response can never
//! race ahead of its table entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::WhitebitError;
use crate::ws::messages::{InboundFrame, WsRequest, methods};
use crate::ws::state::{ConnectionState, StateCell};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;
type WsReceiver = SplitStream<WsStream>;

pub(crate) type ResponseSender = oneshot::Sender<Result<Value, WhitebitError>>;

/// Commands sent from connection handles to the read loop.
pub(crate) enum HandlerCommand {
    /// Register a pending request, then write its frame.
    Request {
        request: WsRequest,
        response_tx: ResponseSender,
    },
    /// Write a frame nobody waits on (subscribe/unsubscribe frames).
    Send { request: WsRequest },
    /// Route pushes for `channel` to `sender`, replacing any previous target.
    Subscribe {
        channel: String,
        token: u64,
        sender: mpsc::UnboundedSender<Value>,
    },
    /// Stop routing pushes for `channel`. With a token, only that exact
    /// subscription is removed, never one that replaced it.
    Unsubscribe { channel: String, token: Option<u64> },
    /// The caller gave up on request `id`.
    Cancel { id: u64 },
    /// Start the close handshake.
    Close,
}

impl std::fmt::Debug for HandlerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request { request, .. } => f
                .debug_struct("Request")
                .field("id", &request.id)
                .field("method", &request.method)
                .finish(),
            Self::Send { request } => f
                .debug_struct("Send")
                .field("id", &request.id)
                .field("method", &request.method)
                .finish(),
            Self::Subscribe { channel, token, .. } => {
                f.debug_tuple("Subscribe").field(channel).field(token).finish()
            }
            Self::Unsubscribe { channel, token } => {
                f.debug_tuple("Unsubscribe").field(channel).field(token).finish()
            }
            Self::Cancel { id } => f.debug_tuple("Cancel").field(id).finish(),
            Self::Close => write!(f, "Close"),
        }
    }
}

/// An in-flight request awaiting its response frame.
struct PendingRequest {
    method: String,
    response_tx: ResponseSender,
    sent_at: Instant,
}

/// Delivery target for one channel.
struct Subscriber {
    token: u64,
    sender: mpsc::UnboundedSender<Value>,
}

/// Whether the loop keeps running after a step.
enum Step {
    Continue,
    Stop(String),
}

pub(crate) struct FeedHandler {
    sink: WsSink,
    receiver: WsReceiver,
    cmd_rx: mpsc::UnboundedReceiver<HandlerCommand>,
    state: Arc<StateCell>,
    next_id: Arc<AtomicU64>,
    pending: HashMap<u64, PendingRequest>,
    subscriptions: HashMap<String, Subscriber>,
    commands_open: bool,
    ping_interval: Option<Interval>,
    close_timeout: Duration,
    close_deadline: Option<Instant>,
}

impl FeedHandler {
    pub(crate) fn new(
        stream: WsStream,
        cmd_rx: mpsc::UnboundedReceiver<HandlerCommand>,
        state: Arc<StateCell>,
        next_id: Arc<AtomicU64>,
        ping_interval: Option<Duration>,
        close_timeout: Duration,
    ) -> Self {
        let (sink, receiver) = stream.split();
        let ping_interval = ping_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        Self {
            sink,
            receiver,
            cmd_rx,
            state,
            next_id,
            pending: HashMap::new(),
            subscriptions: HashMap::new(),
            commands_open: true,
            ping_interval,
            close_timeout,
            close_deadline: None,
        }
    }

    /// Run until the transport closes, then fail whatever is still waiting.
    pub(crate) async fn run(mut self) {
        let reason = loop {
            let step = tokio::select! {
                cmd = self.cmd_rx.recv(), if self.commands_open => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    // Every handle is gone; nobody can observe this connection.
                    None => {
                        self.commands_open = false;
                        self.begin_close().await
                    }
                },
                msg = self.receiver.next() => match msg {
                    Some(Ok(msg)) => self.handle_message(msg),
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket error: {}", e);
                        Step::Stop(format!("transport error: {e}"))
                    }
                    None => Step::Stop("stream ended".into()),
                },
                _ = next_tick(&mut self.ping_interval) => self.send_keepalive().await,
                _ = until(self.close_deadline) => {
                    Step::Stop("close handshake timed out".into())
                }
            };

            if let Step::Stop(reason) = step {
                break reason;
            }
        };

        self.shutdown(&reason);
    }

    async fn handle_command(&mut self, cmd: HandlerCommand) -> Step {
        match cmd {
            HandlerCommand::Request {
                request,
                response_tx,
            } => self.send_request(request, response_tx).await,
            HandlerCommand::Send { request } => {
                if self.state.get() != ConnectionState::Open {
                    tracing::debug!(method = %request.method, "Skipping frame on a closing connection");
                    return Step::Continue;
                }
                self.write(&request).await
            }
            HandlerCommand::Subscribe {
                channel,
                token,
                sender,
            } => {
                let subscriber = Subscriber { token, sender };
                if self.subscriptions.insert(channel.clone(), subscriber).is_some() {
                    tracing::debug!(%channel, "Replaced existing subscription");
                } else {
                    tracing::debug!(%channel, "Subscribed");
                }
                Step::Continue
            }
            HandlerCommand::Unsubscribe { channel, token } => {
                let matches = match (self.subscriptions.get(&channel), token) {
                    (Some(current), Some(token)) => current.token == token,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if matches {
                    self.subscriptions.remove(&channel);
                    tracing::debug!(%channel, "Unsubscribed");
                }
                Step::Continue
            }
            HandlerCommand::Cancel { id } => {
                if let Some(pending) = self.pending.remove(&id) {
                    tracing::debug!(id, method = %pending.method, "Request cancelled by caller");
                }
                Step::Continue
            }
            HandlerCommand::Close => self.begin_close().await,
        }
    }

    async fn send_request(&mut self, request: WsRequest, response_tx: ResponseSender) -> Step {
        if self.state.get() != ConnectionState::Open {
            let _ = response_tx.send(Err(WhitebitError::closed(format!(
                "connection is {}",
                self.state.get()
            ))));
            return Step::Continue;
        }

        let text = match request.to_text() {
            Ok(text) => text,
            Err(e) => {
                let _ = response_tx.send(Err(e));
                return Step::Continue;
            }
        };

        let id = request.id;
        let previous = self.pending.insert(
            id,
            PendingRequest {
                method: request.method,
                response_tx,
                sent_at: Instant::now(),
            },
        );
        if let Some(previous) = previous {
            let _ = previous.response_tx.send(Err(WhitebitError::Protocol(format!(
                "request id {id} reused"
            ))));
        }

        if let Err(e) = self.sink.send(WsMessage::Text(text.into())).await {
            if let Some(pending) = self.pending.remove(&id) {
                let _ = pending.response_tx.send(Err(WhitebitError::WebSocketMsg(format!(
                    "Failed to send message: {e}"
                ))));
            }
            return Step::Stop(format!("write failed: {e}"));
        }

        Step::Continue
    }

    async fn write(&mut self, request: &WsRequest) -> Step {
        let text = match request.to_text() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(method = %request.method, "Failed to serialize frame: {}", e);
                return Step::Continue;
            }
        };

        match self.sink.send(WsMessage::Text(text.into())).await {
            Ok(()) => Step::Continue,
            Err(e) => Step::Stop(format!("write failed: {e}")),
        }
    }

    async fn send_keepalive(&mut self) -> Step {
        if self.state.get() != ConnectionState::Open {
            return Step::Continue;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let ping = WsRequest::new(id, methods::PING, json!([]));
        self.write(&ping).await
    }

    async fn begin_close(&mut self) -> Step {
        if self.close_deadline.is_some() {
            return Step::Continue;
        }
        self.state.set(ConnectionState::Closing);
        self.close_deadline = Some(Instant::now() + self.close_timeout);
        self.ping_interval = None;

        if let Err(e) = self.sink.send(WsMessage::Close(None)).await {
            tracing::debug!("Close frame not delivered: {}", e);
            return Step::Stop("closed by client".into());
        }
        Step::Continue
    }

    fn handle_message(&mut self, msg: WsMessage) -> Step {
        match msg {
            WsMessage::Text(text) => self.dispatch(&text),
            WsMessage::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => self.dispatch(text),
                Err(e) => tracing::warn!("Dropping non UTF-8 binary frame: {}", e),
            },
            WsMessage::Close(frame) => {
                let reason = match frame {
                    Some(frame) if !frame.reason.is_empty() => {
                        format!("closed by server: {}", frame.reason.as_str())
                    }
                    _ if self.close_deadline.is_some() => "closed by client".to_string(),
                    _ => "closed by server".to_string(),
                };
                return Step::Stop(reason);
            }
            // Ping/pong replies are handled by tungstenite.
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
        }
        Step::Continue
    }

    /// Route one frame. A matching pending request takes priority over any
    /// channel the frame might also name.
    fn dispatch(&mut self, text: &str) {
        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Failed to parse WebSocket message: {}", e);
                return;
            }
        };

        if let Some(id) = frame.id() {
            if let Some(pending) = self.pending.remove(&id) {
                tracing::trace!(
                    id,
                    method = %pending.method,
                    elapsed_ms = pending.sent_at.elapsed().as_millis() as u64,
                    "Response received"
                );
                if pending.response_tx.send(frame.into_response()).is_err() {
                    tracing::debug!(id, "Caller went away before its response arrived");
                }
                return;
            }
        }

        if frame.channel().is_some() {
            self.route_push(frame);
            return;
        }

        match frame.id() {
            Some(id) => tracing::debug!(id, "Dropping response with no pending request"),
            None => tracing::debug!("Unknown message format: {}", text),
        }
    }

    fn route_push(&mut self, frame: InboundFrame) {
        let Some(push) = frame.into_push() else {
            tracing::warn!("Dropping malformed push frame");
            return;
        };

        match self.subscriptions.get(&push.method) {
            Some(subscriber) => {
                if subscriber.sender.send(push.params).is_err() {
                    tracing::debug!(channel = %push.method, "Subscriber dropped, removing subscription");
                    self.subscriptions.remove(&push.method);
                }
            }
            None => {
                tracing::debug!(channel = %push.method, "Dropping push for channel without subscriber");
            }
        }
    }

    /// Fail every waiting caller and end every subscription stream.
    fn shutdown(mut self, reason: &str) {
        self.state.set(ConnectionState::Closed);
        tracing::info!(
            pending = self.pending.len(),
            subscriptions = self.subscriptions.len(),
            "WebSocket connection closed: {}",
            reason
        );

        for (_, pending) in self.pending.drain() {
            let _ = pending.response_tx.send(Err(WhitebitError::closed(reason)));
        }

        // Commands queued behind the close would otherwise never be answered.
        self.cmd_rx.close();
        while let Ok(cmd) = self.cmd_rx.try_recv() {
            if let HandlerCommand::Request { response_tx, .. } = cmd {
                let _ = response_tx.send(Err(WhitebitError::closed(reason)));
            }
        }

        self.subscriptions.clear();
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
