//! Connection handle: request/response correlation and subscriptions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use url::Url;

use crate::error::WhitebitError;
use crate::ws::client::WsConfig;
use crate::ws::handler::{FeedHandler, HandlerCommand};
use crate::ws::messages::{Feed, WsRequest, decode};
use crate::ws::state::{ConnectionState, StateCell};
use crate::ws::subscription::{CallbackHandle, Subscription, TypedSubscription};

struct Inner {
    url: String,
    config: WsConfig,
    cmd_tx: mpsc::UnboundedSender<HandlerCommand>,
    state: Arc<StateCell>,
    next_id: Arc<AtomicU64>,
    next_token: AtomicU64,
    limiter: Option<DefaultDirectRateLimiter>,
    handler: Mutex<Option<JoinHandle<()>>>,
}

/// One open WebSocket connection to WhiteBIT.
///
/// The handle is cheap to clone and can be shared across tasks. Every clone
/// talks to the same read loop, and request IDs come from a counter owned by
/// this connection, so independent connections never share an ID sequence.
///
/// There is no automatic reconnection: once the transport goes away the
/// connection is [`ConnectionState::Closed`] for good, every waiting request
/// fails with [`WhitebitError::ConnectionClosed`], and every subscription
/// stream ends.
#[derive(Clone)]
pub struct WsConnection {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for WsConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnection")
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .field("next_id", &self.inner.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

impl WsConnection {
    /// Connect to `url` and spawn the read loop.
    pub(crate) async fn open(url: Url, config: WsConfig) -> Result<Self, WhitebitError> {
        let state = Arc::new(StateCell::new());
        state.set(ConnectionState::Connecting);

        let (stream, _) = connect_async(url.as_str()).await.map_err(|e| {
            state.set(ConnectionState::Closed);
            WhitebitError::WebSocketMsg(format!("Failed to connect to {}: {}", url, e))
        })?;
        tracing::info!(%url, "WebSocket connected");

        let next_id = Arc::new(AtomicU64::new(1));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let handler = FeedHandler::new(
            stream,
            cmd_rx,
            Arc::clone(&state),
            Arc::clone(&next_id),
            config.ping_interval,
            config.close_timeout,
        );
        state.set(ConnectionState::Open);
        let task = tokio::spawn(handler.run());

        let limiter = config
            .max_requests_per_second
            .map(|limit| RateLimiter::direct(Quota::per_second(limit)));

        Ok(Self {
            inner: Arc::new(Inner {
                url: url.to_string(),
                config,
                cmd_tx,
                state,
                next_id,
                next_token: AtomicU64::new(1),
                limiter,
                handler: Mutex::new(Some(task)),
            }),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.inner.state.get()
    }

    /// Check if the connection accepts requests.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// The URL this connection was opened against.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Send a request and wait for the response with the same `id`.
    ///
    /// Returns the response's `result`. Fails with
    /// [`WhitebitError::Api`] when the exchange answers with an error payload,
    /// [`WhitebitError::Protocol`] when the response is malformed,
    /// [`WhitebitError::ConnectionClosed`] when the connection goes away first,
    /// and [`WhitebitError::Timeout`] only if a request timeout is configured.
    ///
    /// Dropping the returned future before it resolves removes the pending
    /// entry; a response that arrives later is discarded.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use serde_json::json;
    /// # async fn run(conn: whitebit_api_client::ws::WsConnection) -> whitebit_api_client::Result<()> {
    /// let result = conn.request("lastprice_request", json!(["BTC_USDT"])).await?;
    /// println!("last price: {result}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn request(
        &self,
        method: impl Into<String>,
        params: Value,
    ) -> Result<Value, WhitebitError> {
        self.ensure_open()?;
        if let Some(limiter) = &self.inner.limiter {
            limiter.until_ready().await;
        }

        let request = WsRequest::new(self.next_id(), method, params);
        request.validate()?;

        let id = request.id;
        let (response_tx, response_rx) = oneshot::channel();
        self.send_command(HandlerCommand::Request {
            request,
            response_tx,
        })?;
        let guard = CancelOnDrop {
            id,
            cmd_tx: &self.inner.cmd_tx,
            armed: true,
        };

        let outcome = match self.inner.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, response_rx)
                .await
                .map_err(|_| WhitebitError::Timeout)?,
            None => response_rx.await,
        };
        guard.disarm();

        outcome.map_err(|_| WhitebitError::closed("read loop stopped"))?
    }

    /// Send a request and decode its result into `T`.
    ///
    /// A result that does not match `T` fails this call with
    /// [`WhitebitError::Protocol`]; nothing else is affected.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        method: impl Into<String>,
        params: Value,
    ) -> Result<T, WhitebitError> {
        decode(self.request(method, params).await?)
    }

    /// Route pushes for `channel` to the returned stream.
    ///
    /// No frame is sent; use this for channels the exchange pushes without an
    /// explicit subscribe, or pair it with
    /// [`subscribe_with_request`](Self::subscribe_with_request). Subscribing
    /// again to the same channel replaces this subscription and ends its
    /// stream.
    pub fn subscribe(&self, channel: impl Into<String>) -> Result<Subscription, WhitebitError> {
        self.ensure_open()?;
        let channel = channel.into();
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();

        self.send_command(HandlerCommand::Subscribe {
            channel: channel.clone(),
            token,
            sender,
        })?;

        Ok(Subscription::new(
            channel,
            token,
            receiver,
            self.inner.cmd_tx.clone(),
        ))
    }

    /// Register for `channel`, then send a subscribe frame the exchange needs.
    ///
    /// The frame is fire-and-forget: the exchange's acknowledgement is not
    /// awaited. Registration happens before the frame is written, so no push
    /// that the subscription triggers can be missed.
    pub fn subscribe_with_request(
        &self,
        channel: impl Into<String>,
        method: impl Into<String>,
        params: Value,
    ) -> Result<Subscription, WhitebitError> {
        let request = WsRequest::new(self.next_id(), method, params);
        request.validate()?;

        let subscription = self.subscribe(channel)?;
        self.send_command(HandlerCommand::Send { request })?;
        Ok(subscription)
    }

    /// Subscribe to a public feed.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use futures_util::StreamExt;
    /// use whitebit_api_client::ws::messages::Feed;
    /// # async fn run(conn: whitebit_api_client::ws::WsConnection) -> whitebit_api_client::Result<()> {
    /// let mut trades = conn.subscribe_feed(&Feed::trades(["BTC_USDT"]))?;
    /// while let Some(params) = trades.next().await {
    ///     println!("{params}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe_feed(&self, feed: &Feed) -> Result<Subscription, WhitebitError> {
        feed.validate()?;
        self.subscribe_with_request(feed.channel(), feed.subscribe_method(), feed.params())
    }

    /// Subscribe to a public feed and decode each push into `T`.
    pub fn subscribe_feed_as<T: DeserializeOwned>(
        &self,
        feed: &Feed,
    ) -> Result<TypedSubscription<T>, WhitebitError> {
        Ok(self.subscribe_feed(feed)?.typed())
    }

    /// Deliver pushes for `channel` to `callback` on a dedicated task.
    ///
    /// A callback that returns an error or panics is logged and keeps
    /// receiving later pushes; it never disturbs the read loop or other
    /// subscriptions.
    pub fn subscribe_callback<F, E>(
        &self,
        channel: impl Into<String>,
        callback: F,
    ) -> Result<CallbackHandle, WhitebitError>
    where
        F: FnMut(Value) -> Result<(), E> + Send + 'static,
        E: std::fmt::Display,
    {
        Ok(self.subscribe(channel)?.for_each_callback(callback))
    }

    /// Stop routing pushes for `channel`, whichever subscription holds it.
    ///
    /// No frame is sent.
    pub fn unsubscribe(&self, channel: impl Into<String>) -> Result<(), WhitebitError> {
        self.send_command(HandlerCommand::Unsubscribe {
            channel: channel.into(),
            token: None,
        })
    }

    /// Stop routing pushes for a feed and send its unsubscribe frame.
    ///
    /// WhiteBIT unsubscribes the whole channel, for every market.
    pub fn unsubscribe_feed(&self, feed: &Feed) -> Result<(), WhitebitError> {
        self.ensure_open()?;
        self.unsubscribe(feed.channel())?;
        let request = WsRequest::new(self.next_id(), feed.unsubscribe_method(), json!([]));
        self.send_command(HandlerCommand::Send { request })
    }

    /// Close the connection and wait for the read loop to finish.
    ///
    /// Pending requests that are still unanswered when the transport closes
    /// fail with [`WhitebitError::ConnectionClosed`]. Closing twice is a
    /// no-op.
    pub async fn close(&self) -> Result<(), WhitebitError> {
        let _ = self.inner.cmd_tx.send(HandlerCommand::Close);

        // Held across the join so concurrent closers return only once the
        // read loop has finished.
        let mut handler = self.inner.handler.lock().await;
        if let Some(task) = handler.take() {
            task.await
                .map_err(|e| WhitebitError::WebSocketMsg(format!("read loop failed: {e}")))?;
        }
        Ok(())
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn ensure_open(&self) -> Result<(), WhitebitError> {
        match self.state() {
            ConnectionState::Open => Ok(()),
            state => Err(WhitebitError::closed(format!("connection is {state}"))),
        }
    }

    fn send_command(&self, cmd: HandlerCommand) -> Result<(), WhitebitError> {
        self.inner
            .cmd_tx
            .send(cmd)
            .map_err(|_| WhitebitError::closed("read loop stopped"))
    }
}

/// Removes a pending request if its caller stops waiting.
struct CancelOnDrop<'a> {
    id: u64,
    cmd_tx: &'a mpsc::UnboundedSender<HandlerCommand>,
    armed: bool,
}

impl CancelOnDrop<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.cmd_tx.send(HandlerCommand::Cancel { id: self.id });
        }
    }
}
