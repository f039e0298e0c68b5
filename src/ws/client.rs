//! WebSocket client implementation.

use std::num::NonZeroU32;
use std::time::Duration;

use url::Url;

use crate::error::WhitebitError;
use crate::ws::connection::WsConnection;

/// WebSocket endpoint URLs.
pub mod endpoints {
    /// Public WebSocket endpoint.
    pub const WS_PUBLIC: &str = "wss://api.whitebit.com/ws";
}

/// Configuration for WebSocket connections.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Deadline for a single request (None = wait until the response or the
    /// connection closes).
    pub request_timeout: Option<Duration>,
    /// Keepalive ping interval (None = no keepalive pings).
    pub ping_interval: Option<Duration>,
    /// Outbound request budget per second (None = unlimited).
    pub max_requests_per_second: Option<NonZeroU32>,
    /// How long to wait for the server's close reply after a client close.
    pub close_timeout: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            request_timeout: None,
            ping_interval: None,
            max_requests_per_second: None,
            close_timeout: Duration::from_secs(5),
        }
    }
}

impl WsConfig {
    /// Create a new configuration builder.
    pub fn builder() -> WsConfigBuilder {
        WsConfigBuilder::new()
    }
}

/// Builder for [`WsConfig`].
#[derive(Debug, Clone, Default)]
pub struct WsConfigBuilder {
    config: WsConfig,
}

impl WsConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: WsConfig::default(),
        }
    }

    /// Fail requests that get no response within `timeout`.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Send a `ping` request every `interval` to keep the session alive.
    ///
    /// WhiteBIT drops sessions that stay silent for about a minute.
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.config.ping_interval = Some(interval);
        self
    }

    /// Throttle outbound requests to `limit` per second.
    pub fn max_requests_per_second(mut self, limit: NonZeroU32) -> Self {
        self.config.max_requests_per_second = Some(limit);
        self
    }

    /// Set the close handshake timeout.
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.config.close_timeout = timeout;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> WsConfig {
        self.config
    }
}

/// WhiteBIT WebSocket client.
///
/// Holds the endpoint and configuration; every [`connect`](Self::connect)
/// opens an independent connection with its own request-ID sequence.
#[derive(Debug, Clone)]
pub struct WhitebitWsClient {
    /// WebSocket URL.
    url: String,
    /// Connection configuration.
    config: WsConfig,
}

impl WhitebitWsClient {
    /// Create a new WebSocket client with default settings.
    pub fn new() -> Self {
        Self::with_config(WsConfig::default())
    }

    /// Create a new WebSocket client with custom configuration.
    pub fn with_config(config: WsConfig) -> Self {
        Self {
            url: endpoints::WS_PUBLIC.to_string(),
            config,
        }
    }

    /// Create a client with a custom URL (useful for testing).
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            config: WsConfig::default(),
        }
    }

    /// Mutable access to the configuration used by later connects.
    pub fn config_mut(&mut self) -> &mut WsConfig {
        &mut self.config
    }

    /// Get the WebSocket URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the configuration.
    pub fn config(&self) -> &WsConfig {
        &self.config
    }

    /// Open a connection and start its read loop.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use whitebit_api_client::ws::WhitebitWsClient;
    ///
    /// # async fn run() -> Result<(), whitebit_api_client::WhitebitError> {
    /// let client = WhitebitWsClient::new();
    /// let conn = client.connect().await?;
    /// let pong = conn.ping().await?;
    /// assert_eq!(pong, "pong");
    /// conn.close().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(&self) -> Result<WsConnection, WhitebitError> {
        let url = parse_ws_url(&self.url)?;
        WsConnection::open(url, self.config.clone()).await
    }
}

impl Default for WhitebitWsClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_ws_url(raw: &str) -> Result<Url, WhitebitError> {
    let url = Url::parse(raw)?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(WhitebitError::InvalidRequest(format!(
            "unsupported WebSocket scheme `{other}`"
        ))),
    }
}
