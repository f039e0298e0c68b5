//! Error types for the WhiteBIT client library.

use thiserror::Error;

/// The main error type for all WhiteBIT client operations.
#[derive(Error, Debug)]
pub enum WhitebitError {
    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// WebSocket communication error (with message)
    #[error("WebSocket error: {0}")]
    WebSocketMsg(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// WhiteBIT returned an explicit error payload for a request
    #[error("WhiteBIT API error: {0}")]
    Api(ApiError),

    /// A frame did not have the shape the protocol requires
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The request was rejected before it was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// WebSocket connection closed
    #[error("WebSocket connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for the closure
        reason: String,
    },

    /// Request timeout
    #[error("Request timed out")]
    Timeout,

    /// Webhook delivery was rejected or could not be handled
    #[error("Webhook error: {0}")]
    Webhook(String),
}

impl WhitebitError {
    pub(crate) fn closed(reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            reason: reason.into(),
        }
    }

    /// Check if this error means the connection is gone.
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed { .. })
    }

    /// The exchange error payload, if the exchange rejected the request.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }
}

/// An error payload returned by WhiteBIT in a response frame.
///
/// The code and message are kept exactly as the exchange sent them.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ApiError {
    /// Numeric error code
    pub code: i64,
    /// Human-readable error message
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl ApiError {
    /// Create a new API error from code and message.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Description of a known WhiteBIT order error code.
    pub fn known_description(&self) -> Option<&'static str> {
        error_codes::describe(self.code)
    }

    /// Check if the market is disabled for trading.
    pub fn is_market_disabled(&self) -> bool {
        self.code == error_codes::MARKET_DISABLED
    }
}

/// Known WhiteBIT order error codes.
pub mod error_codes {
    pub const MARKET_DISABLED: i64 = 1;
    pub const INCORRECT_AMOUNT: i64 = 2;
    pub const INCORRECT_PRICE: i64 = 3;
    pub const INCORRECT_TAKER_FEE: i64 = 4;
    pub const INCORRECT_MAKER_FEE: i64 = 5;
    pub const INCORRECT_CLIENT_ORDER_ID: i64 = 6;

    /// Look up the description for a known code.
    pub fn describe(code: i64) -> Option<&'static str> {
        let text = match code {
            MARKET_DISABLED => "market is disabled for trading",
            INCORRECT_AMOUNT => {
                "incorrect amount (it is less than or equals zero or its precision is too big)"
            }
            INCORRECT_PRICE => {
                "incorrect price (it is less than or equals zero or its precision is too big)"
            }
            INCORRECT_TAKER_FEE => {
                "incorrect taker fee (it is less than zero or its precision is too big)"
            }
            INCORRECT_MAKER_FEE => {
                "incorrect maker fee (it is less than zero or its precision is too big)"
            }
            INCORRECT_CLIENT_ORDER_ID => "incorrect clientOrderId (invalid string or not unique id)",
            _ => return None,
        };
        Some(text)
    }
}
