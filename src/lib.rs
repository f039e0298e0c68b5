//! # WhiteBIT Client
//!
//! An async Rust client library for the WhiteBIT WebSocket API.
//!
//! ## Features
//!
//! - Correlated request/response over a single WebSocket connection
//! - Channel subscriptions delivered as streams or callbacks
//! - Typed public queries and market data feeds
//! - Webhook signature verification and dispatch
//! - Financial precision with `rust_decimal`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use whitebit_api_client::ws::WhitebitWsClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let conn = WhitebitWsClient::new().connect().await?;
//!     let time = conn.time().await?;
//!     println!("Server time: {}", time);
//!     conn.close().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod types;
pub mod webhook;
pub mod ws;

// Re-export commonly used types at crate root
pub use error::{ApiError, WhitebitError};
pub use types::common::{Side, TransactionMethod};

/// Result type alias using WhitebitError
pub type Result<T> = std::result::Result<T, WhitebitError>;
