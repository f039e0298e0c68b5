//! WhiteBIT WebSocket API client.
//!
//! One [`WsConnection`] multiplexes correlated requests and channel
//! subscriptions over a single socket. Requests are tagged with an ID from
//! a counter owned by the connection and resolved when the response with
//! the same ID arrives; push frames are routed to the subscription
//! registered for their channel.
//!
//! # Example
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use whitebit_api_client::ws::WhitebitWsClient;
//! use whitebit_api_client::ws::messages::{Feed, LastPriceUpdate};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WhitebitWsClient::new();
//!     let conn = client.connect().await?;
//!
//!     println!("Last price: {}", conn.last_price("BTC_USDT").await?);
//!
//!     let mut prices = conn.subscribe_feed_as::<LastPriceUpdate>(&Feed::last_price(["BTC_USDT"]))?;
//!     while let Some(update) = prices.next().await {
//!         let update = update?;
//!         println!("{} {}", update.market, update.price);
//!     }
//!
//!     conn.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Limitations
//!
//! - No automatic reconnection or resubscription; a closed connection
//!   stays closed.
//! - Requests wait without a deadline unless
//!   [`WsConfigBuilder::request_timeout`] is set.

mod client;
mod connection;
mod handler;
pub mod messages;
mod queries;
mod state;
mod subscription;

pub use client::{WhitebitWsClient, WsConfig, WsConfigBuilder, endpoints};
pub use connection::WsConnection;
pub use state::ConnectionState;
pub use subscription::{CallbackHandle, Subscription, TypedSubscription};
