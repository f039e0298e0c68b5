//! Example: WebSocket queries.
//!
//! Run with: cargo run --example ws_queries

use std::time::Duration;

use tracing_subscriber::EnvFilter;
use whitebit_api_client::ws::{WhitebitWsClient, WsConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = WsConfig::builder()
        .request_timeout(Duration::from_secs(10))
        .ping_interval(Duration::from_secs(30))
        .build();
    let conn = WhitebitWsClient::with_config(config).connect().await?;

    println!("Ping: {}", conn.ping().await?);
    println!("Server time: {}", conn.time().await?);
    println!("Last price: {}", conn.last_price("BTC_USDT").await?);

    let stats = conn.market_stats("BTC_USDT", 86400).await?;
    println!("24h: open={} last={} volume={}", stats.open, stats.last, stats.volume);

    let trades = conn.trades("BTC_USDT", 5, 0).await?;
    for trade in trades {
        println!("Trade {}: {} {} @ {}", trade.id, trade.side, trade.amount, trade.price);
    }

    let depth = conn.depth("BTC_USDT", 5, "0").await?;
    println!("Depth: {} asks, {} bids", depth.asks.len(), depth.bids.len());

    // Exchange errors come back as typed API errors.
    match conn.request("lastprice_request", serde_json::json!(["NOT_A_MARKET"])).await {
        Ok(result) => println!("Unexpected result: {result}"),
        Err(e) => match e.api_error() {
            Some(api) => println!("API error {}: {}", api.code, api.message),
            None => println!("Error: {e}"),
        },
    }

    conn.close().await?;
    Ok(())
}
