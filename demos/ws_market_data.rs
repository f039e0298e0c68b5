//! Example: WebSocket market data feeds.
//!
//! Run with: cargo run --example ws_market_data

use futures_util::StreamExt;
use tracing_subscriber::EnvFilter;
use whitebit_api_client::ws::WhitebitWsClient;
use whitebit_api_client::ws::messages::{DepthUpdate, Feed, TradesUpdate};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let conn = WhitebitWsClient::new().connect().await?;

    let mut trades = conn.subscribe_feed_as::<TradesUpdate>(&Feed::trades(["BTC_USDT"]))?;
    let mut depth =
        conn.subscribe_feed_as::<DepthUpdate>(&Feed::depth_with("BTC_USDT", 5, "0", true))?;

    // Raw payloads through a callback.
    let prices = conn
        .subscribe_with_request(
            "lastprice_update",
            "lastprice_subscribe",
            serde_json::json!(["BTC_USDT"]),
        )?
        .for_each_callback(|params| {
            println!("Last price: {params}");
            Ok::<_, std::convert::Infallible>(())
        });

    let mut seen = 0;
    loop {
        tokio::select! {
            Some(update) = trades.next() => {
                for trade in update?.trades {
                    println!("Trade {}: {} {} @ {}", trade.id, trade.side, trade.amount, trade.price);
                }
            }
            Some(update) = depth.next() => {
                let update = update?;
                if let Some(best) = update.depth.bids.first() {
                    println!(
                        "Depth {} (full={}): best bid {} x {}",
                        update.market, update.full_reload, best.price, best.amount
                    );
                }
            }
            else => break,
        }
        seen += 1;
        if seen >= 50 {
            break;
        }
    }

    prices.abort();
    conn.close().await?;
    Ok(())
}
