//! Market data WebSocket messages.
//!
//! WhiteBIT encodes most payloads as positional arrays. Each type here is
//! deserialized through a private row type so malformed frames fail at the
//! boundary instead of producing half-filled structs.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_with::{TimestampSeconds, TimestampSecondsWithFrac, serde_as};
use time::OffsetDateTime;

use crate::error::WhitebitError;
use crate::types::Side;
use crate::types::serde_helpers::default_on_error;

/// Decode a query result or push payload into a schema type.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, WhitebitError> {
    serde_json::from_value(value).map_err(|e| WhitebitError::Protocol(e.to_string()))
}

/// One OHLC candle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "CandleRow")]
pub struct Candle {
    /// Candle open time.
    pub time: OffsetDateTime,
    /// Open price.
    pub open: Decimal,
    /// Close price.
    pub close: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Volume in stock currency.
    pub volume: Decimal,
    /// Volume in money currency.
    pub deal: Decimal,
    /// Market name.
    pub market: String,
}

#[serde_as]
#[derive(Deserialize)]
struct CandleRow(
    #[serde_as(as = "TimestampSeconds<i64>")] OffsetDateTime,
    Decimal,
    Decimal,
    Decimal,
    Decimal,
    Decimal,
    Decimal,
    String,
);

impl From<CandleRow> for Candle {
    fn from(row: CandleRow) -> Self {
        let CandleRow(time, open, close, high, low, volume, deal, market) = row;
        Self {
            time,
            open,
            close,
            high,
            low,
            volume,
            deal,
            market,
        }
    }
}

/// Market statistics over a period.
///
/// `market_request` fills `period` and `close`; `marketToday_query`
/// leaves both out.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketStats {
    /// Period in seconds.
    #[serde(default)]
    pub period: Option<u64>,
    /// Last price.
    pub last: Decimal,
    /// Open price.
    pub open: Decimal,
    /// Close price.
    #[serde(deserialize_with = "default_on_error::deserialize", default)]
    pub close: Option<Decimal>,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Volume in stock currency.
    pub volume: Decimal,
    /// Volume in money currency.
    pub deal: Decimal,
}

/// A public trade.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trade {
    /// Trade ID.
    pub id: u64,
    /// Execution time.
    #[serde_as(as = "TimestampSecondsWithFrac<f64>")]
    pub time: OffsetDateTime,
    /// Price.
    pub price: Decimal,
    /// Amount in stock currency.
    pub amount: Decimal,
    /// Taker side.
    #[serde(rename = "type")]
    pub side: Side,
}

/// One price level of the order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "(Decimal, Decimal)")]
pub struct DepthLevel {
    /// Price.
    pub price: Decimal,
    /// Amount.
    pub amount: Decimal,
}

impl From<(Decimal, Decimal)> for DepthLevel {
    fn from((price, amount): (Decimal, Decimal)) -> Self {
        Self { price, amount }
    }
}

/// Order book depth.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Depth {
    /// Ask levels, best first.
    #[serde(default)]
    pub asks: Vec<DepthLevel>,
    /// Bid levels, best first.
    #[serde(default)]
    pub bids: Vec<DepthLevel>,
}

/// `lastprice_update` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, Decimal)")]
pub struct LastPriceUpdate {
    /// Market name.
    pub market: String,
    /// Last price.
    pub price: Decimal,
}

impl From<(String, Decimal)> for LastPriceUpdate {
    fn from((market, price): (String, Decimal)) -> Self {
        Self { market, price }
    }
}

/// `market_update` / `marketToday_update` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "(String, MarketStats)")]
pub struct MarketUpdate {
    /// Market name.
    pub market: String,
    /// Statistics.
    pub stats: MarketStats,
}

impl From<(String, MarketStats)> for MarketUpdate {
    fn from((market, stats): (String, MarketStats)) -> Self {
        Self { market, stats }
    }
}

/// `trades_update` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "(String, Vec<Trade>)")]
pub struct TradesUpdate {
    /// Market name.
    pub market: String,
    /// New trades, most recent first.
    pub trades: Vec<Trade>,
}

impl From<(String, Vec<Trade>)> for TradesUpdate {
    fn from((market, trades): (String, Vec<Trade>)) -> Self {
        Self { market, trades }
    }
}

/// `depth_update` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "(bool, Depth, String)")]
pub struct DepthUpdate {
    /// `true` for a full snapshot, `false` for an incremental update.
    pub full_reload: bool,
    /// Changed levels. An amount of zero removes the level.
    pub depth: Depth,
    /// Market name.
    pub market: String,
}

impl From<(bool, Depth, String)> for DepthUpdate {
    fn from((full_reload, depth, market): (bool, Depth, String)) -> Self {
        Self {
            full_reload,
            depth,
            market,
        }
    }
}
