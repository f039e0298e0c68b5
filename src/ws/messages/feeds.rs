//! Public push feeds and their subscribe/unsubscribe frames.

use serde_json::{Value, json};

use crate::error::WhitebitError;
use crate::ws::messages::channels;

/// Price intervals accepted by depth queries and subscriptions.
pub const DEPTH_INTERVALS: &[&str] = &[
    "0",
    "0.00000001",
    "0.0000001",
    "0.000001",
    "0.00001",
    "0.0001",
    "0.001",
    "0.01",
    "0.1",
];

/// Largest depth accepted by the exchange.
pub const MAX_DEPTH_LIMIT: u32 = 100;

/// Check a depth price interval against [`DEPTH_INTERVALS`].
pub fn validate_depth_interval(interval: &str) -> Result<(), WhitebitError> {
    if DEPTH_INTERVALS.contains(&interval) {
        Ok(())
    } else {
        Err(WhitebitError::InvalidRequest(format!(
            "unsupported depth interval `{interval}`"
        )))
    }
}

/// A public feed that needs an explicit subscribe frame.
///
/// # Example
///
/// ```rust
/// use whitebit_api_client::ws::messages::{Feed, channels};
///
/// let feed = Feed::trades(["BTC_USDT", "ETH_BTC"]);
/// assert_eq!(feed.channel(), channels::TRADES);
/// assert_eq!(feed.subscribe_method(), "trades_subscribe");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    /// Candles for one market at a fixed interval (seconds).
    Candles { market: String, interval: u64 },
    /// Last price for a set of markets.
    LastPrice { markets: Vec<String> },
    /// 24h market statistics.
    Market { markets: Vec<String> },
    /// Market statistics for the current UTC day.
    MarketToday { markets: Vec<String> },
    /// Public trades.
    Trades { markets: Vec<String> },
    /// Order book depth for one market.
    Depth {
        market: String,
        limit: u32,
        interval: String,
        multiple: bool,
    },
}

fn owned<I, S>(markets: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    markets.into_iter().map(Into::into).collect()
}

impl Feed {
    /// Candles for `market`, one per `interval` seconds.
    pub fn candles(market: impl Into<String>, interval: u64) -> Self {
        Self::Candles {
            market: market.into(),
            interval,
        }
    }

    /// Last price for `markets`.
    pub fn last_price<I, S>(markets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::LastPrice {
            markets: owned(markets),
        }
    }

    /// 24h statistics for `markets`.
    pub fn market<I, S>(markets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Market {
            markets: owned(markets),
        }
    }

    /// Current-day statistics for `markets`.
    pub fn market_today<I, S>(markets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MarketToday {
            markets: owned(markets),
        }
    }

    /// Public trades for `markets`.
    pub fn trades<I, S>(markets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Trades {
            markets: owned(markets),
        }
    }

    /// Depth for `market` with the exchange defaults: 100 levels, no price
    /// grouping, multiple market subscriptions allowed.
    pub fn depth(market: impl Into<String>) -> Self {
        Self::Depth {
            market: market.into(),
            limit: MAX_DEPTH_LIMIT,
            interval: "0".into(),
            multiple: true,
        }
    }

    /// Depth with explicit limit and price interval.
    pub fn depth_with(
        market: impl Into<String>,
        limit: u32,
        interval: impl Into<String>,
        multiple: bool,
    ) -> Self {
        Self::Depth {
            market: market.into(),
            limit,
            interval: interval.into(),
            multiple,
        }
    }

    /// Channel name carried by the push frames of this feed.
    pub fn channel(&self) -> &'static str {
        match self {
            Self::Candles { .. } => channels::CANDLES,
            Self::LastPrice { .. } => channels::LAST_PRICE,
            Self::Market { .. } => channels::MARKET,
            Self::MarketToday { .. } => channels::MARKET_TODAY,
            Self::Trades { .. } => channels::TRADES,
            Self::Depth { .. } => channels::DEPTH,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            Self::Candles { .. } => "candles",
            Self::LastPrice { .. } => "lastprice",
            Self::Market { .. } => "market",
            Self::MarketToday { .. } => "marketToday",
            Self::Trades { .. } => "trades",
            Self::Depth { .. } => "depth",
        }
    }

    /// Method of the subscribe frame.
    pub fn subscribe_method(&self) -> String {
        format!("{}_subscribe", self.prefix())
    }

    /// Method of the unsubscribe frame.
    pub fn unsubscribe_method(&self) -> String {
        format!("{}_unsubscribe", self.prefix())
    }

    /// Params of the subscribe frame.
    pub fn params(&self) -> Value {
        match self {
            Self::Candles { market, interval } => json!([market, interval]),
            Self::LastPrice { markets }
            | Self::Market { markets }
            | Self::MarketToday { markets }
            | Self::Trades { markets } => json!(markets),
            Self::Depth {
                market,
                limit,
                interval,
                multiple,
            } => json!([market, limit, interval, multiple]),
        }
    }

    /// Reject feeds the exchange would refuse.
    pub fn validate(&self) -> Result<(), WhitebitError> {
        match self {
            Self::Candles { market, interval } => {
                if market.is_empty() || *interval == 0 {
                    return Err(WhitebitError::InvalidRequest(
                        "candles need a market and a non-zero interval".into(),
                    ));
                }
            }
            Self::LastPrice { markets }
            | Self::Market { markets }
            | Self::MarketToday { markets }
            | Self::Trades { markets } => {
                if markets.is_empty() {
                    return Err(WhitebitError::InvalidRequest(format!(
                        "{} needs at least one market",
                        self.subscribe_method()
                    )));
                }
            }
            Self::Depth {
                market,
                limit,
                interval,
                ..
            } => {
                if market.is_empty() || *limit == 0 || *limit > MAX_DEPTH_LIMIT {
                    return Err(WhitebitError::InvalidRequest(format!(
                        "depth needs a market and a limit in 1..={MAX_DEPTH_LIMIT}"
                    )));
                }
                validate_depth_interval(interval)?;
            }
        }
        Ok(())
    }
}
