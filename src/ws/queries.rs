//! Typed public queries.

use rust_decimal::Decimal;
use serde_json::json;
use time::OffsetDateTime;

use crate::error::WhitebitError;
use crate::ws::connection::WsConnection;
use crate::ws::messages::{
    Candle, Depth, MAX_DEPTH_LIMIT, MarketStats, Trade, methods, validate_depth_interval,
};

impl WsConnection {
    /// Ping the server. The exchange answers `"pong"`.
    pub async fn ping(&self) -> Result<String, WhitebitError> {
        self.request_as(methods::PING, json!([])).await
    }

    /// Server time.
    pub async fn time(&self) -> Result<OffsetDateTime, WhitebitError> {
        let seconds: i64 = self.request_as(methods::TIME, json!([])).await?;
        OffsetDateTime::from_unix_timestamp(seconds)
            .map_err(|e| WhitebitError::Protocol(format!("invalid server time {seconds}: {e}")))
    }

    /// Candles for `market` between two unix timestamps (seconds), one per
    /// `interval` seconds.
    pub async fn candles(
        &self,
        market: &str,
        start: i64,
        end: i64,
        interval: u64,
    ) -> Result<Vec<Candle>, WhitebitError> {
        if end < start {
            return Err(WhitebitError::InvalidRequest(format!(
                "candle range ends before it starts ({start} > {end})"
            )));
        }
        self.request_as(methods::CANDLES, json!([market, start, end, interval]))
            .await
    }

    /// Last price of `market`.
    pub async fn last_price(&self, market: &str) -> Result<Decimal, WhitebitError> {
        self.request_as(methods::LAST_PRICE, json!([market])).await
    }

    /// Statistics for `market` over the last `period` seconds.
    pub async fn market_stats(
        &self,
        market: &str,
        period: u64,
    ) -> Result<MarketStats, WhitebitError> {
        self.request_as(methods::MARKET, json!([market, period])).await
    }

    /// Statistics for `market` since the start of the current UTC day.
    pub async fn market_stats_today(&self, market: &str) -> Result<MarketStats, WhitebitError> {
        self.request_as(methods::MARKET_TODAY, json!([market])).await
    }

    /// Up to `limit` trades of `market` with IDs above `largest_id`.
    pub async fn trades(
        &self,
        market: &str,
        limit: u32,
        largest_id: u64,
    ) -> Result<Vec<Trade>, WhitebitError> {
        self.request_as(methods::TRADES, json!([market, limit, largest_id]))
            .await
    }

    /// Order book of `market`, grouped by price `interval`.
    pub async fn depth(
        &self,
        market: &str,
        limit: u32,
        interval: &str,
    ) -> Result<Depth, WhitebitError> {
        if limit == 0 || limit > MAX_DEPTH_LIMIT {
            return Err(WhitebitError::InvalidRequest(format!(
                "depth limit must be in 1..={MAX_DEPTH_LIMIT}"
            )));
        }
        validate_depth_interval(interval)?;
        self.request_as(methods::DEPTH, json!([market, limit, interval]))
            .await
    }
}
