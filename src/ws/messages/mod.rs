//! WebSocket message types for the WhiteBIT API.

mod base;
mod feeds;
mod market_data;

pub use base::*;
pub use feeds::*;
pub use market_data::*;

/// Query method names.
pub mod methods {
    pub const PING: &str = "ping";
    pub const TIME: &str = "time";
    pub const CANDLES: &str = "candles_request";
    pub const LAST_PRICE: &str = "lastprice_request";
    pub const MARKET: &str = "market_request";
    pub const MARKET_TODAY: &str = "marketToday_query";
    pub const TRADES: &str = "trades_request";
    pub const DEPTH: &str = "depth_request";
}

/// Push channel names, as they appear in the `method` field of push frames.
pub mod channels {
    pub const CANDLES: &str = "candles_update";
    pub const LAST_PRICE: &str = "lastprice_update";
    pub const MARKET: &str = "market_update";
    pub const MARKET_TODAY: &str = "marketToday_update";
    pub const TRADES: &str = "trades_update";
    pub const DEPTH: &str = "depth_update";
}
