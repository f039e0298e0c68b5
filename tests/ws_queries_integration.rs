mod common;

use std::str::FromStr;

use futures_util::StreamExt;
use rust_decimal::Decimal;
use serde_json::json;
use time::macros::datetime;

use common::{MockServer, within};
use whitebit_api_client::error::WhitebitError;
use whitebit_api_client::types::Side;
use whitebit_api_client::ws::messages::{Feed, LastPriceUpdate, TradesUpdate};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[tokio::test]
async fn test_time_and_last_price() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let task = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.time().await })
    };
    let request = server.next_request().await;
    assert_eq!(request["method"], "time");
    assert_eq!(request["params"], json!([]));
    server.respond(&request, json!(1_700_000_000));
    assert_eq!(
        within(task).await.unwrap().unwrap(),
        datetime!(2023-11-14 22:13:20 UTC)
    );

    let task = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.last_price("BTC_USDT").await })
    };
    let request = server.next_request().await;
    assert_eq!(request["method"], "lastprice_request");
    assert_eq!(request["params"], json!(["BTC_USDT"]));
    server.respond(&request, json!("27000.5"));
    assert_eq!(within(task).await.unwrap().unwrap(), dec("27000.5"));
}

#[tokio::test]
async fn test_trades_query_decodes_rows() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let task = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.trades("ETH_BTC", 2, 0).await })
    };
    let request = server.next_request().await;
    assert_eq!(request["method"], "trades_request");
    assert_eq!(request["params"], json!(["ETH_BTC", 2, 0]));
    server.respond(
        &request,
        json!([
            {"id": 2, "time": 1594723455.5, "price": "0.025", "amount": "1.5", "type": "sell"},
            {"id": 1, "time": 1594723455.0, "price": "0.024", "amount": "0.1", "type": "buy"}
        ]),
    );

    let trades = within(task).await.unwrap().unwrap();
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].side, Side::Sell);
    assert_eq!(trades[0].price, dec("0.025"));
    assert_eq!(trades[1].time, datetime!(2020-07-14 10:44:15 UTC));
}

#[tokio::test]
async fn test_mismatched_result_is_protocol_error() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let task = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.last_price("BTC_USDT").await })
    };
    let request = server.next_request().await;
    server.respond(&request, json!({"unexpected": true}));
    assert!(matches!(
        within(task).await.unwrap(),
        Err(WhitebitError::Protocol(_))
    ));
    assert!(conn.is_open());
}

#[tokio::test]
async fn test_local_validation_sends_nothing() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    assert!(matches!(
        conn.depth("BTC_USDT", 0, "0").await,
        Err(WhitebitError::InvalidRequest(_))
    ));
    assert!(matches!(
        conn.depth("BTC_USDT", 10, "0.3").await,
        Err(WhitebitError::InvalidRequest(_))
    ));
    assert!(matches!(
        conn.candles("BTC_USDT", 200, 100, 60).await,
        Err(WhitebitError::InvalidRequest(_))
    ));
    assert!(conn.subscribe_feed(&Feed::trades(Vec::<String>::new())).is_err());
    assert!(
        server
            .no_request_within(std::time::Duration::from_millis(50))
            .await
    );
}

#[tokio::test]
async fn test_feed_subscribe_and_typed_pushes() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let feed = Feed::last_price(["BTC_USDT", "ETH_USDT"]);
    let mut prices = conn.subscribe_feed_as::<LastPriceUpdate>(&feed).unwrap();
    assert_eq!(prices.channel(), "lastprice_update");

    let frame = server.next_request().await;
    assert_eq!(frame["method"], "lastprice_subscribe");
    assert_eq!(frame["params"], json!(["BTC_USDT", "ETH_USDT"]));
    // Acknowledgements have no waiter.
    server.respond(&frame, json!({"status": "success"}));

    server.push("lastprice_update", json!(["BTC_USDT", "27000.5"]));
    server.push("lastprice_update", json!({"garbage": 1}));
    server.push("lastprice_update", json!(["ETH_USDT", "1800"]));

    let first = within(prices.next()).await.unwrap().unwrap();
    assert_eq!(first.market, "BTC_USDT");
    assert_eq!(first.price, dec("27000.5"));
    assert!(matches!(
        within(prices.next()).await.unwrap(),
        Err(WhitebitError::Protocol(_))
    ));
    let third = within(prices.recv()).await.unwrap().unwrap();
    assert_eq!(third.market, "ETH_USDT");

    conn.unsubscribe_feed(&feed).unwrap();
    let frame = server.next_request().await;
    assert_eq!(frame["method"], "lastprice_unsubscribe");
    assert_eq!(frame["params"], json!([]));
    assert!(within(prices.next()).await.is_none());
}

#[tokio::test]
async fn test_trades_feed_payload() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let mut trades = conn
        .subscribe_feed_as::<TradesUpdate>(&Feed::trades(["BTC_USDT"]))
        .unwrap();
    let frame = server.next_request().await;
    assert_eq!(frame["method"], "trades_subscribe");

    server.push(
        "trades_update",
        json!([
            "BTC_USDT",
            [{"id": 41358530, "time": 1580905394.70332, "price": "0.020857", "amount": "5.511", "type": "buy"}]
        ]),
    );

    let update = within(trades.next()).await.unwrap().unwrap();
    assert_eq!(update.market, "BTC_USDT");
    assert_eq!(update.trades.len(), 1);
    assert_eq!(update.trades[0].id, 41358530);
    assert_eq!(update.trades[0].amount, dec("5.511"));
}
