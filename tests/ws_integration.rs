mod common;

use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

use common::{MockServer, within};
use whitebit_api_client::error::{ApiError, WhitebitError};
use whitebit_api_client::ws::{ConnectionState, WsConfig};

#[tokio::test]
async fn test_request_resolves_with_result() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;
    assert_eq!(conn.state(), ConnectionState::Open);

    let task = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.request("getOrder", json!({"id": 5})).await })
    };

    let request = server.next_request().await;
    assert_eq!(
        request,
        json!({"id": 1, "method": "getOrder", "params": {"id": 5}})
    );
    server.send(json!({"id": 1, "result": {"status": "filled"}}));

    let result = within(task).await.unwrap().unwrap();
    assert_eq!(result, json!({"status": "filled"}));
}

#[tokio::test]
async fn test_error_payload_fails_only_that_request() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let first = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.request("getOrder", json!({"id": 5})).await })
    };
    let request = server.next_request().await;
    server.respond(&request, json!({"status": "filled"}));
    assert_ok!(within(first).await.unwrap());

    let second = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.request("getOrder", json!({})).await })
    };
    let request = server.next_request().await;
    assert_eq!(request["id"], 2);
    server.send(json!({"id": 2, "result": null, "error": {"code": 400, "message": "bad params"}}));

    match within(second).await.unwrap() {
        Err(WhitebitError::Api(err)) => assert_eq!(err, ApiError::new(400, "bad params")),
        other => panic!("expected API error, got {other:?}"),
    }

    // The connection is still usable.
    server.barrier(&conn).await;
    assert!(conn.is_open());
}

#[tokio::test]
async fn test_null_result_resolves_request() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let task = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.request("unsub", json!([])).await })
    };
    let request = server.next_request().await;
    server.send(json!({"id": request["id"], "result": null, "error": null}));

    assert_eq!(within(task).await.unwrap().unwrap(), serde_json::Value::Null);
}

#[tokio::test]
async fn test_pending_id_wins_over_channel() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let mut sub = conn.subscribe("getOrder").unwrap();
    let task = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.request("getOrder", json!({"id": 5})).await })
    };
    let request = server.next_request().await;
    server.send(json!({"id": request["id"], "method": "getOrder", "result": "r"}));
    assert_eq!(within(task).await.unwrap().unwrap(), json!("r"));

    server.push("getOrder", json!(["marker"]));
    assert_eq!(within(sub.recv()).await.unwrap(), json!(["marker"]));
}

#[tokio::test]
async fn test_concurrent_requests_resolve_out_of_order() {
    const N: u64 = 16;
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let mut tasks = Vec::new();
    for i in 0..N {
        let conn = conn.clone();
        tasks.push(tokio::spawn(async move {
            (i, conn.request("echo", json!([i])).await)
        }));
    }

    let mut requests = Vec::new();
    for _ in 0..N {
        requests.push(server.next_request().await);
    }
    let mut ids: Vec<u64> = requests.iter().map(|r| r["id"].as_u64().unwrap()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len() as u64, N, "request ids must be unique");

    for request in requests.iter().rev() {
        server.respond(request, request["params"][0].clone());
    }

    for task in tasks {
        let (i, result) = within(task).await.unwrap();
        assert_eq!(result.unwrap(), json!(i));
    }
}

#[tokio::test]
async fn test_pending_requests_fail_when_server_closes() {
    const K: usize = 4;
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let tasks: Vec<_> = (0..K)
        .map(|_| {
            let conn = conn.clone();
            tokio::spawn(async move { conn.request("slow", json!([])).await })
        })
        .collect();
    for _ in 0..K {
        server.next_request().await;
    }

    server.close();

    for task in tasks {
        let err = within(task).await.unwrap().unwrap_err();
        assert!(err.is_connection_closed(), "unexpected error: {err}");
    }
    assert_eq!(conn.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_client_close_fails_pending_and_rejects_new_requests() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let task = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.request("slow", json!([])).await })
    };
    server.next_request().await;

    within(conn.close()).await.unwrap();
    assert_eq!(conn.state(), ConnectionState::Closed);

    let err = within(task).await.unwrap().unwrap_err();
    assert!(err.is_connection_closed());

    let err = assert_err!(conn.request("ping", json!([])).await);
    assert!(err.is_connection_closed());
    assert!(conn.subscribe("trades_update").is_err());

    // Closing again is a no-op.
    assert_ok!(conn.close().await);
}

#[tokio::test]
async fn test_concurrent_close_waits_for_read_loop() {
    let server = MockServer::start().await;
    let conn = server.connect().await;

    let closers: Vec<_> = (0..3)
        .map(|_| {
            let conn = conn.clone();
            tokio::spawn(async move {
                conn.close().await.unwrap();
                conn.state()
            })
        })
        .collect();

    for closer in closers {
        assert_eq!(within(closer).await.unwrap(), ConnectionState::Closed);
    }
}

#[tokio::test]
async fn test_subscription_receives_push_once() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _handle = conn
        .subscribe_callback("trades:BTC_USDT", move |params| tx.send(params).map_err(|e| e.to_string()))
        .unwrap();
    server.barrier(&conn).await;

    let params = json!([{"id": 1, "price": "27000.5"}]);
    server.push("trades:BTC_USDT", params.clone());
    assert_eq!(within(rx.recv()).await.unwrap(), params);

    server.barrier(&conn).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_resubscribe_replaces_previous_target() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let mut first = conn.subscribe("lastprice_update").unwrap();
    let mut second = conn.subscribe("lastprice_update").unwrap();
    server.barrier(&conn).await;

    server.push("lastprice_update", json!(["BTC_USDT", "1"]));
    assert_eq!(within(second.recv()).await.unwrap(), json!(["BTC_USDT", "1"]));
    assert!(within(first.recv()).await.is_none(), "replaced stream must end");

    // Dropping the stale handle must not unregister its replacement.
    drop(first);
    server.barrier(&conn).await;
    server.push("lastprice_update", json!(["BTC_USDT", "2"]));
    assert_eq!(within(second.recv()).await.unwrap(), json!(["BTC_USDT", "2"]));
}

#[tokio::test]
async fn test_push_without_subscriber_is_dropped() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let mut trades = conn.subscribe("trades_update").unwrap();
    server.barrier(&conn).await;

    server.push("depth_update", json!([true, {}, "BTC_USDT"]));
    server.send(json!("not an object"));
    server.send(json!({"id": 999, "result": "nobody asked"}));
    server.push("trades_update", json!(["BTC_USDT", []]));

    assert_eq!(within(trades.recv()).await.unwrap(), json!(["BTC_USDT", []]));
    server.barrier(&conn).await;
    assert!(conn.is_open());
}

#[tokio::test]
async fn test_unsubscribe_ends_stream() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let mut sub = conn.subscribe("market_update").unwrap();
    conn.unsubscribe("market_update").unwrap();
    server.barrier(&conn).await;

    server.push("market_update", json!(["BTC_USDT", {}]));
    assert!(within(sub.recv()).await.is_none());
}

#[tokio::test]
async fn test_streams_end_when_connection_closes() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let mut sub = conn.subscribe("trades_update").unwrap();
    server.barrier(&conn).await;
    server.close();

    assert!(within(sub.recv()).await.is_none());
}

#[tokio::test]
async fn test_cancelled_request_late_response_is_dropped() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        conn.request("slow", json!([])),
    );
    let (outcome, request) = tokio::join!(abandoned, server.next_request());
    assert!(outcome.is_err());

    // Cancel was queued before the barrier's request.
    server.barrier(&conn).await;
    server.respond(&request, json!("late"));

    let task = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.request("fresh", json!([])).await })
    };
    let fresh = server.next_request().await;
    assert_ne!(fresh["id"], request["id"]);
    server.respond(&fresh, json!("fresh"));
    assert_eq!(within(task).await.unwrap().unwrap(), json!("fresh"));
}

#[tokio::test]
async fn test_request_timeout() {
    let mut server = MockServer::start().await;
    let config = WsConfig::builder()
        .request_timeout(Duration::from_millis(100))
        .build();
    let conn = server.connect_with(config).await;

    let task = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.request("slow", json!([])).await })
    };
    server.next_request().await;

    assert!(matches!(
        within(task).await.unwrap(),
        Err(WhitebitError::Timeout)
    ));
    assert!(conn.is_open());
}

#[tokio::test]
async fn test_callback_panic_does_not_stop_delivery() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _handle = conn
        .subscribe_callback("candles_update", move |params| {
            if params[0] == "boom" {
                panic!("callback failure");
            }
            if params[0] == "err" {
                return Err("rejected".to_string());
            }
            tx.send(params).map_err(|e| e.to_string())
        })
        .unwrap();
    server.barrier(&conn).await;

    server.push("candles_update", json!(["boom"]));
    server.push("candles_update", json!(["err"]));
    server.push("candles_update", json!(["ok"]));

    assert_eq!(within(rx.recv()).await.unwrap(), json!(["ok"]));
    server.barrier(&conn).await;
}

#[tokio::test]
async fn test_invalid_request_is_rejected_locally() {
    let mut server = MockServer::start().await;
    let conn = server.connect().await;

    assert!(matches!(
        conn.request("", json!([])).await,
        Err(WhitebitError::InvalidRequest(_))
    ));
    assert!(matches!(
        conn.request("ping", json!("scalar")).await,
        Err(WhitebitError::InvalidRequest(_))
    ));
    assert!(server.no_request_within(Duration::from_millis(50)).await);
}

#[tokio::test]
async fn test_keepalive_pings() {
    let mut server = MockServer::start().await;
    let config = WsConfig::builder()
        .ping_interval(Duration::from_millis(50))
        .build();
    let _conn = server.connect_with(config).await;

    let ping = server.next_request().await;
    assert_eq!(ping["method"], "ping");
    assert_eq!(ping["params"], json!([]));
    // Keepalive responses have no waiter and are dropped.
    server.respond(&ping, json!("pong"));
}

#[tokio::test]
async fn test_connect_failure_is_reported() {
    use whitebit_api_client::ws::WhitebitWsClient;

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = WhitebitWsClient::with_url(format!("ws://{addr}"));
    assert!(client.connect().await.is_err());

    let client = WhitebitWsClient::with_url("http://example.com/ws");
    assert!(matches!(
        client.connect().await,
        Err(WhitebitError::InvalidRequest(_))
    ));
}
