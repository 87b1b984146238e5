//--------------------------------------------------------------------------------------------------
// TEST MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Integration tests for the HTTP ingress adapter: the §/orders acceptance
// contract (200 means queued, not matched), boundary validation, unknown
// user rejection and the book snapshot endpoint.
//--------------------------------------------------------------------------------------------------

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use spotmatch::api::{Api, AppState};
use spotmatch::{Engine, EngineClient, MemoryStore, TradeFeed};

/// Sets up a router backed by a running engine and an in-memory store
/// seeded with user 1.
fn setup() -> (Router, Arc<MemoryStore>, EngineClient) {
    let store = Arc::new(MemoryStore::with_users([1]));
    let (engine, client) = Engine::new("BTC_USDT", store.clone(), Arc::new(TradeFeed::new()), 64);
    tokio::spawn(engine.run());

    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let api = Api::new(addr, AppState::new(client.clone(), store.clone()));
    (api.routes(), store, client)
}

async fn parse_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

fn post_order(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/orders")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

fn order_body(order_type: &str, order_kind: &str, price: &str, amount: &str) -> Value {
    json!({
        "user_id": 1,
        "order_type": order_type,
        "order_kind": order_kind,
        "price": price,
        "amount": amount,
    })
}

#[tokio::test]
async fn test_health() {
    let (app, _, _) = setup();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_place_order_acknowledges_acceptance() {
    let (app, store, client) = setup();

    let response = app
        .oneshot(post_order(order_body("BID", "LIMIT", "40000", "1.0")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_json(response).await;
    assert_eq!(body["message"], "order accepted");
    let order_id: uuid::Uuid = body["order_id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("ack should carry the order id");

    // The snapshot round-trip doubles as a processing barrier: once it
    // returns, the queued order has been matched and persisted.
    let snapshot = client.snapshot(10).await.unwrap();
    assert_eq!(snapshot.bids.len(), 1);
    assert!(store.order_status(order_id).is_some());
}

#[tokio::test]
async fn test_unknown_user_rejected_at_boundary() {
    let (app, store, _) = setup();

    let mut body = order_body("BID", "LIMIT", "40000", "1.0");
    body["user_id"] = json!(99);

    let response = app.oneshot(post_order(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.order_count(), 0);
}

#[tokio::test]
async fn test_malformed_orders_rejected_at_boundary() {
    let cases = vec![
        order_body("BUY", "LIMIT", "40000", "1.0"),
        order_body("BID", "STOP", "40000", "1.0"),
        order_body("BID", "LIMIT", "0", "1.0"),
        order_body("BID", "LIMIT", "40000", "0"),
        order_body("BID", "MARKET", "40000", "1.0"),
        order_body("BID", "LIMIT", "forty-thousand", "1.0"),
    ];

    for case in cases {
        let (app, store, _) = setup();
        let response = app.oneshot(post_order(case.clone())).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "expected rejection for {case}"
        );
        assert_eq!(store.order_count(), 0);
    }
}

#[tokio::test]
async fn test_book_snapshot_endpoint() {
    let (app, _, client) = setup();

    let response = app
        .clone()
        .oneshot(post_order(order_body("ASK", "LIMIT", "40100", "2.0")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Wait for the engine to drain the queue before reading the book.
    client.snapshot(1).await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/book?depth=5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_json(response).await;
    assert_eq!(body["pair"], "BTC_USDT");
    assert_eq!(body["asks"][0]["price"], "40100");
    assert_eq!(body["asks"][0]["amount"], "2");
    assert!(body["bids"].as_array().unwrap().is_empty());
}
