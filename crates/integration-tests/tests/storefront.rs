//! The storefront HTTP API end to end, against stub upstream services.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, header::CONTENT_TYPE},
};
use serde_json::{Value, json};
use soko_core::{Cart, Category, Price, Product, ProductId, Quantity, Stock};
use soko_integration_tests::{Reply, StatusCode, StubUpstream, TEST_API_KEY, TEST_CONTACT};
use soko_storefront::cart::{CartStorage, FileStorage, MemoryStorage};
use soko_storefront::routes::{REQUEST_ID_HEADER, router};
use soko_storefront::state::AppState;
use tower::ServiceExt;
use uuid::Uuid;

fn app(stub: &StubUpstream, storage: Arc<dyn CartStorage>) -> Router {
    router(AppState::with_storage(stub.config(), storage).unwrap())
}

async fn start() -> (StubUpstream, Router) {
    let stub = StubUpstream::start().await.unwrap();
    stub.add_session("abc", "user-7", Some("2348000000001"));
    let app = app(&stub, Arc::new(MemoryStorage::new()));
    (stub, app)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(body.map_or_else(Body::empty, |body| Body::from(body.to_string())))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn add(app: &Router, session: &str, product_id: &str, quantity: i64) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        &format!("/api/cart/add?session={session}"),
        Some(json!({ "product_id": product_id, "quantity": quantity })),
    )
    .await
}

// ============================================================================
// Health & catalog
// ============================================================================

#[tokio::test]
async fn test_health_and_readiness() {
    let (_stub, app) = start().await;

    let (status, _) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let (_stub, app) = start().await;
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let id = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
    assert!(Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn test_products_filtered_by_search_and_category() {
    let (_stub, app) = start().await;

    let (status, body) = send(&app, Method::GET, "/api/products", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["source"], "remote");
    assert_eq!(body["fallback"], false);

    let (_, body) = send(&app, Method::GET, "/api/products?q=%20RICE%20", None).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["products"][0]["name"], "Ofada Rice");

    let (_, body) = send(&app, Method::GET, "/api/products?search=benue", None).await;
    assert_eq!(body["products"][0]["id"], "yam-01");

    let (_, body) = send(&app, Method::GET, "/api/products?category=oils", None).await;
    assert_eq!(body["count"], 1);

    let (_, body) = send(&app, Method::GET, "/api/products?q=rice&category=oils", None).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_categories_in_first_seen_order() {
    let (_stub, app) = start().await;

    let (_, body) = send(&app, Method::GET, "/api/categories", None).await;
    assert_eq!(body["categories"], json!(["tubers", "grains", "oils"]));
}

#[tokio::test]
async fn test_default_catalog_served_when_upstream_down() {
    let (stub, app) = start().await;
    stub.script_catalog([Reply::error(StatusCode::NOT_FOUND, "gone")]);

    let (status, body) = send(&app, Method::GET, "/api/products", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "built_in_default");
    assert_eq!(body["fallback"], true);

    let (status, _) = add(&app, "abc", "1", 1).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_catalog_is_bad_gateway() {
    let (stub, app) = start().await;
    stub.script_catalog([Reply::ok(json!({ "items": [] }))]);

    let (status, body) = send(&app, Method::GET, "/api/products", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "catalog_invalid");

    let (status, _) = send(&app, Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// ============================================================================
// Sessions & visits
// ============================================================================

#[tokio::test]
async fn test_open_visit_resolves_identity() {
    let (_stub, app) = start().await;

    let (status, body) = send(&app, Method::POST, "/api/visits?session=abc", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["identity"], "user-7");
    assert_eq!(body["cart"]["total_items"], 0);
}

#[tokio::test]
async fn test_missing_session_is_unauthorized() {
    let (stub, app) = start().await;

    let (status, body) = send(&app, Method::GET, "/api/cart", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_session");

    let (status, _) = send(&app, Method::POST, "/api/checkout", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(stub.orders().is_empty());
}

#[tokio::test]
async fn test_unknown_session_is_unauthorized() {
    let (_stub, app) = start().await;

    let (status, body) = send(&app, Method::POST, "/api/visits?session=stranger", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unknown_session");
}

#[tokio::test]
async fn test_close_visit_keeps_persisted_cart() {
    let (_stub, app) = start().await;
    add(&app, "abc", "yam-01", 2).await;

    let (status, _) = send(&app, Method::DELETE, "/api/visits/abc", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, "/api/visits/abc", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, Method::POST, "/api/visits?session=abc", None).await;
    assert_eq!(body["cart"]["total_items"], 2);
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn test_cart_add_merges_and_totals() {
    let (_stub, app) = start().await;

    add(&app, "abc", "yam-01", 2).await;
    let (status, body) = add(&app, "abc", "yam-01", 3).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lines"].as_array().unwrap().len(), 1);
    assert_eq!(body["total_items"], 5);
    assert_eq!(body["total_price"], "42.50");
    assert_eq!(body["formatted_total"], "₵42.50");
    assert_eq!(body["currency"], "GHS");
}

#[tokio::test]
async fn test_cart_rejects_unknown_and_sold_out_products() {
    let (_stub, app) = start().await;

    let (status, body) = add(&app, "abc", "mango-99", 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = add(&app, "abc", "oil-01", 1).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (_, body) = send(&app, Method::GET, "/api/cart?session=abc", None).await;
    assert_eq!(body["total_items"], 0);
}

#[tokio::test]
async fn test_cart_update_and_remove() {
    let (_stub, app) = start().await;
    add(&app, "abc", "yam-01", 1).await;
    add(&app, "abc", "2", 1).await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/cart/update?session=abc",
        Some(json!({ "product_id": "yam-01", "quantity": 4 })),
    )
    .await;
    assert_eq!(body["total_items"], 5);

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/cart/update?session=abc",
        Some(json!({ "product_id": "yam-01", "quantity": 0 })),
    )
    .await;
    assert_eq!(body["lines"].as_array().unwrap().len(), 1);

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/cart/remove?session=abc",
        Some(json!({ "product_id": "2" })),
    )
    .await;
    assert_eq!(body["total_items"], 0);
}

/// A persisted cart holding two units of a product the catalog no longer lists.
fn delisted_cart() -> String {
    let mut cart = Cart::new();
    cart.add(
        Product {
            id: ProductId::parse("old-yam").unwrap(),
            name: "Old Yam".to_string(),
            price: Price::from_minor_units(850),
            unit: "tuber".to_string(),
            category: Category::parse("tubers").unwrap(),
            description: None,
            image: None,
            available_stock: Stock::new(5),
        },
        Quantity::clamped(2),
    );
    serde_json::to_string(&cart).unwrap()
}

#[tokio::test]
async fn test_delisted_line_can_be_updated_and_removed() {
    let stub = StubUpstream::start().await.unwrap();
    stub.add_session("abc", "user-7", None);
    let storage: Arc<dyn CartStorage> = Arc::new(MemoryStorage::new());
    storage.set("soko.cart.abc", &delisted_cart()).unwrap();
    let app = app(&stub, Arc::clone(&storage));

    let (_, body) = send(&app, Method::GET, "/api/cart?session=abc", None).await;
    assert_eq!(body["total_items"], 2);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/cart/update?session=abc",
        Some(json!({ "product_id": "old-yam", "quantity": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_items"], 3);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/cart/remove?session=abc",
        Some(json!({ "product_id": "old-yam" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_items"], 0);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/cart/remove?session=abc",
        Some(json!({ "product_id": "old-yam" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_items"], 0);
}

#[tokio::test]
async fn test_delisted_line_dropped_by_zero_quantity() {
    let stub = StubUpstream::start().await.unwrap();
    stub.add_session("abc", "user-7", None);
    let storage: Arc<dyn CartStorage> = Arc::new(MemoryStorage::new());
    storage.set("soko.cart.abc", &delisted_cart()).unwrap();
    let app = app(&stub, Arc::clone(&storage));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/cart/update?session=abc",
        Some(json!({ "product_id": "old-yam", "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lines"], json!([]));
    assert_eq!(storage.get("soko.cart.abc").unwrap(), Some("[]".to_string()));
}

#[tokio::test]
async fn test_carts_isolated_per_session() {
    let (stub, app) = start().await;
    stub.add_session("xyz", "user-8", None);

    add(&app, "abc", "yam-01", 3).await;

    let (_, body) = send(&app, Method::GET, "/api/cart?session=xyz", None).await;
    assert_eq!(body["total_items"], 0);
}

#[tokio::test]
async fn test_cart_survives_restart() {
    let stub = StubUpstream::start().await.unwrap();
    stub.add_session("abc", "user-7", None);
    let dir = tempfile::tempdir().unwrap();

    let first = app(&stub, Arc::new(FileStorage::open(dir.path()).unwrap()));
    add(&first, "abc", "yam-01", 2).await;
    drop(first);

    let second = app(&stub, Arc::new(FileStorage::open(dir.path()).unwrap()));
    let (_, body) = send(&second, Method::GET, "/api/cart?session=abc", None).await;
    assert_eq!(body["total_items"], 2);
    assert_eq!(body["lines"][0]["name"], "Puna Yam");
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
async fn test_checkout_submits_clears_and_hands_off() {
    let (stub, app) = start().await;
    add(&app, "abc", "yam-01", 5).await;

    let (status, body) = send(&app, Method::POST, "/api/checkout?session=abc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order_id"], "1001");
    assert_eq!(body["handoff"]["kind"], "redirect");
    let url = body["handoff"]["url"].as_str().unwrap();
    assert!(url.starts_with(&format!("https://wa.me/{TEST_CONTACT}?text=")));
    assert!(url.contains("1001"));

    let orders = stub.orders();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.body["session"], "user-7");
    assert_eq!(order.body["items"], json!([{ "product_id": "yam-01", "quantity": 5 }]));
    assert_eq!(order.body["total"], "42.50");
    assert_eq!(order.api_key.as_deref(), Some(TEST_API_KEY));
    assert!(Uuid::parse_str(order.idempotency_key.as_deref().unwrap()).is_ok());

    let (_, body) = send(&app, Method::GET, "/api/cart?session=abc", None).await;
    assert_eq!(body["total_items"], 0);
    assert_eq!(body["submission"]["state"], "succeeded");
}

#[tokio::test]
async fn test_empty_cart_not_submitted() {
    let (stub, app) = start().await;

    let (status, body) = send(&app, Method::POST, "/api/checkout?session=abc", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "empty_cart");
    assert!(stub.orders().is_empty());
}

#[tokio::test]
async fn test_rejected_order_keeps_cart_and_can_retry() {
    let (stub, app) = start().await;
    stub.script_orders([
        Reply::error(StatusCode::UNPROCESSABLE_ENTITY, "Yams sold out at the market"),
        Reply::ok(json!({ "order_id": "ord-2" })),
    ]);
    add(&app, "abc", "yam-01", 1).await;

    let (status, body) = send(&app, Method::POST, "/api/checkout?session=abc", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "order_rejected");
    assert_eq!(body["message"], "Yams sold out at the market");

    let (_, cart) = send(&app, Method::GET, "/api/cart?session=abc", None).await;
    assert_eq!(cart["total_items"], 1);
    assert_eq!(cart["submission"]["state"], "failed");

    let (status, body) = send(&app, Method::POST, "/api/checkout?session=abc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order_id"], "ord-2");

    let keys: Vec<_> = stub.orders().into_iter().map(|o| o.idempotency_key).collect();
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);
}

#[tokio::test]
async fn test_unparseable_order_response_is_generic_failure() {
    let (stub, app) = start().await;
    stub.script_orders([Reply::Text(StatusCode::OK, "accepted".to_string())]);
    add(&app, "abc", "yam-01", 1).await;

    let (status, body) = send(&app, Method::POST, "/api/checkout?session=abc", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "order_failed");

    let (_, cart) = send(&app, Method::GET, "/api/cart?session=abc", None).await;
    assert_eq!(cart["total_items"], 1);
}
