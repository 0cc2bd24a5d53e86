//! Test utilities and fixtures for loyalty-webhooks integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;

pub use loyalty_webhooks::config::LookupMode;
pub use loyalty_webhooks::handlers;
pub use loyalty_webhooks::shopify::webhook::WebhookVerifier;
pub use loyalty_webhooks::shopify::{
    AdminApi, BulkOperation, MemoryShopify, MetafieldOwner, Mutation,
};
pub use loyalty_webhooks::state::AppState;

pub const TEST_WEBHOOK_SECRET: &str = "shpss_test_secret";

/// State backed by an in-memory store, live lookups, no signature checks.
pub fn test_state(api: &Arc<MemoryShopify>) -> AppState {
    AppState::new(api.clone(), None, LookupMode::Live)
}

/// Full router without the per-IP rate limiter (oneshot requests carry no
/// peer address).
pub fn app(state: AppState) -> Router {
    handlers::router(None).with_state(state)
}

/// Full router with the referral rate limiter enabled.
pub fn rate_limited_app(state: AppState, requests_per_minute: u32) -> Router {
    handlers::router(Some(requests_per_minute)).with_state(state)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|e| panic!("response is not JSON ({}): {}", e, self.body))
    }
}

async fn send(app: Router, request: Request<Body>) -> TestResponse {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

/// POST raw bytes to a webhook route with extra headers.
pub async fn post_raw(
    app: Router,
    uri: &str,
    body: Vec<u8>,
    headers: &[(&str, &str)],
) -> TestResponse {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    send(app, builder.body(Body::from(body)).unwrap()).await
}

/// POST a JSON webhook payload with no extra headers.
pub async fn post_webhook(app: Router, uri: &str, payload: &Value) -> TestResponse {
    post_raw(app, uri, serde_json::to_vec(payload).unwrap(), &[]).await
}

/// POST a JSON webhook payload carrying an `X-Shopify-Webhook-Id`.
pub async fn post_delivery(
    app: Router,
    uri: &str,
    payload: &Value,
    delivery_id: &str,
) -> TestResponse {
    post_raw(
        app,
        uri,
        serde_json::to_vec(payload).unwrap(),
        &[("x-shopify-webhook-id", delivery_id)],
    )
    .await
}

pub async fn get(app: Router, uri: &str) -> TestResponse {
    get_with_headers(app, uri, &[]).await
}

pub async fn get_with_headers(app: Router, uri: &str, headers: &[(&str, &str)]) -> TestResponse {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

// ============ Store fixtures ============

/// A referrer whose code has been issued (tagged `referrer-<id>`).
pub fn insert_referrer(api: &MemoryShopify, id: u64, extra_tags: &str, points: Option<&str>) {
    let tags = if extra_tags.is_empty() {
        format!("age_verified, referrer-{}", id)
    } else {
        format!("age_verified, referrer-{}, {}", id, extra_tags)
    };
    api.insert_customer(id, &tags, None);
    if let Some(points) = points {
        api.seed_metafield(MetafieldOwner::Customer(id), "loyalty", "points", points);
    }
}

pub fn points(api: &MemoryShopify, customer_id: u64) -> Option<String> {
    api.metafield_value(MetafieldOwner::Customer(customer_id), "loyalty", "points")
}

pub fn rewarded_count(api: &MemoryShopify, customer_id: u64) -> Option<String> {
    api.metafield_value(
        MetafieldOwner::Customer(customer_id),
        "referral",
        "rewarded_count",
    )
}

pub fn tags(api: &MemoryShopify, customer_id: u64) -> String {
    api.customer(customer_id)
        .map(|c| c.tags)
        .unwrap_or_default()
}

/// Number of times `tag` appears in the customer's tag string.
pub fn tag_count(api: &MemoryShopify, customer_id: u64, tag: &str) -> usize {
    tags(api, customer_id)
        .split(',')
        .filter(|t| t.trim() == tag)
        .count()
}

pub fn completed_export(url: Option<&str>) -> BulkOperation {
    BulkOperation {
        id: "gid://shopify/BulkOperation/42".to_string(),
        status: "COMPLETED".to_string(),
        url: url.map(String::from),
        object_count: Some("3".to_string()),
        error_code: None,
    }
}
