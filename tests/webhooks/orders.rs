//! orders/create: order points and the referral reward triggered by an order.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use crate::common::*;

const URI: &str = "/webhook/orders";

fn order(customer_id: u64, total: &str) -> serde_json::Value {
    json!({
        "id": 5001,
        "customer": {"id": customer_id},
        "total_price": total,
        "line_items": []
    })
}

#[tokio::test]
async fn test_unverified_customer_gets_nothing() {
    let api = Arc::new(MemoryShopify::new());
    api.insert_customer(1, "vip", Some("ref:777"));
    insert_referrer(&api, 777, "", Some("30"));

    let res = post_webhook(app(test_state(&api)), URI, &order(1, "500.00")).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "Not verified");
    assert!(
        api.mutations().is_empty(),
        "unverified customer must not cause any write"
    );
}

#[tokio::test]
async fn test_points_are_floored_per_fifty() {
    let api = Arc::new(MemoryShopify::new());
    api.insert_customer(1, "age_verified", None);
    api.insert_customer(2, "age_verified", None);

    let res = post_webhook(app(test_state(&api)), URI, &order(1, "500.00")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "Order webhook processed");
    assert_eq!(points(&api, 1).as_deref(), Some("10"));

    post_webhook(app(test_state(&api)), URI, &order(2, "549.00")).await;
    assert_eq!(points(&api, 2).as_deref(), Some("10"));
}

#[tokio::test]
async fn test_points_add_to_existing_balance() {
    let api = Arc::new(MemoryShopify::new());
    api.insert_customer(1, "age_verified", None);
    api.seed_metafield(MetafieldOwner::Customer(1), "loyalty", "points", "7");

    post_webhook(app(test_state(&api)), URI, &order(1, "100")).await;

    assert_eq!(points(&api, 1).as_deref(), Some("9"));
}

#[tokio::test]
async fn test_referrer_tag_bonus_is_floored() {
    let api = Arc::new(MemoryShopify::new());
    api.insert_customer(1, "age_verified, referrer-42", None);
    api.insert_customer(2, "age_verified, referrer-42", None);

    post_webhook(app(test_state(&api)), URI, &order(1, "500.00")).await;
    assert_eq!(
        points(&api, 1).as_deref(),
        Some("10"),
        "5% of 10 floors to 0"
    );

    post_webhook(app(test_state(&api)), URI, &order(2, "10000.00")).await;
    assert_eq!(points(&api, 2).as_deref(), Some("210"));
}

#[tokio::test]
async fn test_small_order_writes_nothing() {
    let api = Arc::new(MemoryShopify::new());
    api.insert_customer(1, "age_verified", None);

    let res = post_webhook(app(test_state(&api)), URI, &order(1, "49.99")).await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(api.mutations().is_empty());
}

#[tokio::test]
async fn test_missing_customer_is_bad_request() {
    let api = Arc::new(MemoryShopify::new());

    for payload in [
        json!({"id": 1, "total_price": "500.00"}),
        json!({"id": 1, "customer": null, "total_price": "500.00"}),
        json!({"id": 1, "customer": {}, "total_price": "500.00"}),
    ] {
        let res = post_webhook(app(test_state(&api)), URI, &payload).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body, "No customer");
    }
    assert!(api.mutations().is_empty());
}

#[tokio::test]
async fn test_invalid_total_is_bad_request() {
    let api = Arc::new(MemoryShopify::new());
    api.insert_customer(1, "age_verified", None);

    for total in ["abc", "", "-10.00"] {
        let res = post_webhook(app(test_state(&api)), URI, &order(1, total)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "total {:?}", total);
        assert_eq!(res.body, "Invalid total_price");
    }

    let res = post_webhook(
        app(test_state(&api)),
        URI,
        &json!({"customer": {"id": 1}}),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(api.mutations().is_empty());
}

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let api = Arc::new(MemoryShopify::new());

    let res = post_raw(app(test_state(&api)), URI, b"{not json".to_vec(), &[]).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body, "Invalid JSON");
}

#[tokio::test]
async fn test_customer_fetch_failure_is_server_error() {
    let api = Arc::new(MemoryShopify::new());
    api.insert_customer(1, "age_verified", None);
    api.fail_customer(1);

    let res = post_webhook(app(test_state(&api)), URI, &order(1, "500.00")).await;

    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body, "fetch error");
    assert!(api.mutations().is_empty());
}

#[tokio::test]
async fn test_point_write_failure_is_server_error() {
    let api = Arc::new(MemoryShopify::new());
    api.insert_customer(1, "age_verified", None);
    api.fail_metafield_writes(MetafieldOwner::Customer(1));

    let res = post_webhook(app(test_state(&api)), URI, &order(1, "500.00")).await;

    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body, "point update error");
}

#[tokio::test]
async fn test_order_grants_pending_referral_reward() {
    let api = Arc::new(MemoryShopify::new());
    api.insert_customer(1, "age_verified", Some("ref:777"));
    insert_referrer(&api, 777, "", Some("30"));

    let res = post_webhook(app(test_state(&api)), URI, &order(1, "500.00")).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "Order webhook processed");
    assert_eq!(points(&api, 777).as_deref(), Some("40"));
    assert_eq!(rewarded_count(&api, 777).as_deref(), Some("1"));
    assert_eq!(tag_count(&api, 1, "referral_rewarded"), 1);
    assert_eq!(points(&api, 1).as_deref(), Some("10"));

    // A second order must not reward the referrer again.
    post_webhook(app(test_state(&api)), URI, &order(1, "500.00")).await;
    assert_eq!(points(&api, 777).as_deref(), Some("40"));
    assert_eq!(points(&api, 1).as_deref(), Some("20"));
    assert_eq!(tag_count(&api, 1, "referral_rewarded"), 1);
}

#[tokio::test]
async fn test_order_respects_referral_cap() {
    let api = Arc::new(MemoryShopify::new());
    api.insert_customer(1, "age_verified", Some("ref:777"));
    insert_referrer(&api, 777, "", Some("30"));
    api.seed_metafield(MetafieldOwner::Customer(777), "referral", "rewarded_count", "5");

    let res = post_webhook(app(test_state(&api)), URI, &order(1, "500.00")).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(points(&api, 777).as_deref(), Some("30"));
    assert_eq!(tag_count(&api, 1, "referral_rewarded"), 0);
    assert_eq!(points(&api, 1).as_deref(), Some("10"));
}

#[tokio::test]
async fn test_referral_failure_does_not_fail_order() {
    let api = Arc::new(MemoryShopify::new());
    api.insert_customer(1, "age_verified", Some("ref:777"));
    insert_referrer(&api, 777, "", Some("30"));
    api.fail_metafield_reads(MetafieldOwner::Customer(777));

    let res = post_webhook(app(test_state(&api)), URI, &order(1, "500.00")).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "Order webhook processed");
    assert_eq!(points(&api, 1).as_deref(), Some("10"));
    assert_eq!(tag_count(&api, 1, "referral_rewarded"), 0);
}

#[tokio::test]
async fn test_enormous_total_saturates_points() {
    let api = Arc::new(MemoryShopify::new());
    api.insert_customer(1, "age_verified, referrer-1", None);

    let res = post_webhook(app(test_state(&api)), URI, &order(1, "1e300")).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(points(&api, 1), Some(i64::MAX.to_string()));
}

#[tokio::test]
async fn test_balance_overflow_is_server_error() {
    let api = Arc::new(MemoryShopify::new());
    api.insert_customer(1, "age_verified", None);
    api.seed_metafield(
        MetafieldOwner::Customer(1),
        "loyalty",
        "points",
        "9223372036854775800",
    );

    let res = post_webhook(app(test_state(&api)), URI, &order(1, "500.00")).await;

    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body, "point update error");
    assert_eq!(points(&api, 1).as_deref(), Some("9223372036854775800"));
}
