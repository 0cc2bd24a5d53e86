//! Per-client limiting on the referral routes behind the app proxy.

use std::sync::Arc;

use axum::http::StatusCode;

use crate::common::*;

const URI: &str = "/apps/referral/check-code?code=777";

#[tokio::test]
async fn test_forwarded_clients_get_separate_buckets() {
    let api = Arc::new(MemoryShopify::new());
    insert_referrer(&api, 777, "", None);
    let app = rate_limited_app(test_state(&api), 1);

    let first = get_with_headers(app.clone(), URI, &[("x-forwarded-for", "203.0.113.7")]).await;
    assert_eq!(first.status, StatusCode::OK);

    let repeat = get_with_headers(app.clone(), URI, &[("x-forwarded-for", "203.0.113.7")]).await;
    assert_eq!(repeat.status, StatusCode::TOO_MANY_REQUESTS);

    let other = get_with_headers(app, URI, &[("x-forwarded-for", "198.51.100.24")]).await;
    assert_eq!(other.status, StatusCode::OK);
}

#[tokio::test]
async fn test_first_forwarded_address_is_the_client() {
    let api = Arc::new(MemoryShopify::new());
    insert_referrer(&api, 777, "", None);
    let app = rate_limited_app(test_state(&api), 1);

    let first = get_with_headers(
        app.clone(),
        URI,
        &[("x-forwarded-for", "203.0.113.7, 23.227.38.1")],
    )
    .await;
    assert_eq!(first.status, StatusCode::OK);

    let same_proxy = get_with_headers(
        app,
        URI,
        &[("x-forwarded-for", "198.51.100.24, 23.227.38.1")],
    )
    .await;
    assert_eq!(same_proxy.status, StatusCode::OK);
}
