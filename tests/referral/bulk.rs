//! GET /apps/referral/load-bulk and /apps/referral/fetch-result.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use crate::common::*;

const EXPORT_URL: &str = "https://storage.example/bulk/export.jsonl";

fn snapshot_state(api: &Arc<MemoryShopify>) -> AppState {
    AppState::new(api.clone(), None, LookupMode::Snapshot)
}

#[tokio::test]
async fn test_load_bulk_submits_export() {
    let api = Arc::new(MemoryShopify::new());

    let res = get(app(test_state(&api)), "/apps/referral/load-bulk").await;

    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["status"], "CREATED");
    assert!(body["id"].as_str().unwrap().starts_with("gid://shopify/BulkOperation/"));
    assert!(matches!(
        api.mutations().as_slice(),
        [Mutation::BulkExportStarted { query }] if query.contains("namespace: \"referral\"")
    ));
}

#[tokio::test]
async fn test_load_bulk_while_running_is_bad_gateway() {
    let api = Arc::new(MemoryShopify::new());
    api.set_bulk_operation(Some(BulkOperation {
        id: "gid://shopify/BulkOperation/1".to_string(),
        status: "RUNNING".to_string(),
        url: None,
        object_count: Some("10".to_string()),
        error_code: None,
    }));

    let res = get(app(test_state(&api)), "/apps/referral/load-bulk").await;

    assert_eq!(res.status, StatusCode::BAD_GATEWAY);
    let body = res.json();
    assert!(body["details"].as_str().unwrap().contains("already in progress"));
}

#[tokio::test]
async fn test_fetch_result_without_export() {
    let api = Arc::new(MemoryShopify::new());

    let res = get(app(test_state(&api)), "/apps/referral/fetch-result").await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({"status": "NONE"}));
}

#[tokio::test]
async fn test_fetch_result_while_running_keeps_snapshot() {
    let api = Arc::new(MemoryShopify::new());
    let state = snapshot_state(&api);
    state.snapshot.refresh(vec![("1".to_string(), 1)]);
    api.set_bulk_operation(Some(BulkOperation {
        id: "gid://shopify/BulkOperation/1".to_string(),
        status: "RUNNING".to_string(),
        url: None,
        object_count: None,
        error_code: None,
    }));

    let res = get(app(state.clone()), "/apps/referral/fetch-result").await;

    assert_eq!(res.json(), json!({"status": "RUNNING"}));
    assert_eq!(state.snapshot.len(), 1);
}

#[tokio::test]
async fn test_fetch_result_loads_snapshot() {
    let api = Arc::new(MemoryShopify::new());
    let state = snapshot_state(&api);
    api.set_bulk_operation(Some(completed_export(Some(EXPORT_URL))));
    api.put_download(
        EXPORT_URL,
        concat!(
            r#"{"id":"gid://shopify/Customer/777","metafield":{"value":"777"}}"#,
            "\n",
            r#"{"id":"gid://shopify/Customer/42","metafield":null}"#,
            "\n",
            r#"{"id":"gid://shopify/Customer/5","metafield":{"value":"5"}}"#,
            "\n",
        ),
    );

    let res = get(app(state.clone()), "/apps/referral/fetch-result").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({"status": "COMPLETED", "size": 2}));

    let res = get(app(state.clone()), "/apps/referral/check-code?code=777").await;
    let body = res.json();
    assert_eq!(body["valid"], true);
    assert_eq!(body["customer_id"], 777);
    assert!(body["snapshot_refreshed_at"].is_string());

    let res = get(app(state), "/apps/referral/check-code?code=42").await;
    assert_eq!(res.json()["valid"], false);
}

#[tokio::test]
async fn test_fetch_result_empty_export() {
    let api = Arc::new(MemoryShopify::new());
    let state = snapshot_state(&api);
    state.snapshot.refresh(vec![("1".to_string(), 1)]);
    api.set_bulk_operation(Some(completed_export(None)));

    let res = get(app(state.clone()), "/apps/referral/fetch-result").await;

    assert_eq!(res.json(), json!({"status": "COMPLETED", "size": 0}));
    assert!(state.snapshot.is_empty());
}

#[tokio::test]
async fn test_fetch_result_download_failure() {
    let api = Arc::new(MemoryShopify::new());
    let state = snapshot_state(&api);
    state.snapshot.refresh(vec![("1".to_string(), 1)]);
    api.set_bulk_operation(Some(completed_export(Some(EXPORT_URL))));

    let res = get(app(state.clone()), "/apps/referral/fetch-result").await;

    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(state.snapshot.len(), 1, "failed refresh keeps the old snapshot");
}

#[tokio::test]
async fn test_health() {
    let api = Arc::new(MemoryShopify::new());

    let res = get(app(test_state(&api)), "/health").await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["status"], "ok");
}
