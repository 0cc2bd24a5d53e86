//! Shared webhook plumbing: signature check, redelivery suppression and
//! payload parsing. Topic handlers only see an authenticated, first-time
//! delivery.

use std::future::Future;

use axum::{
    body::Bytes,
    http::{HeaderMap, StatusCode},
};
use serde::de::DeserializeOwned;

use crate::error::msg;
use crate::shopify::webhook::WebhookVerifier;
use crate::state::AppState;

/// Result type for webhook operations.
pub type WebhookResult = (StatusCode, &'static str);

pub const HMAC_HEADER: &str = "x-shopify-hmac-sha256";
pub const WEBHOOK_ID_HEADER: &str = "x-shopify-webhook-id";

/// Check `X-Shopify-Hmac-Sha256` when a verifier is configured.
pub fn authenticate(
    verifier: Option<&WebhookVerifier>,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<(), WebhookResult> {
    let Some(verifier) = verifier else {
        return Ok(());
    };

    let signature = match headers.get(HMAC_HEADER) {
        Some(sig) => match sig.to_str() {
            Ok(s) => s,
            Err(_) => return Err((StatusCode::BAD_REQUEST, msg::INVALID_SIGNATURE_HEADER)),
        },
        None => return Err((StatusCode::BAD_REQUEST, msg::MISSING_SIGNATURE)),
    };

    match verifier.verify(body, signature) {
        Ok(true) => Ok(()),
        Ok(false) => Err((StatusCode::UNAUTHORIZED, msg::INVALID_SIGNATURE)),
        Err(e) => {
            tracing::error!("Signature verification error: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, msg::SIGNATURE_CHECK_FAILED))
        }
    }
}

pub fn delivery_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(WEBHOOK_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub fn parse_payload<T: DeserializeOwned>(body: &Bytes, topic: &str) -> Result<T, WebhookResult> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::error!("Failed to parse {} webhook: {}", topic, e);
        (StatusCode::BAD_REQUEST, msg::INVALID_JSON)
    })
}

/// Run `process` for an authenticated delivery that has not been seen
/// before. A 5xx result un-records the delivery id so Shopify's retry is
/// processed.
pub async fn deliver(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
    topic: &'static str,
    process: impl Future<Output = WebhookResult>,
) -> WebhookResult {
    if let Err(rejected) = authenticate(state.webhook_verifier.as_deref(), headers, body) {
        tracing::warn!("Rejected {} webhook: {}", topic, rejected.1);
        return rejected;
    }

    let delivery = delivery_id(headers);
    if let Some(id) = delivery
        && !state.deliveries.try_begin(id)
    {
        tracing::debug!("Skipping duplicate {} delivery {}", topic, id);
        return (StatusCode::OK, msg::DUPLICATE_DELIVERY);
    }

    let result = process.await;

    if result.0.is_server_error()
        && let Some(id) = delivery
    {
        state.deliveries.forget(id);
    }

    result
}
