pub mod referral;
pub mod webhooks;

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Every route the service exposes. `referral_rpm` enables per-IP rate
/// limiting on the referral routes.
pub fn router(referral_rpm: Option<u32>) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(webhooks::router())
        .merge(referral::router(referral_rpm))
}
