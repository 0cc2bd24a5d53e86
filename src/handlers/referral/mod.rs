//! Storefront-facing referral routes, served through the Shopify app proxy.

mod bulk;
mod check_code;

pub use bulk::*;
pub use check_code::*;

use axum::{Router, routing::get};

use crate::rate_limit;
use crate::state::AppState;

/// Referral routes, rate limited per client IP when `requests_per_minute`
/// is set.
pub fn router(requests_per_minute: Option<u32>) -> Router<AppState> {
    let router = Router::new()
        .route("/apps/referral/check-code", get(check_code))
        .route("/apps/referral/load-bulk", get(load_bulk))
        .route("/apps/referral/fetch-result", get(fetch_result));

    match requests_per_minute {
        Some(rpm) => router.layer(rate_limit::referral_layer(rpm)),
        None => router,
    }
}
