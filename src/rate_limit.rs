//! Per-client rate limiting for the storefront-facing referral routes.
//!
//! These routes arrive through the Shopify app proxy, so the peer address is
//! Shopify's. Clients are keyed by `X-Forwarded-For` / `X-Real-IP` /
//! `Forwarded` first, falling back to the peer address.
//!
//! Webhook routes are not limited: Shopify controls their rate and retries
//! anything that is rejected.
//!
//! Configure via `RATE_LIMIT_REFERRAL_RPM` (default: 30).

use std::sync::Arc;
use std::time::Duration;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;

/// Rate limiter layer type alias using governor types directly
pub type RateLimitLayer = GovernorLayer<
    SmartIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Replenish interval for a requests-per-minute budget, at least one second.
fn replenish_period(requests_per_minute: u32) -> Duration {
    let rpm = u64::from(requests_per_minute.max(1));
    Duration::from_secs((60 / rpm).max(1))
}

/// Layer for `/apps/referral/*`. Allows a burst of `requests_per_minute`
/// per client IP, refilled one request per period.
///
/// Requests without forwarding headers need the server to run with
/// `into_make_service_with_connect_info`.
pub fn referral_layer(requests_per_minute: u32) -> RateLimitLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .period(replenish_period(requests_per_minute))
        .burst_size(requests_per_minute.max(1))
        .finish()
        .expect("Failed to build rate limiter config");

    GovernorLayer::new(Arc::new(config))
}
