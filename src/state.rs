use std::sync::Arc;

use crate::config::LookupMode;
use crate::dedup::DeliveryLog;
use crate::loyalty::{Reconciler, ReferralSnapshot};
use crate::shopify::AdminApi;
use crate::shopify::webhook::WebhookVerifier;

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn AdminApi>,
    pub reconciler: Reconciler,
    pub snapshot: Arc<ReferralSnapshot>,
    pub deliveries: Arc<DeliveryLog>,
    /// `None` disables webhook signature checks.
    pub webhook_verifier: Option<Arc<WebhookVerifier>>,
    pub lookup_mode: LookupMode,
}

impl AppState {
    pub fn new(
        api: Arc<dyn AdminApi>,
        webhook_secret: Option<String>,
        lookup_mode: LookupMode,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(api.clone()),
            api,
            snapshot: Arc::new(ReferralSnapshot::new()),
            deliveries: Arc::new(DeliveryLog::default()),
            webhook_verifier: webhook_secret.map(|s| Arc::new(WebhookVerifier::new(s))),
            lookup_mode,
        }
    }
}
