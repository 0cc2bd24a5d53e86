//! Redelivery suppression for webhooks.
//!
//! Shopify retries a delivery with the same `X-Shopify-Webhook-Id` until it
//! gets a 2xx. The log is process-local, so a restart forgets it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long a delivery id is remembered.
pub const DELIVERY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug)]
pub struct DeliveryLog {
    seen: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
}

impl Default for DeliveryLog {
    fn default() -> Self {
        Self::new(DELIVERY_TTL)
    }
}

impl DeliveryLog {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Record `id` as in progress. Returns `false` if it was already seen
    /// within the TTL.
    pub fn try_begin(&self, id: &str) -> bool {
        let now = Instant::now();
        let mut seen = self.seen.lock().unwrap_or_else(|p| p.into_inner());
        seen.retain(|_, at| now.duration_since(*at) < self.ttl);

        if seen.contains_key(id) {
            return false;
        }
        seen.insert(id.to_string(), now);
        true
    }

    /// Drop `id` so a retry of the same delivery is processed again.
    pub fn forget(&self, id: &str) {
        self.seen
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(id);
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
