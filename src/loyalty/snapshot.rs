//! In-memory referral-code index built from a bulk export.
//!
//! The snapshot is only as fresh as the last completed export. Codes issued
//! after that are unknown to it until the next refresh.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

#[derive(Debug)]
struct SnapshotData {
    codes: HashMap<String, u64>,
    refreshed_at: DateTime<Utc>,
}

/// Result of a snapshot lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHit {
    pub customer_id: u64,
    pub refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ReferralSnapshot {
    current: RwLock<Option<Arc<SnapshotData>>>,
}

impl ReferralSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole snapshot. Returns the number of codes loaded.
    ///
    /// The new map is built before the write lock is taken, so readers see
    /// either the previous snapshot or this one.
    pub fn refresh(&self, entries: impl IntoIterator<Item = (String, u64)>) -> usize {
        let codes: HashMap<String, u64> = entries.into_iter().collect();
        let size = codes.len();
        let data = Arc::new(SnapshotData {
            codes,
            refreshed_at: Utc::now(),
        });

        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = Some(data);

        tracing::info!("Referral snapshot refreshed with {} codes", size);
        size
    }

    fn load(&self) -> Option<Arc<SnapshotData>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn lookup(&self, code: &str) -> Option<SnapshotHit> {
        let data = self.load()?;
        data.codes.get(code.trim()).map(|&customer_id| SnapshotHit {
            customer_id,
            refreshed_at: data.refreshed_at,
        })
    }

    /// When the current snapshot was loaded, or `None` if none has been.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.load().map(|data| data.refreshed_at)
    }

    pub fn len(&self) -> usize {
        self.load().map(|data| data.codes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
