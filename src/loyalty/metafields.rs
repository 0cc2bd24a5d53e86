//! Read-modify-write helpers over namespaced metafields.
//!
//! The REST Admin API has no conditional update, so every helper here is a
//! plain read followed by a write. Two writers racing on the same entry end
//! with the last write, not the sum.

use crate::shopify::{AdminApi, Metafield, MetafieldOwner, MetafieldType, NewMetafield, ShopifyError};

pub const LOYALTY_NAMESPACE: &str = "loyalty";
pub const POINTS_KEY: &str = "points";
pub const REFERRAL_NAMESPACE: &str = "referral";
pub const CODE_KEY: &str = "code";
pub const REWARDED_COUNT_KEY: &str = "rewarded_count";
pub const COMMISSION_NAMESPACE: &str = "commission";
pub const REFERRER_KEY: &str = "referrer";

/// The last entry matching `(namespace, key)`. Duplicates are not expected,
/// but when present the later one wins.
pub fn find<'a>(fields: &'a [Metafield], namespace: &str, key: &str) -> Option<&'a Metafield> {
    fields.iter().rev().find(|f| f.is(namespace, key))
}

/// Integer value of an entry; missing or unparseable values count as 0.
/// Decimal text is truncated toward zero.
pub fn integer_value(fields: &[Metafield], namespace: &str, key: &str) -> i64 {
    find(fields, namespace, key)
        .map(|f| parse_integer(&f.value))
        .unwrap_or(0)
}

/// Decimal value of an entry; missing or unparseable values count as 0.
pub fn decimal_value(fields: &[Metafield], namespace: &str, key: &str) -> f64 {
    find(fields, namespace, key)
        .and_then(|f| f.value.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn parse_integer(raw: &str) -> i64 {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| v.trunc() as i64)
        })
        .unwrap_or(0)
}

/// Add `delta` to an integer metafield, creating it if absent.
/// Returns the value written.
pub async fn add_integer(
    api: &dyn AdminApi,
    owner: MetafieldOwner,
    namespace: &str,
    key: &str,
    delta: i64,
) -> Result<i64, ShopifyError> {
    let fields = api.metafields(owner).await?;
    let existing = find(&fields, namespace, key);
    let current = existing.map(|f| parse_integer(&f.value)).unwrap_or(0);
    let updated = current.checked_add(delta).ok_or_else(|| {
        ShopifyError::Overflow(format!("{} {}.{}", owner.resource_path(), namespace, key))
    })?;

    match existing {
        Some(field) => {
            api.update_metafield(field.id, &updated.to_string(), MetafieldType::NumberInteger)
                .await?;
        }
        None => {
            api.create_metafield(owner, &NewMetafield::integer(namespace, key, updated))
                .await?;
        }
    }

    tracing::debug!(
        "{} {}.{}: {} -> {}",
        owner.resource_path(),
        namespace,
        key,
        current,
        updated
    );

    Ok(updated)
}

/// Result of an idempotent text upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Repaired,
    Unchanged,
}

/// Make sure a text metafield holds `value`, writing only when it differs.
pub async fn ensure_text(
    api: &dyn AdminApi,
    owner: MetafieldOwner,
    fields: &[Metafield],
    namespace: &str,
    key: &str,
    value: &str,
) -> Result<Upsert, ShopifyError> {
    match find(fields, namespace, key) {
        Some(field) if field.value.trim() == value => Ok(Upsert::Unchanged),
        Some(field) => {
            api.update_metafield(field.id, value, MetafieldType::SingleLineText)
                .await?;
            Ok(Upsert::Repaired)
        }
        None => {
            api.create_metafield(owner, &NewMetafield::text(namespace, key, value))
                .await?;
            Ok(Upsert::Created)
        }
    }
}
