use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::config::LookupMode;
use crate::error::Result;
use crate::extractors::Query;
use crate::loyalty::{ReferralCode, resolve_referrer};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckCodeQuery {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct CheckCodeResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<u64>,
    /// RFC 3339 time of the snapshot answering the lookup (snapshot mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_refreshed_at: Option<String>,
}

pub async fn check_code(
    State(state): State<AppState>,
    Query(query): Query<CheckCodeQuery>,
) -> Result<Json<CheckCodeResponse>> {
    let code = query.code.as_deref().map(str::trim).unwrap_or_default();

    let response = match state.lookup_mode {
        LookupMode::Live => {
            let referrer = if code.is_empty() {
                None
            } else {
                resolve_referrer(state.api.as_ref(), code, None).await?
            };
            CheckCodeResponse {
                valid: referrer.is_some(),
                customer_id: referrer.map(|r| r.id),
                snapshot_refreshed_at: None,
            }
        }
        LookupMode::Snapshot => {
            let hit = ReferralCode::parse(code)
                .and_then(|code| state.snapshot.lookup(&code.to_string()));
            let refreshed_at = hit
                .map(|h| h.refreshed_at)
                .or_else(|| state.snapshot.refreshed_at());
            CheckCodeResponse {
                valid: hit.is_some(),
                customer_id: hit.map(|h| h.customer_id),
                snapshot_refreshed_at: refreshed_at.map(|t| t.to_rfc3339()),
            }
        }
    };

    tracing::debug!(
        "check-code {:?} ({}): valid={}",
        code,
        state.lookup_mode.as_str(),
        response.valid
    );

    Ok(Json(response))
}
