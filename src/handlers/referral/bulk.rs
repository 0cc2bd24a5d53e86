//! Bulk export of every customer's referral code into the in-memory
//! snapshot. `load-bulk` submits the export; `fetch-result` polls it and
//! loads the file once Shopify has finished.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::error::Result;
use crate::shopify::bulk::{REFERRAL_EXPORT_QUERY, parse_referral_export};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LoadBulkResponse {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct FetchResultResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

pub async fn load_bulk(State(state): State<AppState>) -> Result<Json<LoadBulkResponse>> {
    let operation = state.api.start_bulk_export(REFERRAL_EXPORT_QUERY).await?;
    tracing::info!(
        "Submitted referral code export {} ({})",
        operation.id,
        operation.status
    );

    Ok(Json(LoadBulkResponse {
        id: operation.id,
        status: operation.status,
    }))
}

pub async fn fetch_result(State(state): State<AppState>) -> Result<Json<FetchResultResponse>> {
    let Some(operation) = state.api.current_bulk_operation().await? else {
        return Ok(Json(FetchResultResponse {
            status: "NONE".to_string(),
            size: None,
            error_code: None,
        }));
    };

    if !operation.is_completed() {
        tracing::debug!("Referral export {} is {}", operation.id, operation.status);
        return Ok(Json(FetchResultResponse {
            status: operation.status,
            size: None,
            error_code: operation.error_code,
        }));
    }

    // Shopify omits the file when the export matched nothing.
    let entries = match operation.url.as_deref() {
        Some(url) => parse_referral_export(&state.api.download(url).await?),
        None => Vec::new(),
    };
    let size = state.snapshot.refresh(entries);

    Ok(Json(FetchResultResponse {
        status: operation.status,
        size: Some(size),
        error_code: None,
    }))
}
