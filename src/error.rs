use axum::{
    Json,
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::shopify::ShopifyError;

/// Shared error/response messages.
pub mod msg {
    pub const INVALID_WEBHOOK_SECRET: &str = "Invalid webhook secret";
    pub const NO_CUSTOMER: &str = "No customer";
    pub const NO_CUSTOMER_ID: &str = "No customer id";
    pub const INVALID_TOTAL_PRICE: &str = "Invalid total_price";
    pub const INVALID_JSON: &str = "Invalid JSON";
    pub const MISSING_SIGNATURE: &str = "Missing X-Shopify-Hmac-Sha256 header";
    pub const INVALID_SIGNATURE_HEADER: &str = "Invalid signature header";
    pub const INVALID_SIGNATURE: &str = "Invalid signature";
    pub const SIGNATURE_CHECK_FAILED: &str = "Signature verification failed";
    pub const DUPLICATE_DELIVERY: &str = "Duplicate delivery";
    pub const FETCH_ERROR: &str = "fetch error";
    pub const PRODUCT_FETCH_ERROR: &str = "product fetch error";
    pub const POINT_UPDATE_ERROR: &str = "point update error";
    pub const REFERRAL_ERROR: &str = "referral error";
    pub const NOT_VERIFIED: &str = "Not verified";
    pub const NO_ACTION_NEEDED: &str = "No action needed";
    pub const ORDER_PROCESSED: &str = "Order webhook processed";
    pub const FULFILLMENT_PROCESSED: &str = "Fulfillment rewards processed";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", Some(msg.clone())),
            AppError::Shopify(ShopifyError::UserErrors(errors)) => {
                tracing::warn!("Shopify rejected request: {}", errors.join("; "));
                (
                    StatusCode::BAD_GATEWAY,
                    "Shopify rejected the request",
                    Some(errors.join("; ")),
                )
            }
            AppError::Shopify(e) => {
                tracing::error!("Shopify error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Upstream error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
