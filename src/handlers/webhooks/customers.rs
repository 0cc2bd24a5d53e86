use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use super::common::{WebhookResult, deliver, parse_payload};
use crate::error::msg;
use crate::shopify::CustomerUpdatePayload;
use crate::state::AppState;

const TOPIC: &str = "customers/update";

pub async fn handle_customer_updated(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    deliver(&state, &headers, &body, TOPIC, process(&state, &body)).await
}

async fn process(state: &AppState, body: &Bytes) -> WebhookResult {
    let payload: CustomerUpdatePayload = match parse_payload(body, TOPIC) {
        Ok(payload) => payload,
        Err(rejected) => return rejected,
    };
    let Some(customer_id) = payload.id else {
        return (StatusCode::BAD_REQUEST, msg::NO_CUSTOMER_ID);
    };

    tracing::debug!("{} webhook for customer {}", TOPIC, customer_id);

    match state.reconciler.customer_updated(customer_id).await {
        Ok(outcome) => (StatusCode::OK, outcome.message()),
        Err(e) => {
            tracing::error!("{} webhook for customer {} failed: {}", TOPIC, customer_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.response_message())
        }
    }
}
