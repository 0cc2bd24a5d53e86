use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use super::common::{WebhookResult, deliver, parse_payload};
use crate::error::msg;
use crate::shopify::OrderPayload;
use crate::state::AppState;

const TOPIC: &str = "orders/fulfilled";

pub async fn handle_order_fulfilled(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    deliver(&state, &headers, &body, TOPIC, process(&state, &body)).await
}

async fn process(state: &AppState, body: &Bytes) -> WebhookResult {
    let order: OrderPayload = match parse_payload(body, TOPIC) {
        Ok(order) => order,
        Err(rejected) => return rejected,
    };
    let Some(customer_id) = order.customer_id() else {
        return (StatusCode::BAD_REQUEST, msg::NO_CUSTOMER);
    };

    match state
        .reconciler
        .order_fulfilled(customer_id, &order.line_items)
        .await
    {
        Ok(outcome) => (StatusCode::OK, outcome.message()),
        Err(e) => {
            tracing::error!("{} webhook for order {:?} failed: {}", TOPIC, order.id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.response_message())
        }
    }
}
