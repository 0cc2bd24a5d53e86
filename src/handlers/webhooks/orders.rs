use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use super::common::{WebhookResult, deliver, parse_payload};
use crate::error::msg;
use crate::loyalty::points::parse_order_total;
use crate::shopify::OrderPayload;
use crate::state::AppState;

const TOPIC: &str = "orders/create";

pub async fn handle_order_created(
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
    let Some(total) = order.total_price.as_deref().and_then(parse_order_total) else {
        tracing::warn!(
            "Order {:?} has invalid total_price {:?}",
            order.id,
            order.total_price
        );
        return (StatusCode::BAD_REQUEST, msg::INVALID_TOTAL_PRICE);
    };

    match state.reconciler.order_created(customer_id, total).await {
        Ok(outcome) => (StatusCode::OK, outcome.message()),
        Err(e) => {
            tracing::error!("{} webhook for order {:?} failed: {}", TOPIC, order.id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.response_message())
        }
    }
}
