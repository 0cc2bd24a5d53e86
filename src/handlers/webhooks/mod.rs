pub mod common;
mod customers;
mod fulfilled;
mod orders;

pub use customers::handle_customer_updated;
pub use fulfilled::handle_order_fulfilled;
pub use orders::handle_order_created;

use axum::{Router, routing::post};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook/orders", post(handle_order_created))
        .route("/webhook/customers/update", post(handle_customer_updated))
        .route("/webhook/orders/fulfilled", post(handle_order_fulfilled))
}
