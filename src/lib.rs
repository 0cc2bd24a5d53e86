//! Loyalty points and referral rewards for a Shopify store.
//!
//! An axum service that receives Shopify webhooks (`orders/create`,
//! `customers/update`, `orders/fulfilled`), decides which points and
//! referral rewards they earn, and writes the results back to customer
//! metafields and tags through the Admin API. It also serves the
//! storefront's referral-code check.

pub mod config;
pub mod dedup;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod loyalty;
pub mod rate_limit;
pub mod shopify;
pub mod state;
