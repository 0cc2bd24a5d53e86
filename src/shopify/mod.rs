//! Shopify Admin API access.
//!
//! Everything the reward logic needs from the store goes through the
//! [`AdminApi`] trait so handlers and the reconciler never see HTTP directly.
//! [`ShopifyClient`] is the production implementation; [`MemoryShopify`] is
//! the in-process double the test suites run against.

pub mod bulk;
mod client;
mod memory;
mod types;
pub mod webhook;

pub use client::ShopifyClient;
pub use memory::{MemoryShopify, Mutation};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// Transport failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status other than 404.
    #[error("Shopify returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Resource does not exist (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body was not the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// GraphQL `errors` or mutation `userErrors`.
    #[error("Shopify rejected the request: {}", .0.join("; "))]
    UserErrors(Vec<String>),

    /// A stored value cannot take the requested change.
    #[error("Metafield {0} would overflow")]
    Overflow(String),
}

impl ShopifyError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ShopifyError::NotFound(_))
    }
}

/// The subset of the Admin API used by the loyalty program.
///
/// None of these calls are conditional: a read followed by a write can
/// interleave with another delivery's writes (last writer wins).
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// `GET customers/{id}.json`. Returns `ShopifyError::NotFound` on 404.
    async fn get_customer(&self, id: u64) -> Result<Customer, ShopifyError>;

    /// `PUT customers/{id}.json` replacing the whole tag string.
    async fn update_customer_tags(&self, id: u64, tags: &str) -> Result<(), ShopifyError>;

    /// `GET {owner}/metafields.json`.
    async fn metafields(&self, owner: MetafieldOwner) -> Result<Vec<Metafield>, ShopifyError>;

    /// `POST {owner}/metafields.json`.
    async fn create_metafield(
        &self,
        owner: MetafieldOwner,
        field: &NewMetafield,
    ) -> Result<Metafield, ShopifyError>;

    /// `PUT metafields/{id}.json`.
    async fn update_metafield(
        &self,
        id: u64,
        value: &str,
        value_type: MetafieldType,
    ) -> Result<Metafield, ShopifyError>;

    /// Submit a `bulkOperationRunQuery` for the given GraphQL query.
    async fn start_bulk_export(&self, query: &str) -> Result<BulkOperation, ShopifyError>;

    /// `currentBulkOperation`, or `None` if the shop has never run one.
    async fn current_bulk_operation(&self) -> Result<Option<BulkOperation>, ShopifyError>;

    /// Download a finished export file.
    async fn download(&self, url: &str) -> Result<String, ShopifyError>;
}
