use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::types::{CustomerEnvelope, MetafieldEnvelope, MetafieldsEnvelope};
use super::{
    AdminApi, BulkOperation, Customer, Metafield, MetafieldOwner, MetafieldType, NewMetafield,
    ShopifyError,
};
use crate::config::ShopifyConfig;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Timeouts surface as `ShopifyError::Http` and fail the delivery with a 500.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const RUN_BULK_QUERY: &str = r#"mutation RunExport($query: String!) {
  bulkOperationRunQuery(query: $query) {
    bulkOperation { id status url objectCount errorCode }
    userErrors { field message }
  }
}"#;

const CURRENT_BULK_OPERATION: &str = r#"query {
  currentBulkOperation { id status url objectCount errorCode }
}"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunBulkData {
    bulk_operation_run_query: RunBulkPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunBulkPayload {
    bulk_operation: Option<BulkOperation>,
    #[serde(default)]
    user_errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentBulkData {
    current_bulk_operation: Option<BulkOperation>,
}

/// reqwest-backed Admin API client (REST for records, GraphQL for bulk export).
#[derive(Debug, Clone)]
pub struct ShopifyClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl ShopifyClient {
    pub fn new(config: &ShopifyConfig) -> Result<Self, ShopifyError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, config.admin_base_url(), &config.access_token))
    }

    /// Use a preconfigured client and base URL (e.g. a local stub server).
    pub fn with_client(client: Client, base_url: String, access_token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .header("Accept", "application/json")
    }

    /// Send a request and decode the JSON body, mapping 404 to `NotFound`.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, ShopifyError> {
        let response = self.authed(request).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ShopifyError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, ShopifyError> {
        let request = self
            .client
            .post(self.url("graphql.json"))
            .json(&json!({ "query": query, "variables": variables }));

        let response: GraphQlResponse<T> = self.send_json(request, "graphql").await?;
        if !response.errors.is_empty() {
            return Err(ShopifyError::UserErrors(
                response.errors.into_iter().map(|e| e.message).collect(),
            ));
        }
        response
            .data
            .ok_or_else(|| ShopifyError::UserErrors(vec!["GraphQL response had no data".into()]))
    }
}

#[async_trait]
impl AdminApi for ShopifyClient {
    async fn get_customer(&self, id: u64) -> Result<Customer, ShopifyError> {
        let request = self.client.get(self.url(&format!("customers/{}.json", id)));
        let envelope: CustomerEnvelope = self
            .send_json(request, &format!("customer {}", id))
            .await?;
        Ok(envelope.customer)
    }

    async fn update_customer_tags(&self, id: u64, tags: &str) -> Result<(), ShopifyError> {
        let request = self
            .client
            .put(self.url(&format!("customers/{}.json", id)))
            .json(&json!({ "customer": { "id": id, "tags": tags } }));
        let _: CustomerEnvelope = self
            .send_json(request, &format!("customer {}", id))
            .await?;
        Ok(())
    }

    async fn metafields(&self, owner: MetafieldOwner) -> Result<Vec<Metafield>, ShopifyError> {
        let path = owner.resource_path();
        let request = self.client.get(self.url(&format!("{}/metafields.json", path)));
        let envelope: MetafieldsEnvelope = self.send_json(request, &path).await?;
        Ok(envelope.metafields)
    }

    async fn create_metafield(
        &self,
        owner: MetafieldOwner,
        field: &NewMetafield,
    ) -> Result<Metafield, ShopifyError> {
        let path = owner.resource_path();
        let request = self
            .client
            .post(self.url(&format!("{}/metafields.json", path)))
            .json(&json!({
                "metafield": {
                    "namespace": field.namespace,
                    "key": field.key,
                    "value": field.value,
                    "type": field.value_type.as_str(),
                }
            }));
        let envelope: MetafieldEnvelope = self.send_json(request, &path).await?;
        Ok(envelope.metafield)
    }

    async fn update_metafield(
        &self,
        id: u64,
        value: &str,
        value_type: MetafieldType,
    ) -> Result<Metafield, ShopifyError> {
        let request = self
            .client
            .put(self.url(&format!("metafields/{}.json", id)))
            .json(&json!({
                "metafield": { "id": id, "value": value, "type": value_type.as_str() }
            }));
        let envelope: MetafieldEnvelope = self
            .send_json(request, &format!("metafield {}", id))
            .await?;
        Ok(envelope.metafield)
    }

    async fn start_bulk_export(&self, query: &str) -> Result<BulkOperation, ShopifyError> {
        let data: RunBulkData = self
            .graphql(RUN_BULK_QUERY, json!({ "query": query }))
            .await?;
        let payload = data.bulk_operation_run_query;

        if !payload.user_errors.is_empty() {
            return Err(ShopifyError::UserErrors(
                payload.user_errors.into_iter().map(|e| e.message).collect(),
            ));
        }
        payload.bulk_operation.ok_or_else(|| {
            ShopifyError::UserErrors(vec!["bulkOperationRunQuery returned no operation".into()])
        })
    }

    async fn current_bulk_operation(&self) -> Result<Option<BulkOperation>, ShopifyError> {
        let data: CurrentBulkData = self
            .graphql(CURRENT_BULK_OPERATION, json!({}))
            .await?;
        Ok(data.current_bulk_operation)
    }

    async fn download(&self, url: &str) -> Result<String, ShopifyError> {
        // Export URLs are pre-signed storage links; no access token.
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.text().await?)
    }
}
