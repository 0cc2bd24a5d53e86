use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============ Customers ============

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customer {
    pub id: u64,
    /// Comma-separated tag list exactly as Shopify stores it.
    #[serde(default, deserialize_with = "null_to_default")]
    pub tags: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl Customer {
    pub fn note(&self) -> &str {
        self.note.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CustomerEnvelope {
    pub customer: Customer,
}

// ============ Metafields ============

/// Resource a metafield is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetafieldOwner {
    Customer(u64),
    Product(u64),
}

impl MetafieldOwner {
    /// REST path segment, e.g. `customers/42`.
    pub fn resource_path(&self) -> String {
        match self {
            MetafieldOwner::Customer(id) => format!("customers/{}", id),
            MetafieldOwner::Product(id) => format!("products/{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetafieldType {
    NumberInteger,
    SingleLineText,
}

impl MetafieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetafieldType::NumberInteger => "number_integer",
            MetafieldType::SingleLineText => "single_line_text_field",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metafield {
    pub id: u64,
    pub namespace: String,
    pub key: String,
    /// Shopify returns integers as numbers on some API versions and as
    /// strings on others; both are normalized to text here.
    #[serde(deserialize_with = "lenient_string")]
    pub value: String,
    #[serde(rename = "type", default)]
    pub value_type: Option<String>,
}

impl Metafield {
    pub fn is(&self, namespace: &str, key: &str) -> bool {
        self.namespace == namespace && self.key == key
    }
}

/// Input for creating a metafield.
#[derive(Debug, Clone)]
pub struct NewMetafield {
    pub namespace: String,
    pub key: String,
    pub value: String,
    pub value_type: MetafieldType,
}

impl NewMetafield {
    pub fn integer(namespace: &str, key: &str, value: i64) -> Self {
        Self {
            namespace: namespace.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            value_type: MetafieldType::NumberInteger,
        }
    }

    pub fn text(namespace: &str, key: &str, value: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            value_type: MetafieldType::SingleLineText,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MetafieldsEnvelope {
    #[serde(default)]
    pub metafields: Vec<Metafield>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MetafieldEnvelope {
    pub metafield: Metafield,
}

// ============ Bulk operations ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperation {
    pub id: String,
    /// `CREATED`, `RUNNING`, `COMPLETED`, `FAILED`, `CANCELED`, ...
    pub status: String,
    #[serde(default)]
    pub url: Option<String>,
    /// GraphQL `UnsignedInt64`, serialized as a string.
    #[serde(default)]
    pub object_count: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

impl BulkOperation {
    pub fn is_completed(&self) -> bool {
        self.status == "COMPLETED"
    }
}

// ============ Webhook payloads ============

/// `orders/create` and `orders/fulfilled` payload (only the fields we use).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPayload {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub customer: Option<CustomerRef>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub total_price: Option<String>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub line_items: Vec<LineItem>,
}

impl OrderPayload {
    pub fn customer_id(&self) -> Option<u64> {
        self.customer.as_ref().and_then(|c| c.id)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerRef {
    #[serde(default)]
    pub id: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineItem {
    /// Null for custom line items that are not backed by a product.
    #[serde(default)]
    pub product_id: Option<u64>,
    #[serde(default)]
    pub quantity: u32,
}

/// `customers/update` payload. The rest of the body is ignored; the
/// customer is always re-read from the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerUpdatePayload {
    #[serde(default)]
    pub id: Option<u64>,
}

// ============ Serde helpers ============

fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(Value::deserialize(deserializer)?))
}
