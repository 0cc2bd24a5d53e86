//! Bulk export of referral codes.
//!
//! Shopify runs the query asynchronously and publishes the result as a JSONL
//! file, one object per line. Only top-level customer nodes are exported, so
//! every line is a customer with its `referral.code` metafield (or null).

use serde::Deserialize;

/// GraphQL query submitted through `bulkOperationRunQuery`.
pub const REFERRAL_EXPORT_QUERY: &str = r#"{
  customers {
    edges {
      node {
        id
        metafield(namespace: "referral", key: "code") { value }
      }
    }
  }
}"#;

const CUSTOMER_GID_PREFIX: &str = "gid://shopify/Customer/";

#[derive(Debug, Deserialize)]
struct ExportLine {
    id: String,
    #[serde(default)]
    metafield: Option<ExportMetafield>,
}

#[derive(Debug, Deserialize)]
struct ExportMetafield {
    value: Option<String>,
}

/// Numeric id from a `gid://shopify/Customer/<id>` global id.
pub fn customer_id_from_gid(gid: &str) -> Option<u64> {
    gid.strip_prefix(CUSTOMER_GID_PREFIX)?.parse().ok()
}

/// Parse an export file into `(code, customer_id)` pairs.
///
/// Customers without a code are skipped. Malformed lines are logged and
/// skipped rather than failing the whole refresh.
pub fn parse_referral_export(body: &str) -> Vec<(String, u64)> {
    let mut entries = Vec::new();

    for (line_no, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parsed: ExportLine = match serde_json::from_str(line) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("Skipping malformed export line {}: {}", line_no + 1, e);
                continue;
            }
        };

        let Some(customer_id) = customer_id_from_gid(&parsed.id) else {
            tracing::debug!("Skipping non-customer export line: {}", parsed.id);
            continue;
        };

        let code = parsed
            .metafield
            .and_then(|m| m.value)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        if let Some(code) = code {
            entries.push((code, customer_id));
        }
    }

    entries
}
