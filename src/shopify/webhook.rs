//! Webhook authenticity check.
//!
//! Shopify signs every delivery with `X-Shopify-Hmac-Sha256`: the base64
//! encoded HMAC-SHA256 of the raw request body keyed by the app secret.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result, msg};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Base64 signature Shopify would send for `payload`.
    pub fn sign(&self, payload: &[u8]) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| AppError::Internal(msg::INVALID_WEBHOOK_SECRET.into()))?;
        mac.update(payload);
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    pub fn verify(&self, payload: &[u8], signature: &str) -> Result<bool> {
        let expected = self.sign(payload)?;
        let expected_bytes = expected.as_bytes();
        let provided_bytes = signature.trim().as_bytes();

        // Signature length is public (always 44 base64 chars for SHA-256).
        if expected_bytes.len() != provided_bytes.len() {
            return Ok(false);
        }

        Ok(expected_bytes.ct_eq(provided_bytes).into())
    }
}
