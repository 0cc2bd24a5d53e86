use std::env;
use std::fmt;

pub const DEFAULT_STORE: &str = "j0f9pj-rd.myshopify.com";
pub const DEFAULT_API_VERSION: &str = "2024-04";

/// How `/apps/referral/check-code` answers lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupMode {
    /// Direct customer lookup against the Admin API on every request.
    #[default]
    Live,
    /// Answer from the last completed bulk export held in memory.
    Snapshot,
}

impl LookupMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "live" => Some(LookupMode::Live),
            "snapshot" | "cached" | "bulk" => Some(LookupMode::Snapshot),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LookupMode::Live => "live",
            LookupMode::Snapshot => "snapshot",
        }
    }
}

/// Connection settings for the Shopify Admin API.
#[derive(Clone)]
pub struct ShopifyConfig {
    pub store: String,
    pub api_version: String,
    pub access_token: String,
}

impl ShopifyConfig {
    pub fn admin_base_url(&self) -> String {
        format!("https://{}/admin/api/{}", self.store, self.api_version)
    }
}

// Keep the token out of logs and `--print-config` output.
impl fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub shopify: ShopifyConfig,
    /// Shared secret for `X-Shopify-Hmac-Sha256` verification. `None` disables it.
    pub webhook_secret: Option<String>,
    pub lookup_mode: LookupMode,
    pub rate_limit_referral_rpm: u32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("shopify", &self.shopify)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .field("lookup_mode", &self.lookup_mode)
            .field("rate_limit_referral_rpm", &self.rate_limit_referral_rpm)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_vars<F>(get: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let access_token = non_empty("SHOPIFY_ACCESS_TOKEN")
            .ok_or_else(|| "SHOPIFY_ACCESS_TOKEN must be set".to_string())?;

        let port = match non_empty("PORT") {
            Some(p) => p
                .trim()
                .parse::<u16>()
                .map_err(|_| format!("PORT is not a valid port number: {}", p))?,
            None => 3000,
        };

        let lookup_mode = match non_empty("REFERRAL_LOOKUP_MODE") {
            Some(m) => LookupMode::from_str(&m)
                .ok_or_else(|| format!("REFERRAL_LOOKUP_MODE must be 'live' or 'snapshot', got '{}'", m))?,
            None => LookupMode::default(),
        };

        let rate_limit_referral_rpm = non_empty("RATE_LIMIT_REFERRAL_RPM")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(30);

        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            shopify: ShopifyConfig {
                store: non_empty("SHOPIFY_STORE").unwrap_or_else(|| DEFAULT_STORE.to_string()),
                api_version: non_empty("SHOPIFY_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
                access_token,
            },
            webhook_secret: non_empty("SHOPIFY_WEBHOOK_SECRET"),
            lookup_mode,
            rate_limit_referral_rpm,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Human-readable summary with secrets removed.
    pub fn redacted(&self) -> String {
        format!(
            "listen:         {}\nstore:          {}\napi version:    {}\nwebhook hmac:   {}\nlookup mode:    {}\nreferral rpm:   {}",
            self.addr(),
            self.shopify.store,
            self.shopify.api_version,
            if self.webhook_secret.is_some() { "enabled" } else { "disabled" },
            self.lookup_mode.as_str(),
            self.rate_limit_referral_rpm,
        )
    }
}
