use log::*;
use recon_common::Secret;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// The base URL of the provider's API, without a trailing slash, e.g. `https://api.paycrest.io/v1`
    pub base_url: String,
    pub api_key: Secret<String>,
    /// Used to sign outbound requests.
    pub api_secret: Secret<String>,
    /// How many times a failed idempotent request is retried before giving up.
    pub max_retries: u32,
}

impl ProviderConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("RECON_PROVIDER_URL").unwrap_or_else(|_| {
            warn!("🪛️ RECON_PROVIDER_URL not set, using https://api.paycrest.io/v1 as default");
            "https://api.paycrest.io/v1".to_string()
        });
        let api_key = Secret::new(std::env::var("RECON_PROVIDER_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ RECON_PROVIDER_API_KEY not set, using (probably useless) default");
            "00000000-0000-0000-0000-000000000000".to_string()
        }));
        let api_secret = Secret::new(std::env::var("RECON_PROVIDER_API_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ RECON_PROVIDER_API_SECRET not set, using (probably useless) default");
            "00000000000000".to_string()
        }));
        let max_retries = std::env::var("RECON_PROVIDER_MAX_RETRIES")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("🪛️ Invalid value for RECON_PROVIDER_MAX_RETRIES ({s}). {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_MAX_RETRIES);
        Self { base_url: base_url.trim_end_matches('/').to_string(), api_key, api_secret, max_retries }
    }

    pub fn new(base_url: &str, api_key: &str, api_secret: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: Secret::new(api_key.to_string()),
            api_secret: Secret::new(api_secret.to_string()),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}
