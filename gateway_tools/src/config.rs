use std::time::Duration;

use checkout_common::Secret;
use log::*;

pub const DEFAULT_GATEWAY_API_URL: &str = "https://api.razorpay.com/v1";
pub const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Base URL of the REST API, without a trailing slash
    pub api_url: String,
    pub key_id: String,
    pub key_secret: Secret<String>,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new<S: Into<String>>(api_url: S, key_id: S, key_secret: S) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            api_url,
            key_id: key_id.into(),
            key_secret: Secret::new(key_secret.into()),
            timeout: Duration::from_millis(DEFAULT_GATEWAY_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("SFC_GATEWAY_API_URL").unwrap_or_else(|_| {
            info!("🪛️ SFC_GATEWAY_API_URL not set, using {DEFAULT_GATEWAY_API_URL}");
            DEFAULT_GATEWAY_API_URL.to_string()
        });
        let key_id = std::env::var("SFC_GATEWAY_KEY_ID").unwrap_or_else(|_| {
            warn!("🪛️ SFC_GATEWAY_KEY_ID not set. Gateway order creation will fail.");
            String::default()
        });
        let key_secret = std::env::var("SFC_GATEWAY_KEY_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ SFC_GATEWAY_KEY_SECRET not set. Gateway calls and client confirmations will fail.");
            String::default()
        });
        let timeout = std::env::var("SFC_GATEWAY_TIMEOUT_MS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid SFC_GATEWAY_TIMEOUT_MS value ({s}): {e}. Using the default."))
                    .ok()
            })
            .unwrap_or(DEFAULT_GATEWAY_TIMEOUT_MS);
        Self::new(api_url, key_id, key_secret).with_timeout(Duration::from_millis(timeout))
    }
}
