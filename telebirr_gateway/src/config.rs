use std::{env, time::Duration};

use log::{info, warn};
use rpe_common::Secret;

const DEFAULT_API_BASE: &str = "https://api.telebirr.com";
const DEFAULT_RETURN_URL: &str = "http://localhost:3000/app";
const DEFAULT_NOTIFY_URL: &str = "http://localhost:8080/api/v1/payments/notify/telebirr";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Merchant-side configuration for the Telebirr gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway API, without a trailing slash.
    pub api_base: String,
    /// The merchant application id, assigned by the gateway.
    pub app_id: String,
    /// The merchant short code, assigned by the gateway.
    pub short_code: String,
    /// The shared secret used for request signing and callback verification.
    pub app_secret: Secret<String>,
    /// Where the customer's browser is sent after checkout.
    pub return_url: String,
    /// The publicly reachable URL the gateway pushes payment callbacks to.
    pub notify_url: String,
    /// Hard deadline on every gateway round trip. A timeout surfaces as a transport failure.
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            app_id: String::new(),
            short_code: String::new(),
            app_secret: Secret::default(),
            return_url: DEFAULT_RETURN_URL.into(),
            notify_url: DEFAULT_NOTIFY_URL.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GatewayConfig {
    /// Loads the configuration from `RPE_TELEBIRR_*` environment variables, falling back to
    /// development defaults for everything except the merchant credentials.
    ///
    /// Reads `.env` first, if one is present.
    pub fn from_env_or_default() -> Self {
        dotenvy::dotenv().ok();
        let api_base = env::var("RPE_TELEBIRR_API_BASE").unwrap_or_else(|_| {
            info!("RPE_TELEBIRR_API_BASE is not set. Using the default.");
            DEFAULT_API_BASE.into()
        });
        let app_id = env::var("RPE_TELEBIRR_APP_ID").unwrap_or_default();
        let short_code = env::var("RPE_TELEBIRR_SHORT_CODE").unwrap_or_default();
        let app_secret: Secret<String> = Secret::new(env::var("RPE_TELEBIRR_APP_SECRET").unwrap_or_default());
        if app_secret.is_unset() {
            warn!("RPE_TELEBIRR_APP_SECRET is not set. Gateway requests will be signed with an empty secret.");
        }
        let return_url = env::var("RPE_RETURN_URL").unwrap_or_else(|_| DEFAULT_RETURN_URL.into());
        let notify_url = env::var("RPE_NOTIFY_URL").unwrap_or_else(|_| DEFAULT_NOTIFY_URL.into());
        let timeout = env::var("RPE_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        Self { api_base, app_id, short_code, app_secret, return_url, notify_url, timeout }
    }
}
