mod render;
mod vercel;

pub use render::{RenderConfig, RenderResolvedConfig};
pub use vercel::{VercelConfig, VercelResolvedConfig};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Global provider defaults (used when provider-level config is unset).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderDefaults {
    /// Optional upstream HTTP proxy. If set, used for reqwest clients.
    /// TOML: `providers.defaults.proxy`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Allow HTTP/2 for reqwest clients; disabled forces HTTP/1.
    /// TOML: `providers.defaults.enable_multiplexing`. Default: `false`.
    #[serde(default = "default_enable_multiplexing")]
    pub enable_multiplexing: bool,

    /// Max attempts for one logical upstream call (first try included).
    /// TOML: `providers.defaults.retry_max_times`. Default: `5`.
    #[serde(default = "default_retry_max_times")]
    pub retry_max_times: usize,

    /// Base of the exponential backoff schedule, in milliseconds.
    /// TOML: `providers.defaults.retry_base_delay_ms`. Default: `1000`.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Connect and read timeout per attempt, in seconds.
    /// TOML: `providers.defaults.request_timeout_secs`. Default: `10`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Response header carrying the rate-limit reset time (epoch or delta seconds).
    /// TOML: `providers.defaults.ratelimit_reset_header`. Default: `Ratelimit-Reset`.
    #[serde(default = "default_ratelimit_reset_header")]
    pub ratelimit_reset_header: String,

    /// Longest wait a reset hint may ask for; later hints fall back to exponential backoff.
    /// TOML: `providers.defaults.ratelimit_max_wait_secs`. Default: `300`.
    #[serde(default = "default_ratelimit_max_wait_secs")]
    pub ratelimit_max_wait_secs: u64,
}

impl Default for ProviderDefaults {
    fn default() -> Self {
        Self {
            proxy: None,
            enable_multiplexing: default_enable_multiplexing(),
            retry_max_times: default_retry_max_times(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            ratelimit_reset_header: default_ratelimit_reset_header(),
            ratelimit_max_wait_secs: default_ratelimit_max_wait_secs(),
        }
    }
}

/// All provider configurations.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProvidersConfig {
    /// Global defaults for providers (overridden per provider if set).
    #[serde(default)]
    pub defaults: ProviderDefaults,

    /// Render.com provider configuration.
    #[serde(default)]
    pub render: RenderConfig,

    /// Vercel provider configuration.
    #[serde(default)]
    pub vercel: VercelConfig,
}

/// HTTP and retry settings after provider overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResolvedConfig {
    pub proxy: Option<Url>,
    pub enable_multiplexing: bool,
    pub retry_max_times: usize,
    pub retry_base_delay: Duration,
    pub request_timeout: Duration,
    pub ratelimit_reset_header: String,
    pub ratelimit_max_wait: Duration,
}

impl Default for UpstreamResolvedConfig {
    fn default() -> Self {
        UpstreamOverrides::default().resolve(&ProviderDefaults::default())
    }
}

/// Borrowed view of the per-provider override fields.
#[derive(Default)]
pub(crate) struct UpstreamOverrides<'a> {
    pub proxy: Option<&'a Url>,
    pub enable_multiplexing: Option<bool>,
    pub retry_max_times: Option<usize>,
    pub retry_base_delay_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub ratelimit_reset_header: Option<&'a str>,
    pub ratelimit_max_wait_secs: Option<u64>,
}

impl UpstreamOverrides<'_> {
    pub(crate) fn resolve(self, defaults: &ProviderDefaults) -> UpstreamResolvedConfig {
        UpstreamResolvedConfig {
            proxy: self.proxy.or(defaults.proxy.as_ref()).cloned(),
            enable_multiplexing: self
                .enable_multiplexing
                .unwrap_or(defaults.enable_multiplexing),
            retry_max_times: self
                .retry_max_times
                .unwrap_or(defaults.retry_max_times)
                .max(1),
            retry_base_delay: Duration::from_millis(
                self.retry_base_delay_ms
                    .unwrap_or(defaults.retry_base_delay_ms),
            ),
            request_timeout: Duration::from_secs(
                self.request_timeout_secs
                    .unwrap_or(defaults.request_timeout_secs),
            ),
            ratelimit_reset_header: self
                .ratelimit_reset_header
                .unwrap_or(defaults.ratelimit_reset_header.as_str())
                .to_string(),
            ratelimit_max_wait: Duration::from_secs(
                self.ratelimit_max_wait_secs
                    .unwrap_or(defaults.ratelimit_max_wait_secs),
            ),
        }
    }
}

/// Accepts strings and bare numbers; figment's env provider turns all-digit values into numbers.
pub(crate) fn deserialize_secret_lax<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;

    match v {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(serde::de::Error::custom(
            "expected a string or a number for a credential",
        )),
    }
}

fn default_enable_multiplexing() -> bool {
    false
}

fn default_retry_max_times() -> usize {
    5
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_ratelimit_reset_header() -> String {
    "Ratelimit-Reset".to_string()
}

fn default_ratelimit_max_wait_secs() -> u64 {
    300
}
