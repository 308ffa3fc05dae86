use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::{ProviderDefaults, UpstreamOverrides, UpstreamResolvedConfig, deserialize_secret_lax};

/// Render provider configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// Base API URL, including the version prefix.
    /// TOML: `providers.render.api_url`. Default: `https://api.render.com/v1`.
    #[serde(default = "default_api_url")]
    pub api_url: Url,

    /// Static bearer token. Usually injected as `DEPLOYCTL_PROVIDERS__RENDER__API_KEY`.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_secret_lax")]
    pub api_key: Option<String>,

    /// Workspace (owner) id new services are created under, e.g. `tea-...`.
    /// TOML: `providers.render.owner_id`.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_secret_lax")]
    pub owner_id: Option<String>,

    /// Seconds between deploy status checks when watching.
    /// TOML: `providers.render.poll_interval_secs`. Default: `10`.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Status checks before giving up on a watch.
    /// TOML: `providers.render.poll_max_checks`. Default: `60`.
    #[serde(default = "default_poll_max_checks")]
    pub poll_max_checks: usize,

    /// Falls back to `providers.defaults.proxy`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Falls back to `providers.defaults.enable_multiplexing`.
    #[serde(default)]
    pub enable_multiplexing: Option<bool>,

    /// Falls back to `providers.defaults.retry_max_times`.
    #[serde(default)]
    pub retry_max_times: Option<usize>,

    /// Falls back to `providers.defaults.retry_base_delay_ms`.
    #[serde(default)]
    pub retry_base_delay_ms: Option<u64>,

    /// Falls back to `providers.defaults.request_timeout_secs`.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Falls back to `providers.defaults.ratelimit_reset_header`.
    #[serde(default)]
    pub ratelimit_reset_header: Option<String>,

    /// Falls back to `providers.defaults.ratelimit_max_wait_secs`.
    #[serde(default)]
    pub ratelimit_max_wait_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RenderResolvedConfig {
    pub api_url: Url,
    pub api_key: Option<String>,
    pub owner_id: Option<String>,
    pub poll_interval: Duration,
    pub poll_max_checks: usize,
    pub upstream: UpstreamResolvedConfig,
}

impl RenderConfig {
    pub fn resolve(&self, defaults: &ProviderDefaults) -> RenderResolvedConfig {
        let upstream = UpstreamOverrides {
            proxy: self.proxy.as_ref(),
            enable_multiplexing: self.enable_multiplexing,
            retry_max_times: self.retry_max_times,
            retry_base_delay_ms: self.retry_base_delay_ms,
            request_timeout_secs: self.request_timeout_secs,
            ratelimit_reset_header: self.ratelimit_reset_header.as_deref(),
            ratelimit_max_wait_secs: self.ratelimit_max_wait_secs,
        }
        .resolve(defaults);

        RenderResolvedConfig {
            api_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            owner_id: self.owner_id.clone(),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            poll_max_checks: self.poll_max_checks,
            upstream,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            owner_id: None,
            poll_interval_secs: default_poll_interval_secs(),
            poll_max_checks: default_poll_max_checks(),
            proxy: None,
            enable_multiplexing: None,
            retry_max_times: None,
            retry_base_delay_ms: None,
            request_timeout_secs: None,
            ratelimit_reset_header: None,
            ratelimit_max_wait_secs: None,
        }
    }
}

fn default_api_url() -> Url {
    Url::parse("https://api.render.com/v1").expect("valid default Render API url")
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_poll_max_checks() -> usize {
    60
}
