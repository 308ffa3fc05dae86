use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::{ProviderDefaults, UpstreamOverrides, UpstreamResolvedConfig, deserialize_secret_lax};

/// Vercel provider configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VercelConfig {
    /// Base API URL (versioned paths are appended per endpoint).
    /// TOML: `providers.vercel.api_url`. Default: `https://api.vercel.com`.
    #[serde(default = "default_api_url")]
    pub api_url: Url,

    /// Static bearer token. Usually injected as `DEPLOYCTL_PROVIDERS__VERCEL__TOKEN`.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_secret_lax")]
    pub token: Option<String>,

    /// Team scope, sent as the `teamId` query parameter when set.
    /// TOML: `providers.vercel.team_id`.
    #[serde(default)]
    pub team_id: Option<String>,

    /// Seconds between deployment status checks.
    /// TOML: `providers.vercel.poll_interval_secs`. Default: `5`.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Status checks before a watch reports a timeout.
    /// TOML: `providers.vercel.poll_max_checks`. Default: `30`.
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
pub struct VercelResolvedConfig {
    pub api_url: Url,
    pub token: Option<String>,
    pub team_id: Option<String>,
    pub poll_interval: Duration,
    pub poll_max_checks: usize,
    pub upstream: UpstreamResolvedConfig,
}

impl VercelConfig {
    pub fn resolve(&self, defaults: &ProviderDefaults) -> VercelResolvedConfig {
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

        VercelResolvedConfig {
            api_url: self.api_url.clone(),
            token: self.token.clone(),
            team_id: self.team_id.clone().filter(|t| !t.trim().is_empty()),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            poll_max_checks: self.poll_max_checks,
            upstream,
        }
    }
}

impl Default for VercelConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            team_id: None,
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
    Url::parse("https://api.vercel.com").expect("valid default Vercel API url")
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_poll_max_checks() -> usize {
    30
}
