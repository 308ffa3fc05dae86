pub mod policy;
pub mod render;
pub mod upstream_retry;
pub mod vercel;
pub mod watch;

pub use policy::{BackoffPolicy, ProviderBackoff, UPSTREAM_BODY_PREVIEW_CHARS};
pub use upstream_retry::RequestExecutor;
pub use watch::{DeployPhase, WatchOutcome};

use reqwest::header::{CONNECTION, HeaderMap, HeaderValue};
use std::time::Duration;

use crate::config::UpstreamResolvedConfig;
use crate::error::DeployError;

const USER_AGENT: &str = concat!("deployctl/", env!("CARGO_PKG_VERSION"));

/// Builds the reqwest client shared by all requests to one provider.
pub fn build_http_client(cfg: &UpstreamResolvedConfig) -> Result<reqwest::Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(cfg.request_timeout);

    if let Some(proxy_url) = cfg.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }

    if cfg.enable_multiplexing {
        builder = builder.http2_adaptive_window(true);
    } else {
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        builder = builder
            .http1_only()
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(Duration::from_secs(0));
    }

    builder.default_headers(headers).build()
}

/// Rejects ids that would escape their path segment.
pub fn validate_resource_id(id: &str) -> Result<&str, DeployError> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#', '%']) || id.chars().any(char::is_whitespace) {
        return Err(DeployError::InvalidInput(format!("invalid resource id: {id:?}")));
    }
    Ok(id)
}
