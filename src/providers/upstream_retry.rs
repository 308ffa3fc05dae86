use backon::Retryable;
use futures::future::{BoxFuture, FutureExt};
use reqwest::{Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::UpstreamResolvedConfig;
use crate::error::{ExecuteError, IsRetryable};
use crate::providers::UPSTREAM_BODY_PREVIEW_CHARS;
use crate::providers::policy::{BackoffPolicy, classify_rejection, parse_ratelimit_reset};
use crate::utils::logging::with_pretty_json_debug;

/// Sleep used between attempts.
pub type SleepFn = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

/// Performs one logical request against a provider API, retrying on HTTP 429 and timeouts.
///
/// Only 200 and 201 count as success. Every other status >= 400 is terminal and is
/// surfaced with the provider's message. Running out of attempts yields
/// `ExecuteError::Exhausted`, which callers can tell apart from a rejection.
#[derive(Clone)]
pub struct RequestExecutor {
    provider: &'static str,
    client: reqwest::Client,
    base_url: Url,
    token: String,
    default_query: Vec<(String, String)>,
    policy: BackoffPolicy,
    request_timeout: Duration,
    ratelimit_reset_header: String,
    ratelimit_max_wait: Duration,
    sleeper: SleepFn,
}

impl RequestExecutor {
    pub fn new(
        provider: &'static str,
        client: reqwest::Client,
        base_url: Url,
        token: impl Into<String>,
        cfg: &UpstreamResolvedConfig,
    ) -> Self {
        Self {
            provider,
            client,
            base_url,
            token: token.into(),
            default_query: Vec::new(),
            policy: BackoffPolicy::from_config(cfg),
            request_timeout: cfg.request_timeout,
            ratelimit_reset_header: cfg.ratelimit_reset_header.clone(),
            ratelimit_max_wait: cfg.ratelimit_max_wait,
            sleeper: Arc::new(|dur| tokio::time::sleep(dur).boxed()),
        }
    }

    /// Query pair appended to every request (e.g. Vercel's `teamId`).
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_query.push((key.into(), value.into()));
        self
    }

    /// Replaces the sleep between attempts.
    #[must_use]
    pub fn with_sleeper<F, Fut>(mut self, sleeper: F) -> Self
    where
        F: Fn(Duration) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.sleeper = Arc::new(move |dur| sleeper(dur).boxed());
        self
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn policy(&self) -> BackoffPolicy {
        self.policy
    }

    /// Sleeps with the configured sleeper; also used by status watchers between checks.
    pub async fn pause(&self, dur: Duration) {
        (*self.sleeper)(dur).await;
    }

    /// Absolute URL for `path` under the provider base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };

        let mut url = Url::parse(&joined)?;
        if !self.default_query.is_empty() {
            url.query_pairs_mut().extend_pairs(
                self.default_query
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            );
        }
        Ok(url)
    }

    /// Executes `method path` with an optional JSON body and returns the parsed success payload.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ExecuteError> {
        let url = self.endpoint(path)?;
        let provider = self.provider;
        let policy = self.policy;
        let sleeper = self.sleeper.clone();
        let attempts = AtomicUsize::new(0);
        let started = Instant::now();

        if let Some(body) = body {
            with_pretty_json_debug(body, |pretty_body| {
                debug!(provider, %method, path, body = %pretty_body, "Request payload");
            });
        }

        let result = (|| {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            self.attempt(attempt, &method, &url, path, body)
        })
        .retry(policy)
        .sleep(move |dur| (*sleeper)(dur))
        .when(|err: &ExecuteError| err.is_retryable())
        .adjust(move |err: &ExecuteError, scheduled: Option<Duration>| {
            // The schedule decides whether budget is left; a reset hint only changes the wait.
            scheduled.map(|fallback| match err {
                ExecuteError::RateLimited {
                    reset_at: Some(reset_at),
                    ..
                } => policy.reset_delay(*reset_at, SystemTime::now(), &mut rand::rng()),
                _ => fallback,
            })
        })
        .notify(|err: &ExecuteError, dur: Duration| {
            warn!(
                provider,
                error = %err,
                wait_ms = u64::try_from(dur.as_millis()).unwrap_or(u64::MAX),
                "[{provider}] Retrying in {:.1}s",
                dur.as_secs_f64()
            );
        })
        .await;

        let attempts = attempts.load(Ordering::Relaxed);
        match result {
            Ok(payload) => {
                debug!(provider, attempts, elapsed = ?started.elapsed(), "Request succeeded");
                Ok(payload)
            }
            Err(last) if last.is_retryable() => {
                warn!(
                    provider,
                    attempts,
                    error = %last,
                    "[{provider}] Failed after {attempts} attempts"
                );
                Err(ExecuteError::Exhausted {
                    attempts,
                    last: Box::new(last),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// `GET path`, deserializing the payload into `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ExecuteError> {
        let payload = self.execute(Method::GET, path, None).await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Like [`execute`](Self::execute), serializing `body` and deserializing the payload into `T`.
    pub async fn execute_json<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ExecuteError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = body.map(serde_json::to_value).transpose()?;
        let payload = self.execute(method, path, body.as_ref()).await?;
        Ok(serde_json::from_value(payload)?)
    }

    async fn attempt(
        &self,
        attempt: usize,
        method: &Method,
        url: &Url,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ExecuteError> {
        let provider = self.provider;
        let max_attempts = self.policy.max_attempts();
        info!(
            provider,
            attempt,
            max_attempts,
            %method,
            path,
            "[{provider}] [Attempt {attempt}/{max_attempts}] {method} {path}"
        );

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .bearer_auth(&self.token)
            .timeout(self.request_timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await.inspect_err(|e| {
            warn!(provider, attempt, timeout = e.is_timeout(), error = %e, "[{provider}] Transport error");
        })?;
        let status = resp.status();

        match status {
            StatusCode::OK | StatusCode::CREATED => {
                let bytes = resp.bytes().await?;
                info!(provider, attempt, %status, "[{provider}] Success (HTTP {})", status.as_u16());

                if bytes.iter().all(u8::is_ascii_whitespace) {
                    return Ok(Value::Null);
                }
                serde_json::from_slice(&bytes).map_err(|e| {
                    let raw_body = String::from_utf8_lossy(&bytes);
                    warn!(
                        provider,
                        error = %e,
                        body = %format!("{:.len$}", raw_body, len = UPSTREAM_BODY_PREVIEW_CHARS),
                        "[{provider}] Success body is not valid JSON"
                    );
                    ExecuteError::Decode(e)
                })
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let reset_at = parse_ratelimit_reset(
                    resp.headers(),
                    &self.ratelimit_reset_header,
                    SystemTime::now(),
                    self.ratelimit_max_wait,
                );
                warn!(
                    provider,
                    attempt,
                    reset_hint = reset_at.is_some(),
                    "[{provider}] Rate limited (429)"
                );
                Err(ExecuteError::RateLimited { status, reset_at })
            }
            s if s.is_client_error() || s.is_server_error() => {
                Err(classify_rejection(provider, resp).await)
            }
            _ => {
                warn!(provider, attempt, %status, "[{provider}] Unexpected response status");
                Err(ExecuteError::UnexpectedStatus { status })
            }
        }
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url.as_str())
            .field("policy", &self.policy)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
