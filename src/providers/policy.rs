use deployctl_schema::ProviderErrorBody;
use rand::Rng;
use reqwest::header::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::UpstreamResolvedConfig;
use crate::error::ExecuteError;
use crate::utils::logging::with_pretty_json_debug;

pub const UPSTREAM_BODY_PREVIEW_CHARS: usize = 300;

/// Reset header values at or above this are Unix timestamps, smaller ones are delta seconds.
const EPOCH_SECONDS_THRESHOLD: u64 = 1_000_000_000;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Retry budget and delay schedule for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base_delay: Duration,
    max_attempts: usize,
}

impl BackoffPolicy {
    pub fn new(base_delay: Duration, max_attempts: usize) -> Self {
        Self {
            base_delay,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(cfg: &UpstreamResolvedConfig) -> Self {
        Self::new(cfg.retry_base_delay, cfg.retry_max_times)
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Total attempts, first try included.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// `2^attempt * base` plus a uniform jitter below 10% of that value.
    ///
    /// `attempt` is zero-based: the wait after the first failed try uses `attempt = 0`.
    pub fn exponential_delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base_nanos = u64::try_from(self.base_delay.as_nanos()).unwrap_or(u64::MAX);
        let factor = 1_u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let wait_nanos = base_nanos.saturating_mul(factor);

        let jitter_cap = wait_nanos / 10;
        let jitter_nanos = if jitter_cap == 0 {
            0
        } else {
            rng.random_range(0..jitter_cap)
        };

        Duration::from_nanos(wait_nanos.saturating_add(jitter_nanos))
    }

    /// Time left until `reset_at` (zero once passed) plus a uniform jitter in `[0, 1)` seconds.
    pub fn reset_delay<R: Rng + ?Sized>(
        &self,
        reset_at: SystemTime,
        now: SystemTime,
        rng: &mut R,
    ) -> Duration {
        let until_reset = reset_at.duration_since(now).unwrap_or(Duration::ZERO);
        until_reset + Duration::from_nanos(rng.random_range(0..NANOS_PER_SEC))
    }

    /// The exponential schedule for the retries left after the first attempt.
    pub fn backoff(&self) -> ProviderBackoff {
        ProviderBackoff {
            policy: *self,
            attempt: 0,
            remaining: self.max_attempts - 1,
        }
    }
}

impl backon::BackoffBuilder for BackoffPolicy {
    type Backoff = ProviderBackoff;

    fn build(self) -> Self::Backoff {
        self.backoff()
    }
}

/// Iterator of exponential delays consumed by `backon`; one item per remaining retry.
///
/// Rate-limit reset hints replace individual items at retry time; the item is still
/// consumed, so a server hint costs one attempt like any other retry.
#[derive(Debug, Clone)]
pub struct ProviderBackoff {
    policy: BackoffPolicy,
    attempt: u32,
    remaining: usize,
}

impl Iterator for ProviderBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let delay = self
            .policy
            .exponential_delay(self.attempt, &mut rand::rng());
        self.attempt = self.attempt.saturating_add(1);
        Some(delay)
    }
}

/// Reads the rate-limit reset hint from `headers`.
///
/// Values are integer seconds: Unix timestamps when large, otherwise an offset from `now`.
/// Missing or malformed values yield `None`, and so do hints more than `max_wait` away.
pub fn parse_ratelimit_reset(
    headers: &HeaderMap,
    header_name: &str,
    now: SystemTime,
    max_wait: Duration,
) -> Option<SystemTime> {
    let raw = headers.get(header_name)?.to_str().ok()?.trim();
    let value: u64 = raw.parse().ok()?;

    let reset_at = if value >= EPOCH_SECONDS_THRESHOLD {
        UNIX_EPOCH.checked_add(Duration::from_secs(value))?
    } else {
        now.checked_add(Duration::from_secs(value))?
    };

    match reset_at.duration_since(now) {
        Ok(until_reset) if until_reset > max_wait => {
            tracing::debug!(
                header = header_name,
                value,
                max_wait_secs = max_wait.as_secs(),
                "Ignoring rate-limit reset hint beyond max wait"
            );
            None
        }
        _ => Some(reset_at),
    }
}

/// Turns a terminal error response into `ExecuteError::Rejected`.
pub async fn classify_rejection(provider: &'static str, resp: reqwest::Response) -> ExecuteError {
    let status = resp.status();
    let bytes = resp.bytes().await.unwrap_or_default();
    let message = rejection_message(provider, &bytes)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

    tracing::warn!(
        provider,
        %status,
        message = %message,
        "[{provider}] Request rejected (not retrying)"
    );

    ExecuteError::Rejected { status, message }
}

/// Provider-supplied message from an error body, or a preview of the raw body.
fn rejection_message(provider: &'static str, bytes: &[u8]) -> Option<String> {
    if let Ok(body) = serde_json::from_slice::<ProviderErrorBody>(bytes) {
        with_pretty_json_debug(&body, |pretty_body| {
            tracing::debug!(provider, body = %pretty_body, "Upstream structured error");
        });

        if let Some(message) = body.message() {
            return Some(message.to_string());
        }
    }

    let raw_body = String::from_utf8_lossy(bytes);
    let raw_body = raw_body.trim();
    if raw_body.is_empty() {
        return None;
    }
    Some(format!(
        "{:.len$}",
        raw_body,
        len = UPSTREAM_BODY_PREVIEW_CHARS
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use reqwest::header::HeaderValue;

    const MAX_WAIT: Duration = Duration::from_secs(300);

    fn policy() -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_secs(1), 5)
    }

    #[test]
    fn exponential_delay_stays_within_jitter_band() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(7);

        for attempt in 0..6_u32 {
            let floor = Duration::from_secs(1 << attempt);
            let ceiling = floor + floor / 10;
            for _ in 0..200 {
                let delay = policy.exponential_delay(attempt, &mut rng);
                assert!(delay >= floor, "attempt {attempt}: {delay:?} < {floor:?}");
                assert!(delay < ceiling, "attempt {attempt}: {delay:?} >= {ceiling:?}");
            }
        }
    }

    #[test]
    fn exponential_delay_with_zero_base_is_zero() {
        let policy = BackoffPolicy::new(Duration::ZERO, 3);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(policy.exponential_delay(4, &mut rng), Duration::ZERO);
    }

    #[test]
    fn exponential_delay_saturates_instead_of_overflowing() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(3);
        let delay = policy.exponential_delay(200, &mut rng);
        assert_eq!(delay, Duration::from_nanos(u64::MAX));
    }

    #[test]
    fn reset_delay_waits_until_reset_plus_under_one_second() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(11);
        let now = UNIX_EPOCH + Duration::from_secs(1_800_000_000);
        let reset_at = now + Duration::from_secs(12);

        for _ in 0..200 {
            let delay = policy.reset_delay(reset_at, now, &mut rng);
            assert!(delay >= Duration::from_secs(12));
            assert!(delay < Duration::from_secs(13));
        }
    }

    #[test]
    fn reset_in_the_past_only_waits_for_jitter() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(5);
        let now = UNIX_EPOCH + Duration::from_secs(1_800_000_000);
        let reset_at = now - Duration::from_secs(30);

        let delay = policy.reset_delay(reset_at, now, &mut rng);
        assert!(delay < Duration::from_secs(1));
    }

    #[test]
    fn backoff_yields_one_delay_per_retry() {
        let delays: Vec<Duration> = BackoffPolicy::new(Duration::from_millis(10), 4)
            .backoff()
            .collect();
        assert_eq!(delays.len(), 3);
        assert!(delays[0] >= Duration::from_millis(10) && delays[0] < Duration::from_millis(11));
        assert!(delays[1] >= Duration::from_millis(20) && delays[1] < Duration::from_millis(22));
        assert!(delays[2] >= Duration::from_millis(40) && delays[2] < Duration::from_millis(44));

        assert_eq!(BackoffPolicy::new(Duration::from_secs(1), 1).backoff().count(), 0);
        assert_eq!(BackoffPolicy::new(Duration::from_secs(1), 0).max_attempts(), 1);
    }

    #[test]
    fn reset_header_accepts_epoch_and_delta_seconds() {
        let now = UNIX_EPOCH + Duration::from_secs(1_800_000_000);
        let mut headers = HeaderMap::new();

        headers.insert("ratelimit-reset", HeaderValue::from_static("1800000042"));
        assert_eq!(
            parse_ratelimit_reset(&headers, "Ratelimit-Reset", now, MAX_WAIT),
            Some(UNIX_EPOCH + Duration::from_secs(1_800_000_042))
        );

        headers.insert("ratelimit-reset", HeaderValue::from_static(" 30 "));
        assert_eq!(
            parse_ratelimit_reset(&headers, "Ratelimit-Reset", now, MAX_WAIT),
            Some(now + Duration::from_secs(30))
        );
    }

    #[test]
    fn malformed_or_missing_reset_header_is_ignored() {
        let now = SystemTime::now();
        let mut headers = HeaderMap::new();
        assert_eq!(parse_ratelimit_reset(&headers, "Ratelimit-Reset", now, MAX_WAIT), None);

        headers.insert("ratelimit-reset", HeaderValue::from_static("soon"));
        assert_eq!(parse_ratelimit_reset(&headers, "Ratelimit-Reset", now, MAX_WAIT), None);

        headers.insert("ratelimit-reset", HeaderValue::from_static("1.5"));
        assert_eq!(parse_ratelimit_reset(&headers, "Ratelimit-Reset", now, MAX_WAIT), None);
    }

    #[test]
    fn reset_hint_beyond_max_wait_is_ignored() {
        let now = UNIX_EPOCH + Duration::from_secs(1_800_000_000);
        let mut headers = HeaderMap::new();

        // Millisecond epoch would otherwise mean a wait of millennia.
        headers.insert("ratelimit-reset", HeaderValue::from_static("1800000030000"));
        assert_eq!(parse_ratelimit_reset(&headers, "Ratelimit-Reset", now, MAX_WAIT), None);

        headers.insert("ratelimit-reset", HeaderValue::from_static("999999999"));
        assert_eq!(parse_ratelimit_reset(&headers, "Ratelimit-Reset", now, MAX_WAIT), None);

        headers.insert("ratelimit-reset", HeaderValue::from_static("301"));
        assert_eq!(parse_ratelimit_reset(&headers, "Ratelimit-Reset", now, MAX_WAIT), None);

        headers.insert("ratelimit-reset", HeaderValue::from_static("300"));
        assert_eq!(
            parse_ratelimit_reset(&headers, "Ratelimit-Reset", now, MAX_WAIT),
            Some(now + MAX_WAIT)
        );

        // Past resets are kept; they only cost the jitter.
        headers.insert("ratelimit-reset", HeaderValue::from_static("1799999990"));
        assert_eq!(
            parse_ratelimit_reset(&headers, "Ratelimit-Reset", now, MAX_WAIT),
            Some(UNIX_EPOCH + Duration::from_secs(1_799_999_990))
        );
    }

    #[test]
    fn rejection_message_prefers_structured_message() {
        assert_eq!(
            rejection_message("render", br#"{"message":"invalid owner"}"#).as_deref(),
            Some("invalid owner")
        );
        assert_eq!(
            rejection_message("vercel", br#"{"error":{"code":"forbidden","message":"no access"}}"#)
                .as_deref(),
            Some("no access")
        );
    }

    #[test]
    fn rejection_message_falls_back_to_raw_preview() {
        assert_eq!(
            rejection_message("render", b"<html>Bad Gateway</html>").as_deref(),
            Some("<html>Bad Gateway</html>")
        );

        let long = "x".repeat(UPSTREAM_BODY_PREVIEW_CHARS * 2);
        let preview = rejection_message("render", long.as_bytes()).expect("preview");
        assert_eq!(preview.len(), UPSTREAM_BODY_PREVIEW_CHARS);

        assert_eq!(rejection_message("render", b"   "), None);
        assert_eq!(rejection_message("render", br#"{"id":"x"}"#).as_deref(), Some(r#"{"id":"x"}"#));
    }
}
