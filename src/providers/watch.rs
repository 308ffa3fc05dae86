use deployctl_schema::{Deploy, Deployment};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::ExecuteError;
use crate::providers::RequestExecutor;

/// Provider-neutral deployment phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    Queued,
    Building,
    Ready,
    Failed,
    Canceled,
    Unknown,
}

impl DeployPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed | Self::Canceled)
    }
}

/// One status check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub phase: DeployPhase,
    /// Provider's own state name, for display.
    pub label: String,
    pub url: Option<String>,
    pub error: Option<String>,
}

impl StatusSnapshot {
    pub fn pending(label: impl Into<String>) -> Self {
        Self {
            phase: DeployPhase::Queued,
            label: label.into(),
            url: None,
            error: None,
        }
    }
}

impl From<&Deployment> for StatusSnapshot {
    fn from(deployment: &Deployment) -> Self {
        let state = deployment.ready_state();
        Self {
            phase: state.into(),
            label: format!("{state:?}").to_ascii_uppercase(),
            url: deployment.https_url(),
            error: deployment.error_message.clone(),
        }
    }
}

impl From<&Deploy> for StatusSnapshot {
    fn from(deploy: &Deploy) -> Self {
        let label = serde_json::to_value(deploy.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{:?}", deploy.status));
        Self {
            phase: deploy.status.into(),
            error: deploy.status.is_failure().then(|| label.clone()),
            label,
            url: None,
        }
    }
}

/// How a watch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    Ready { url: Option<String> },
    Failed { message: String },
    Canceled,
    TimedOut { checks: usize },
}

/// Polls `check` until it reports a terminal phase or `max_checks` checks have run.
///
/// A failed check is logged and counted; it does not end the watch. Waits between checks
/// use the executor's sleeper.
pub async fn watch<F, Fut>(
    executor: &RequestExecutor,
    id: &str,
    interval: Duration,
    max_checks: usize,
    mut check: F,
) -> WatchOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<StatusSnapshot, ExecuteError>>,
{
    let provider = executor.provider();
    let max_checks = max_checks.max(1);

    for check_num in 1..=max_checks {
        match check().await {
            Ok(snapshot) => match snapshot.phase {
                DeployPhase::Ready => {
                    info!(provider, id, url = ?snapshot.url, "[{provider}] Deployment {id} is ready");
                    return WatchOutcome::Ready { url: snapshot.url };
                }
                DeployPhase::Failed => {
                    let message = snapshot.error.unwrap_or(snapshot.label);
                    warn!(provider, id, message = %message, "[{provider}] Deployment {id} failed");
                    return WatchOutcome::Failed { message };
                }
                DeployPhase::Canceled => {
                    warn!(provider, id, state = %snapshot.label, "[{provider}] Deployment {id} canceled");
                    return WatchOutcome::Canceled;
                }
                DeployPhase::Queued | DeployPhase::Building | DeployPhase::Unknown => {
                    let elapsed = interval.saturating_mul(u32::try_from(check_num - 1).unwrap_or(u32::MAX));
                    info!(
                        provider,
                        id,
                        check = check_num,
                        state = %snapshot.label,
                        "[{provider}] [{}s] State: {}",
                        elapsed.as_secs(),
                        snapshot.label
                    );
                }
            },
            Err(err) => {
                warn!(provider, id, check = check_num, error = %err, "[{provider}] Status check failed");
            }
        }

        if check_num < max_checks {
            executor.pause(interval).await;
        }
    }

    warn!(provider, id, checks = max_checks, "[{provider}] Status check timed out (still building)");
    WatchOutcome::TimedOut { checks: max_checks }
}
