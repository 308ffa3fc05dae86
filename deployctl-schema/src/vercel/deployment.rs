use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Vercel `POST /v13/deployments` request body for a git-backed deployment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeploymentRequest {
    /// Project name; Vercel creates the project on first deploy.
    pub name: String,

    pub git_source: GitSource,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_settings: Option<ProjectSettings>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// `production`, `preview`, or unset for Vercel's default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GitSource {
    /// Git host, e.g. `github`.
    pub r#type: String,
    pub org: String,
    pub repo: String,
    pub r#ref: String,
}

impl GitSource {
    /// Splits an `owner/repo` slug into a GitHub source.
    pub fn github(slug: &str, git_ref: impl Into<String>) -> Option<Self> {
        let (org, repo) = slug.trim().trim_end_matches(".git").split_once('/')?;
        if org.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(Self {
            r#type: "github".to_string(),
            org: org.to_string(),
            repo: repo.to_string(),
            r#ref: git_ref.into(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_directory: Option<String>,
}

impl ProjectSettings {
    pub fn is_empty(&self) -> bool {
        self.framework.is_none()
            && self.build_command.is_none()
            && self.output_directory.is_none()
            && self.root_directory.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VercelReadyState {
    Queued,
    Initializing,
    Building,
    Ready,
    Error,
    Canceled,
    Deleted,
    #[serde(other)]
    Unknown,
}

/// Deployment object returned by create and get.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Hostname without scheme, e.g. `web-abc123.vercel.app`.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_state: Option<VercelReadyState>,

    /// Legacy name of `readyState`, still sent by some endpoints.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<VercelReadyState>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl Deployment {
    pub fn ready_state(&self) -> VercelReadyState {
        self.ready_state
            .or(self.state)
            .unwrap_or(VercelReadyState::Unknown)
    }

    pub fn https_url(&self) -> Option<String> {
        self.url
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|u| {
                if u.starts_with("http://") || u.starts_with("https://") {
                    u.to_string()
                } else {
                    format!("https://{u}")
                }
            })
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at.and_then(DateTime::from_timestamp_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn github_source_splits_slug() {
        let src = GitSource::github("acme/web.git", "main").expect("valid slug");
        assert_eq!(src.org, "acme");
        assert_eq!(src.repo, "web");
        assert_eq!(src.r#ref, "main");

        assert!(GitSource::github("no-slash", "main").is_none());
        assert!(GitSource::github("a/b/c", "main").is_none());
        assert!(GitSource::github("/web", "main").is_none());
    }

    #[test]
    fn create_request_skips_empty_parts() {
        let req = CreateDeploymentRequest {
            name: "web".to_string(),
            git_source: GitSource::github("acme/web", "main").expect("slug"),
            project_settings: None,
            env: BTreeMap::new(),
            target: None,
        };
        let value = serde_json::to_value(&req).expect("serialize");
        assert_eq!(
            value,
            json!({
                "name": "web",
                "gitSource": { "type": "github", "org": "acme", "repo": "web", "ref": "main" }
            })
        );
    }

    #[test]
    fn deployment_prefers_ready_state_and_builds_url() {
        let raw = json!({
            "id": "dpl_1",
            "projectId": "prj_1",
            "url": "web-abc.vercel.app",
            "readyState": "BUILDING",
            "state": "QUEUED",
            "createdAt": 1_767_225_600_000_i64
        });
        let dep: Deployment = serde_json::from_value(raw).expect("parse deployment");
        assert_eq!(dep.ready_state(), VercelReadyState::Building);
        assert_eq!(dep.https_url().as_deref(), Some("https://web-abc.vercel.app"));
        assert_eq!(
            dep.created_at_utc().map(|t| t.timestamp()),
            Some(1_767_225_600)
        );
    }

    #[test]
    fn deployment_falls_back_to_legacy_state() {
        let raw = json!({ "id": "dpl_2", "state": "ERROR", "errorMessage": "build failed" });
        let dep: Deployment = serde_json::from_value(raw).expect("parse deployment");
        assert_eq!(dep.ready_state(), VercelReadyState::Error);
        assert_eq!(dep.error_message.as_deref(), Some("build failed"));
        assert_eq!(dep.https_url(), None);
    }

    #[test]
    fn deleted_and_unknown_states_parse() {
        let dep: Deployment =
            serde_json::from_value(json!({ "id": "dpl_3", "readyState": "DELETED" }))
                .expect("parse deployment");
        assert_eq!(dep.ready_state(), VercelReadyState::Deleted);

        let dep: Deployment =
            serde_json::from_value(json!({ "id": "dpl_4", "readyState": "ARCHIVED" }))
                .expect("parse deployment");
        assert_eq!(dep.ready_state(), VercelReadyState::Unknown);
    }
}
