mod client;

pub use client::VercelClient;

use deployctl_schema::{CreateDeploymentRequest, EnvVar, GitSource, ProjectSettings, VercelReadyState};

use crate::error::DeployError;
use crate::providers::DeployPhase;

pub(crate) const PROVIDER: &str = "vercel";
pub(crate) const TOKEN_ENV: &str = "DEPLOYCTL_PROVIDERS__VERCEL__TOKEN";

const DEPLOYMENTS_PATH: &str = "/v13/deployments";

/// What to deploy on Vercel: a GitHub repository at a ref, with optional build settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentSpec {
    pub name: String,
    /// `owner/repo` slug.
    pub repo: String,
    pub git_ref: String,
    pub root_dir: Option<String>,
    pub framework: Option<String>,
    pub build_command: Option<String>,
    pub output_directory: Option<String>,
    pub env: Vec<EnvVar>,
    pub target: Option<String>,
}

impl DeploymentSpec {
    pub fn to_request(&self) -> Result<CreateDeploymentRequest, DeployError> {
        let git_source = GitSource::github(&self.repo, self.git_ref.clone()).ok_or_else(|| {
            DeployError::InvalidInput(format!(
                "repository must be an owner/repo slug, got {:?}",
                self.repo
            ))
        })?;

        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        let settings = ProjectSettings {
            framework: non_empty(&self.framework),
            build_command: non_empty(&self.build_command),
            output_directory: non_empty(&self.output_directory),
            root_directory: non_empty(&self.root_dir),
        };

        Ok(CreateDeploymentRequest {
            name: self.name.clone(),
            git_source,
            project_settings: (!settings.is_empty()).then_some(settings),
            env: self
                .env
                .iter()
                .map(|e| (e.key.clone(), e.value.clone()))
                .collect(),
            target: non_empty(&self.target),
        })
    }
}

impl From<VercelReadyState> for DeployPhase {
    fn from(state: VercelReadyState) -> Self {
        match state {
            VercelReadyState::Queued => DeployPhase::Queued,
            VercelReadyState::Initializing | VercelReadyState::Building => DeployPhase::Building,
            VercelReadyState::Ready => DeployPhase::Ready,
            VercelReadyState::Error => DeployPhase::Failed,
            VercelReadyState::Canceled | VercelReadyState::Deleted => DeployPhase::Canceled,
            VercelReadyState::Unknown => DeployPhase::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> DeploymentSpec {
        DeploymentSpec {
            name: "web".to_string(),
            repo: "acme/web".to_string(),
            git_ref: "main".to_string(),
            root_dir: Some("web".to_string()),
            framework: Some("nextjs".to_string()),
            build_command: Some("npm ci && npm run build".to_string()),
            output_directory: Some(".next".to_string()),
            env: vec![
                EnvVar::new("NODE_ENV", "production"),
                EnvVar::new("NEXT_PUBLIC_API_BASE_URL", "https://api.example.com/v1"),
            ],
            target: None,
        }
    }

    #[test]
    fn spec_maps_to_git_deployment() {
        let req = spec().to_request().expect("valid spec");
        assert_eq!(req.git_source.org, "acme");
        assert_eq!(req.git_source.repo, "web");
        assert_eq!(req.git_source.r#ref, "main");

        let settings = req.project_settings.expect("settings present");
        assert_eq!(settings.framework.as_deref(), Some("nextjs"));
        assert_eq!(settings.root_directory.as_deref(), Some("web"));
        assert_eq!(req.env.len(), 2);
        assert_eq!(req.env.get("NODE_ENV").map(String::as_str), Some("production"));
    }

    #[test]
    fn blank_settings_are_omitted() {
        let spec = DeploymentSpec {
            name: "web".to_string(),
            repo: "acme/web".to_string(),
            git_ref: "main".to_string(),
            framework: Some("  ".to_string()),
            ..DeploymentSpec::default()
        };
        let req = spec.to_request().expect("valid spec");
        assert!(req.project_settings.is_none());
        assert!(req.target.is_none());
    }

    #[test]
    fn bad_repo_slug_is_invalid_input() {
        let spec = DeploymentSpec {
            repo: "https://github.com/acme/web.git".to_string(),
            ..spec()
        };
        assert!(matches!(spec.to_request(), Err(DeployError::InvalidInput(_))));
    }

    #[test]
    fn ready_states_map_to_phases() {
        assert_eq!(DeployPhase::from(VercelReadyState::Initializing), DeployPhase::Building);
        assert_eq!(DeployPhase::from(VercelReadyState::Ready), DeployPhase::Ready);
        assert_eq!(DeployPhase::from(VercelReadyState::Error), DeployPhase::Failed);
        assert!(DeployPhase::from(VercelReadyState::Canceled).is_terminal());
        assert_eq!(DeployPhase::from(VercelReadyState::Deleted), DeployPhase::Canceled);
        assert!(!DeployPhase::from(VercelReadyState::Queued).is_terminal());
    }
}
