mod client;

pub use client::RenderClient;

use deployctl_schema::{
    CreateServiceRequest, EnvSpecificDetails, EnvVar, RenderDeployStatus, WebServiceDetails,
};

use crate::providers::DeployPhase;

pub(crate) const PROVIDER: &str = "render";
pub(crate) const API_KEY_ENV: &str = "DEPLOYCTL_PROVIDERS__RENDER__API_KEY";
pub(crate) const OWNER_ID_ENV: &str = "DEPLOYCTL_PROVIDERS__RENDER__OWNER_ID";

/// What to create on Render: a git-backed web service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    pub repo: String,
    pub branch: String,
    pub root_dir: Option<String>,
    pub runtime: String,
    pub plan: String,
    pub build_command: String,
    pub start_command: String,
    pub env_vars: Vec<EnvVar>,
}

impl ServiceSpec {
    pub fn to_request(&self, owner_id: &str) -> CreateServiceRequest {
        CreateServiceRequest {
            owner_id: owner_id.to_string(),
            name: self.name.clone(),
            r#type: "web_service".to_string(),
            repo: self.repo.clone(),
            branch: self.branch.clone(),
            root_dir: self.root_dir.clone().filter(|d| !d.is_empty()),
            service_details: WebServiceDetails {
                runtime: self.runtime.clone(),
                plan: self.plan.clone(),
                env_specific_details: EnvSpecificDetails {
                    build_command: self.build_command.clone(),
                    start_command: self.start_command.clone(),
                },
                num_instances: None,
            },
            env_vars: self.env_vars.clone(),
        }
    }
}

impl From<RenderDeployStatus> for DeployPhase {
    fn from(status: RenderDeployStatus) -> Self {
        match status {
            RenderDeployStatus::Created | RenderDeployStatus::Queued => DeployPhase::Queued,
            RenderDeployStatus::BuildInProgress
            | RenderDeployStatus::UpdateInProgress
            | RenderDeployStatus::PreDeployInProgress => DeployPhase::Building,
            RenderDeployStatus::Live => DeployPhase::Ready,
            RenderDeployStatus::BuildFailed
            | RenderDeployStatus::UpdateFailed
            | RenderDeployStatus::PreDeployFailed => DeployPhase::Failed,
            RenderDeployStatus::Canceled | RenderDeployStatus::Deactivated => {
                DeployPhase::Canceled
            }
            RenderDeployStatus::Unknown => DeployPhase::Unknown,
        }
    }
}
