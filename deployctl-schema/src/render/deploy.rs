use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Render deploy status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderDeployStatus {
    Created,
    Queued,
    BuildInProgress,
    UpdateInProgress,
    PreDeployInProgress,
    Live,
    Deactivated,
    BuildFailed,
    UpdateFailed,
    PreDeployFailed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl RenderDeployStatus {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::BuildFailed | Self::UpdateFailed | Self::PreDeployFailed
        )
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deploy {
    pub id: String,
    pub status: RenderDeployStatus,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<DeployCommit>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeployCommit {
    pub id: String,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Deploy {
    /// Wall time between creation and completion, if the deploy has finished.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.created_at?)
    }
}

/// One entry of `GET /services/{id}/deploys`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployListItem {
    #[serde(default)]
    pub cursor: Option<String>,
    pub deploy: Deploy,
}
