use deployctl_schema::Deployment;
use reqwest::Method;
use std::time::Duration;
use tracing::info;

use super::{DEPLOYMENTS_PATH, DeploymentSpec, PROVIDER, TOKEN_ENV};
use crate::config::VercelResolvedConfig;
use crate::error::{DeployError, ExecuteError};
use crate::providers::watch::{StatusSnapshot, WatchOutcome, watch};
use crate::providers::{RequestExecutor, build_http_client, validate_resource_id};

/// Vercel REST client; every call goes through the retrying executor.
#[derive(Debug, Clone)]
pub struct VercelClient {
    executor: RequestExecutor,
}

impl VercelClient {
    pub fn new(cfg: &VercelResolvedConfig) -> Result<Self, DeployError> {
        let token = cfg.token.clone().ok_or(DeployError::MissingCredential {
            name: "providers.vercel.token",
            env: TOKEN_ENV,
        })?;
        let client = build_http_client(&cfg.upstream)?;
        let mut executor =
            RequestExecutor::new(PROVIDER, client, cfg.api_url.clone(), token, &cfg.upstream);
        if let Some(team_id) = cfg.team_id.as_deref() {
            executor = executor.with_query("teamId", team_id);
        }

        Ok(Self::from_executor(executor))
    }

    pub fn from_executor(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub async fn create_deployment(&self, spec: &DeploymentSpec) -> Result<Deployment, DeployError> {
        let request = spec.to_request()?;
        info!(
            provider = PROVIDER,
            project = %spec.name,
            repo = %spec.repo,
            git_ref = %spec.git_ref,
            env_vars = request.env.len(),
            "[vercel] Creating deployment for {}",
            spec.name
        );

        let deployment: Deployment = self
            .executor
            .execute_json(Method::POST, DEPLOYMENTS_PATH, Some(&request))
            .await?;

        info!(
            provider = PROVIDER,
            deployment_id = %deployment.id,
            project_id = deployment.project_id.as_deref().unwrap_or("<unknown>"),
            url = deployment.url.as_deref().unwrap_or("<pending>"),
            "[vercel] Deployment created"
        );
        Ok(deployment)
    }

    pub async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment, DeployError> {
        let deployment_id = validate_resource_id(deployment_id)?;
        Ok(self.fetch_deployment(deployment_id).await?)
    }

    /// Polls a deployment until it is ready, errors, or checks run out.
    pub async fn watch_deployment(
        &self,
        deployment_id: &str,
        interval: Duration,
        max_checks: usize,
    ) -> Result<WatchOutcome, DeployError> {
        let deployment_id = validate_resource_id(deployment_id)?;

        let outcome = watch(
            &self.executor,
            deployment_id,
            interval,
            max_checks,
            || async move {
                let deployment = self.fetch_deployment(deployment_id).await?;
                Ok(StatusSnapshot::from(&deployment))
            },
        )
        .await;

        Ok(outcome)
    }

    async fn fetch_deployment(&self, deployment_id: &str) -> Result<Deployment, ExecuteError> {
        self.executor
            .get_json(&format!("{DEPLOYMENTS_PATH}/{deployment_id}"))
            .await
    }
}
