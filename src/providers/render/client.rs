use deployctl_schema::{CreateServiceResponse, Deploy, DeployListItem, Service, ServiceList};
use reqwest::Method;
use std::time::Duration;
use tracing::info;

use super::{API_KEY_ENV, OWNER_ID_ENV, PROVIDER, ServiceSpec};
use crate::config::RenderResolvedConfig;
use crate::error::{DeployError, ExecuteError};
use crate::providers::watch::{StatusSnapshot, WatchOutcome, watch};
use crate::providers::{RequestExecutor, build_http_client, validate_resource_id};

/// Render.com REST client; every call goes through the retrying executor.
#[derive(Debug, Clone)]
pub struct RenderClient {
    executor: RequestExecutor,
    owner_id: Option<String>,
}

impl RenderClient {
    pub fn new(cfg: &RenderResolvedConfig) -> Result<Self, DeployError> {
        let api_key = cfg
            .api_key
            .clone()
            .ok_or(DeployError::MissingCredential {
                name: "providers.render.api_key",
                env: API_KEY_ENV,
            })?;
        let client = build_http_client(&cfg.upstream)?;
        let executor =
            RequestExecutor::new(PROVIDER, client, cfg.api_url.clone(), api_key, &cfg.upstream);

        Ok(Self::from_executor(executor, cfg.owner_id.clone()))
    }

    pub fn from_executor(executor: RequestExecutor, owner_id: Option<String>) -> Self {
        Self { executor, owner_id }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub async fn list_services(&self) -> Result<Vec<Service>, ExecuteError> {
        let list: ServiceList = self.executor.get_json("/services?limit=100").await?;
        Ok(list.into_services())
    }

    pub async fn create_service(
        &self,
        spec: &ServiceSpec,
    ) -> Result<CreateServiceResponse, DeployError> {
        let owner_id = self
            .owner_id
            .as_deref()
            .filter(|o| !o.trim().is_empty())
            .ok_or(DeployError::MissingCredential {
                name: "providers.render.owner_id",
                env: OWNER_ID_ENV,
            })?;

        let request = spec.to_request(owner_id);
        info!(
            provider = PROVIDER,
            service = %spec.name,
            root_dir = spec.root_dir.as_deref().unwrap_or("<repo root>"),
            env_vars = spec.env_vars.len(),
            "[render] Creating service {}",
            spec.name
        );

        let created: CreateServiceResponse = self
            .executor
            .execute_json(Method::POST, "/services", Some(&request))
            .await?;

        info!(
            provider = PROVIDER,
            service_id = %created.service().id,
            deploy_id = created.deploy_id().unwrap_or("<none>"),
            "[render] Service created"
        );
        Ok(created)
    }

    pub async fn get_service(&self, service_id: &str) -> Result<Service, DeployError> {
        let service_id = validate_resource_id(service_id)?;
        Ok(self
            .executor
            .get_json(&format!("/services/{service_id}"))
            .await?)
    }

    /// Most recent deploy of a service, if it has any.
    pub async fn latest_deploy(&self, service_id: &str) -> Result<Option<Deploy>, DeployError> {
        let service_id = validate_resource_id(service_id)?;
        Ok(self.fetch_latest_deploy(service_id).await?)
    }

    /// Polls the latest deploy of `service` until it goes live, fails, or checks run out.
    ///
    /// A live deploy reports the service's public URL.
    pub async fn watch_latest_deploy(
        &self,
        service: &Service,
        interval: Duration,
        max_checks: usize,
    ) -> Result<WatchOutcome, DeployError> {
        let service_id = validate_resource_id(&service.id)?;
        let service_url = service.url();

        let outcome = watch(&self.executor, service_id, interval, max_checks, || async move {
            let mut snapshot = match self.fetch_latest_deploy(service_id).await? {
                Some(deploy) => StatusSnapshot::from(&deploy),
                None => StatusSnapshot::pending("no deploys yet"),
            };
            snapshot.url = service_url.map(str::to_string);
            Ok(snapshot)
        })
        .await;

        Ok(outcome)
    }

    async fn fetch_latest_deploy(&self, service_id: &str) -> Result<Option<Deploy>, ExecuteError> {
        let deploys: Vec<DeployListItem> = self
            .executor
            .get_json(&format!("/services/{service_id}/deploys?limit=1"))
            .await?;
        Ok(deploys.into_iter().next().map(|item| item.deploy))
    }
}
