use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::EnvVar;

/// Render `POST /services` request body for a web service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceRequest {
    pub owner_id: String,
    pub name: String,

    /// Always `web_service` for this tool.
    pub r#type: String,

    pub repo: String,
    pub branch: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<String>,

    pub service_details: WebServiceDetails,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env_vars: Vec<EnvVar>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebServiceDetails {
    /// Runtime identifier, e.g. `node`, `python`, `docker`.
    pub runtime: String,
    pub plan: String,
    pub env_specific_details: EnvSpecificDetails,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_instances: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvSpecificDetails {
    pub build_command: String,
    pub start_command: String,
}

/// A Render service as returned by the list/get/create endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspended: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_details: Option<ServiceDetails>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceDetails {
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl Service {
    /// Public URL assigned by Render, once known.
    pub fn url(&self) -> Option<&str> {
        self.service_details
            .as_ref()
            .and_then(|d| d.url.as_deref())
            .filter(|u| !u.is_empty())
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.as_deref() == Some("suspended")
    }
}

/// `POST /services` answers with `{ "service": ..., "deployId": ... }`; older
/// responses carry the service object bare.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CreateServiceResponse {
    Wrapped {
        service: Service,
        #[serde(rename = "deployId")]
        #[serde(default)]
        deploy_id: Option<String>,
    },
    Bare(Service),
}

impl CreateServiceResponse {
    pub fn service(&self) -> &Service {
        match self {
            Self::Wrapped { service, .. } | Self::Bare(service) => service,
        }
    }

    pub fn deploy_id(&self) -> Option<&str> {
        match self {
            Self::Wrapped { deploy_id, .. } => deploy_id.as_deref(),
            Self::Bare(_) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceListItem {
    #[serde(default)]
    pub cursor: Option<String>,
    pub service: Service,
}

/// `GET /services` body: a cursor-paginated array, or the same array under `value`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServiceList {
    Items(Vec<ServiceListItem>),
    Envelope { value: Vec<ServiceListItem> },
}

impl ServiceList {
    pub fn into_services(self) -> Vec<Service> {
        let items = match self {
            Self::Items(items) | Self::Envelope { value: items } => items,
        };
        items.into_iter().map(|item| item.service).collect()
    }
}
