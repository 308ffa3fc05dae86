pub mod error;
pub mod render;
pub mod vercel;

pub use error::{EnvVar, ProviderErrorBody, ProviderErrorObject};
pub use render::{
    CreateServiceRequest, CreateServiceResponse, Deploy, DeployCommit, DeployListItem,
    EnvSpecificDetails, RenderDeployStatus, Service, ServiceDetails, ServiceList, ServiceListItem,
    WebServiceDetails,
};
pub use vercel::{
    CreateDeploymentRequest, Deployment, GitSource, ProjectSettings, VercelReadyState,
};
