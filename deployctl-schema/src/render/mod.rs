mod deploy;
mod service;

pub use deploy::{Deploy, DeployCommit, DeployListItem, RenderDeployStatus};
pub use service::{
    CreateServiceRequest, CreateServiceResponse, EnvSpecificDetails, Service, ServiceDetails,
    ServiceList, ServiceListItem, WebServiceDetails,
};
