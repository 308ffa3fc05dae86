mod deployment;

pub use deployment::{
    CreateDeploymentRequest, Deployment, GitSource, ProjectSettings, VercelReadyState,
};
