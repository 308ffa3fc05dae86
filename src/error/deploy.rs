use std::path::PathBuf;
use thiserror::Error as ThisError;

use super::ExecuteError;

/// Top-level error for CLI commands.
#[derive(Debug, ThisError)]
pub enum DeployError {
    #[error(transparent)]
    Execute(#[from] ExecuteError),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// A command needs a credential that is not configured.
    #[error("Missing credential {name}; set {env}")]
    MissingCredential {
        name: &'static str,
        env: &'static str,
    },

    #[error("HTTP client setup error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Deployment {id} failed: {message}")]
    DeploymentFailed { id: String, message: String },

    #[error("Deployment {id} was canceled")]
    DeploymentCanceled { id: String },

    #[error("Deployment {id} still not finished after {checks} status checks")]
    WatchTimedOut { id: String, checks: usize },
}
