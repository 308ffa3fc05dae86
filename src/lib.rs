pub mod cli;
pub mod config;
pub mod error;
pub mod providers;
pub mod utils;

pub use config::Config;
pub use error::{DeployError, ExecuteError};
pub use providers::RequestExecutor;
pub use providers::render::RenderClient;
pub use providers::vercel::VercelClient;
