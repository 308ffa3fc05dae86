mod deploy;
mod execute;

pub use deploy::DeployError;
pub use execute::ExecuteError;

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
