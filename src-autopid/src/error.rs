use autopid_env::EnvError;
use autopid_optim::OptimizerError;
use thiserror::Error;

/// Errors that stop a tuning session
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("cannot open data directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid trial settings: {0}")]
    InvalidSettings(String),
}

pub type Result<T> = std::result::Result<T, DriverError>;
