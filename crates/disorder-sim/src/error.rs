use neurodyn_core::DynamicsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Dynamics(#[from] DynamicsError),
    #[error("failed to parse simulation config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("feedback loop {0} is not registered")]
    MissingLoop(&'static str),
    #[error("seed sweep needs at least one seed")]
    EmptySweep,
}

pub type SimResult<T> = Result<T, SimError>;
