use std::{path::PathBuf, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{step} did not complete within {timeout:?}")]
    StepTimedOut { step: &'static str, timeout: Duration },
    #[error("{step} worker has shut down")]
    WorkerGone { step: &'static str },
    #[error("sampling step must be a positive number of seconds, got {0}")]
    InvalidStep(f64),
    #[error("no frame captured, seek first")]
    NoFrameReady,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown analysis mode `{0}`")]
    UnknownMode(String),
    #[error("only single-hand detection is supported, got max_hands = {0}")]
    UnsupportedHandCount(u32),
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("{name} must lie within 0..=1, got {value}")]
    OutOfUnitRange { name: &'static str, value: f64 },
}
