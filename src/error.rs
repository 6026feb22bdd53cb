use crate::models::JobId;
use std::path::PathBuf;
use thiserror::Error;

/// Reasons `start` refuses a job before anything is spawned.
#[derive(Debug, Error)]
pub enum InvalidInput {
    #[error("unknown hash algorithm '{0}'")]
    UnknownAlgorithm(String),
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("cannot open {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    #[error("job {0} is still running")]
    JobAlreadyRunning(JobId),

    #[error("read failed for {} after {bytes_read} bytes: {source}", .path.display())]
    Io {
        path: PathBuf,
        bytes_read: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("could not spawn hashing worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("hashing worker exited before finishing")]
    WorkerExited,
}

impl EngineError {
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, EngineError::InvalidInput(_))
    }
}
