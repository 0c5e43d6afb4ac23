// ABOUTME: Error types for the stage status tracker.
// ABOUTME: Covers out-of-range stage indices and status file write failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("stage index {index} out of range for {len} stage(s)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("failed to write status record to {path}: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StatusError {
    pub(crate) fn write_failure(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StatusError::WriteFailure {
            path: path.into(),
            source,
        }
    }
}

pub type StatusResult<T> = std::result::Result<T, StatusError>;
