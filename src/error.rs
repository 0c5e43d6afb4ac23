// ABOUTME: Application-wide error types for hmd.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

use crate::status::StatusError;
use crate::types::ProjectNameError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no hmd.yml in {0}, try `hmd init`")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("project not provided")]
    ProjectNotProvided,

    #[error("SSH address not provided")]
    SshAddressNotProvided,

    #[error("HOME is not set")]
    HomeNotSet,

    #[error("HEAD is detached, check out a branch to deploy")]
    DetachedHead,

    #[error("invalid project name: {0}")]
    ProjectName(#[from] ProjectNameError),

    #[error("`{command}` terminated with {status}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("remote command failed with exit code {exit_code}: {stderr}")]
    RemoteCommandFailed { exit_code: u32, stderr: String },

    #[error("stage `{stage}` failed")]
    StageFailed { index: usize, stage: String },

    #[error("SSH error: {0}")]
    Ssh(#[from] crate::ssh::Error),

    #[error("status error: {0}")]
    Status(#[from] StatusError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
