// ABOUTME: Configuration types and parsing for hmd.yml and ~/.hmd/config.yml.
// ABOUTME: Resolves SSH address and project from flags, project config, and global config.

mod global;
mod server;
mod stages;

pub use global::{GLOBAL_CONFIG_FILENAME, GlobalConfig, HMD_ROOT};
pub use server::SshAddress;
pub use stages::Stages;

use crate::error::{Error, Result};
use crate::types::ProjectName;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "hmd.yml";

/// Per-project config, `hmd.yml` in the repository root.
///
/// Every key besides the named fields is a stage mapping a name to a shell
/// command, run in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub ssh_address: SshAddress,

    pub project: ProjectName,

    /// Local files uploaded into the remote work tree on deploy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<PathBuf>,

    /// Command that runs the pipeline on the server.
    #[serde(
        default = "default_remote_bin",
        skip_serializing_if = "is_default_remote_bin"
    )]
    pub remote_bin: String,

    #[serde(flatten)]
    pub stages: Stages,
}

fn default_remote_bin() -> String {
    "hmd".to_string()
}

fn is_default_remote_bin(bin: &String) -> bool {
    *bin == default_remote_bin()
}

impl ProjectConfig {
    /// Fresh config with the default stages.
    pub fn new(project: ProjectName, ssh_address: SshAddress) -> Self {
        Self {
            ssh_address,
            project,
            artifacts: Vec::new(),
            remote_bin: default_remote_bin(),
            stages: Stages::default(),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(invalid_format)?;
        config.stages.validate().map_err(invalid_format)?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ConfigNotFound(
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            ),
            _ => Error::Io(e),
        })?;
        Self::from_yaml(&content)
    }

    /// Load `hmd.yml` from `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        Self::load(&dir.join(CONFIG_FILENAME))
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::write(dir.join(CONFIG_FILENAME), self.to_yaml()?)?;
        Ok(())
    }
}

fn invalid_format(err: impl std::fmt::Display) -> Error {
    Error::InvalidConfig(format!(
        "can't read {CONFIG_FILENAME}, try `hmd init` to overwrite: {err}"
    ))
}

/// Write `hmd.yml` in `dir` for `project` at `ssh_address`.
///
/// Stages, artifacts, and remote command of a readable existing file are kept.
pub fn init_project_config(
    dir: &Path,
    project: &ProjectName,
    ssh_address: &SshAddress,
) -> Result<ProjectConfig> {
    let config = match ProjectConfig::discover(dir) {
        Ok(existing) => ProjectConfig {
            project: project.clone(),
            ssh_address: ssh_address.clone(),
            ..existing
        },
        Err(e) => {
            tracing::debug!("Starting from default project config: {}", e);
            ProjectConfig::new(project.clone(), ssh_address.clone())
        }
    };
    config.save(dir)?;
    Ok(config)
}

/// Pick the SSH address: explicit flag, then project config, then global config.
pub fn resolve_ssh_address(
    flag: Option<SshAddress>,
    project: Option<&ProjectConfig>,
    global: Option<&GlobalConfig>,
) -> Result<SshAddress> {
    flag.or_else(|| project.map(|p| p.ssh_address.clone()))
        .or_else(|| global.map(|g| g.ssh_address.clone()))
        .ok_or(Error::SshAddressNotProvided)
}

/// Pick the project: explicit flag, then project config.
pub fn resolve_project(
    flag: Option<ProjectName>,
    project: Option<&ProjectConfig>,
) -> Result<ProjectName> {
    flag.or_else(|| project.map(|p| p.project.clone()))
        .ok_or(Error::ProjectNotProvided)
}

/// Project name derived from the name of `dir`.
pub fn project_from_dir(dir: &Path) -> Result<ProjectName> {
    let name = dir
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or(Error::ProjectNotProvided)?;
    Ok(ProjectName::new(name)?)
}
