// ABOUTME: Machine-wide settings stored in ~/.hmd/config.yml.
// ABOUTME: Supplies the fallback SSH address and SSH authentication options.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::ssh::SessionConfig;

use super::SshAddress;

/// Local and remote root directory of hmd state, relative to `$HOME`.
pub const HMD_ROOT: &str = ".hmd";
pub const GLOBAL_CONFIG_FILENAME: &str = "config.yml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub ssh_address: SshAddress,

    /// Private key used instead of the SSH agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,

    /// Accept and remember unknown host keys.
    #[serde(default = "default_trust_first_connection")]
    pub trust_first_connection: bool,
}

fn default_trust_first_connection() -> bool {
    true
}

impl GlobalConfig {
    pub fn new(ssh_address: SshAddress) -> Self {
        Self {
            ssh_address,
            key_path: None,
            trust_first_connection: default_trust_first_connection(),
        }
    }

    /// `$HOME/.hmd/config.yml`.
    pub fn default_path() -> Result<PathBuf> {
        let home = std::env::var_os("HOME").ok_or(Error::HomeNotSet)?;
        Ok(PathBuf::from(home)
            .join(HMD_ROOT)
            .join(GLOBAL_CONFIG_FILENAME))
    }

    /// Load the config, `None` if the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_yaml::from_str(&content)
                .map(Some)
                .map_err(|e| Error::InvalidConfig(format!("can't read {}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn load_default() -> Result<Option<Self>> {
        Self::load(&Self::default_path()?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Apply the authentication options to a session config.
    pub fn apply(&self, mut session: SessionConfig) -> SessionConfig {
        if let Some(key_path) = &self.key_path {
            session = session.key_path(key_path);
        }
        session.trust_on_first_use(self.trust_first_connection)
    }
}
