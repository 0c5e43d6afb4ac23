// ABOUTME: Command module aggregator for the hmd CLI.
// ABOUTME: Shared target resolution and SSH session helpers for all commands.

mod deploy;
mod init;
mod manage;
mod pipeline;
mod watch;

pub use deploy::{deploy, restart};
pub use init::init;
pub use manage::{list, remove, stop};
pub use pipeline::pipeline;
pub use watch::{log, status};

use hmd::config::{
    GlobalConfig, ProjectConfig, SshAddress, resolve_project, resolve_ssh_address,
};
use hmd::diagnostics::{Diagnostics, Warning};
use hmd::error::{Error, Result};
use hmd::output::Output;
use hmd::remote::ProjectPaths;
use hmd::ssh::{CommandOutput, Session};
use hmd::types::ProjectName;
use std::env;

/// Server and project a command operates on.
pub(crate) struct Target {
    pub address: SshAddress,
    pub paths: ProjectPaths,
    pub remote_bin: String,
    pub global: Option<GlobalConfig>,
}

impl Target {
    /// Resolve from flags, falling back to hmd.yml in the current directory and the global config.
    pub fn resolve(ssh: Option<SshAddress>, project: Option<ProjectName>) -> Result<Self> {
        let project_config = load_project_config();
        let global = load_global_config();

        let address = resolve_ssh_address(ssh, project_config.as_ref(), global.as_ref())?;
        let project = resolve_project(project, project_config.as_ref())?;
        let remote_bin = project_config
            .map(|config| config.remote_bin)
            .unwrap_or_else(|| "hmd".to_string());

        Ok(Self {
            address,
            paths: ProjectPaths::new(&project),
            remote_bin,
            global,
        })
    }
}

/// hmd.yml of the current directory, if present and valid.
pub(crate) fn load_project_config() -> Option<ProjectConfig> {
    let cwd = env::current_dir().ok()?;
    match ProjectConfig::discover(&cwd) {
        Ok(config) => Some(config),
        Err(Error::ConfigNotFound(_)) => None,
        Err(e) => {
            tracing::warn!("Ignoring hmd.yml: {}", e);
            None
        }
    }
}

/// ~/.hmd/config.yml, if present and valid.
pub(crate) fn load_global_config() -> Option<GlobalConfig> {
    GlobalConfig::load_default().unwrap_or_else(|e| {
        tracing::warn!("Ignoring global config: {}", e);
        None
    })
}

/// Connect to `address` using the SSH options of the global config.
pub(crate) async fn connect(
    address: &SshAddress,
    global: Option<&GlobalConfig>,
    output: &Output,
) -> Result<Session> {
    output.progress(&format!("  → Connecting to {}...", address));
    let session_config = address.session_config();
    let session_config = match global {
        Some(global) => global.apply(session_config),
        None => session_config,
    };
    Ok(Session::connect(session_config).await?)
}

/// Run `command` remotely, failing on a non-zero exit code.
pub(crate) async fn run_remote(session: &Session, command: &str) -> Result<CommandOutput> {
    let output = session.exec(command).await?;
    if !output.success() {
        return Err(Error::RemoteCommandFailed {
            exit_code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output)
}

/// Disconnect, recording a failure as a warning.
pub(crate) async fn disconnect(session: Session, address: &SshAddress, diag: &mut Diagnostics) {
    if let Err(e) = session.disconnect().await {
        diag.warn(Warning::ssh_disconnect(format!(
            "SSH disconnect failed for {}: {}",
            address, e
        )));
    }
}

/// Print collected warnings.
pub(crate) fn emit_warnings(diag: &Diagnostics, output: &Output) {
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }
}
