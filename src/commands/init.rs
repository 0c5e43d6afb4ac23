// ABOUTME: Init command implementation.
// ABOUTME: Creates the bare repository on the server and writes hmd.yml and the global config.

use super::{connect, disconnect, emit_warnings, load_global_config, run_remote};
use hmd::config::{
    GlobalConfig, ProjectConfig, SshAddress, init_project_config, project_from_dir,
    resolve_ssh_address,
};
use hmd::diagnostics::Diagnostics;
use hmd::error::Result;
use hmd::output::Output;
use hmd::remote::{ProjectPaths, init_repo_cmd};
use hmd::types::ProjectName;
use std::env;

pub async fn init(
    ssh: Option<SshAddress>,
    project: Option<ProjectName>,
    output: Output,
) -> Result<()> {
    let cwd = env::current_dir()?;
    let existing = ProjectConfig::discover(&cwd).ok();
    let global = load_global_config();

    let project = match project.or_else(|| existing.as_ref().map(|c| c.project.clone())) {
        Some(project) => project,
        None => project_from_dir(&cwd)?,
    };
    let address = resolve_ssh_address(ssh, existing.as_ref(), global.as_ref())?;
    let paths = ProjectPaths::new(&project);

    let mut diag = Diagnostics::default();
    let session = connect(&address, global.as_ref(), &output).await?;

    output.progress(&format!("  → Creating repository {}...", paths.git_dir));
    let result = run_remote(&session, &init_repo_cmd(&paths)).await;
    disconnect(session, &address, &mut diag).await;
    let created = result?;
    tracing::debug!("{}", created.stdout.trim());

    init_project_config(&cwd, &project, &address)?;
    output.progress(&format!("  → Wrote {}", hmd::config::CONFIG_FILENAME));

    if global.is_none() {
        let path = GlobalConfig::default_path()?;
        if !path.exists() {
            GlobalConfig::new(address.clone()).save(&path)?;
            output.progress(&format!("  → Config created at {}", path.display()));
        }
    }

    emit_warnings(&diag, &output);
    output.success(&format!("Initialized {project} on {address}"));
    Ok(())
}
