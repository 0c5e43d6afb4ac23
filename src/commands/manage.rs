// ABOUTME: Stop, list, and remove command implementations.
// ABOUTME: One-shot remote commands against the project layout under ~/.hmd.

use super::{Target, connect, disconnect, emit_warnings, load_global_config, run_remote};
use hmd::config::{SshAddress, resolve_ssh_address};
use hmd::diagnostics::Diagnostics;
use hmd::error::Result;
use hmd::output::Output;
use hmd::remote::{kill_and_wait_cmd, list_cmd, remove_cmd};
use hmd::types::ProjectName;

/// Interrupt the running pipeline and wait until its stages exit.
pub async fn stop(
    ssh: Option<SshAddress>,
    project: Option<ProjectName>,
    output: Output,
) -> Result<()> {
    let target = Target::resolve(ssh, project)?;
    let mut diag = Diagnostics::default();

    let session = connect(&target.address, target.global.as_ref(), &output).await?;
    output.progress("  → Stopping pipeline...");
    let result = run_remote(&session, &kill_and_wait_cmd(&target.paths)).await;
    disconnect(session, &target.address, &mut diag).await;
    result?;

    emit_warnings(&diag, &output);
    output.success("Pipeline stopped");
    Ok(())
}

/// Print the projects deployed on the server.
pub async fn list(ssh: Option<SshAddress>, output: Output) -> Result<()> {
    let global = load_global_config();
    let project_config = super::load_project_config();
    let address = resolve_ssh_address(ssh, project_config.as_ref(), global.as_ref())?;
    let mut diag = Diagnostics::default();

    let session = connect(&address, global.as_ref(), &output).await?;
    let result = run_remote(&session, &list_cmd()).await;
    disconnect(session, &address, &mut diag).await;
    let listing = result?;

    emit_warnings(&diag, &output);
    for project in listing.stdout.lines().filter(|line| !line.is_empty()) {
        output.success(project);
    }
    Ok(())
}

/// Stop the pipeline and delete the project directory on the server.
pub async fn remove(ssh: Option<SshAddress>, project: ProjectName, output: Output) -> Result<()> {
    let target = Target::resolve(ssh, Some(project.clone()))?;
    let mut diag = Diagnostics::default();

    let session = connect(&target.address, target.global.as_ref(), &output).await?;
    output.progress(&format!("  → Removing {}...", target.paths.project_dir));
    let result = run_remote(&session, &remove_cmd(&target.paths)).await;
    disconnect(session, &target.address, &mut diag).await;
    result?;

    emit_warnings(&diag, &output);
    output.success(&format!("Removed {project}"));
    Ok(())
}
