// ABOUTME: Deploy and restart command implementations.
// ABOUTME: Pushes code, uploads artifacts and stages, and starts the pipeline on the server.

use super::{Target, connect, disconnect, emit_warnings, load_global_config, run_remote};
use hmd::config::{ProjectConfig, SshAddress, Stages};
use hmd::diagnostics::{Diagnostics, Warning};
use hmd::error::{Error, Result};
use hmd::git::Git;
use hmd::output::Output;
use hmd::remote::{ProjectPaths, start_pipeline_cmd};
use hmd::ssh::Session;
use hmd::types::ProjectName;
use std::env;
use std::path::Path;

/// Push the current branch and run its pipeline on the server.
pub async fn deploy(dirty: bool, mut output: Output) -> Result<()> {
    output.start_timer();
    let cwd = env::current_dir()?;
    let config = ProjectConfig::discover(&cwd)?;
    let global = load_global_config();
    let paths = ProjectPaths::new(&config.project);
    let git = Git::new(&cwd);

    let branch = git.current_branch().await?;
    if branch.is_empty() {
        return Err(Error::DetachedHead);
    }

    output.progress(&format!(
        "Deploying {} ({}) to {}",
        config.project, branch, config.ssh_address
    ));

    let remote = config.ssh_address.git_url(&paths.git_dir);
    if dirty {
        output.progress("  → Pushing HEAD with uncommitted changes...");
        git.push_dirty(&remote).await?;
    } else {
        output.progress("  → Pushing HEAD...");
        git.push(&remote).await?;
    }

    let mut diag = Diagnostics::default();
    let session = connect(&config.ssh_address, global.as_ref(), &output).await?;
    let result = start_on_server(&session, &config, &paths, &branch, &output, &mut diag).await;
    disconnect(session, &config.ssh_address, &mut diag).await;
    result?;

    emit_warnings(&diag, &output);
    output.success(&format!(
        "Pipeline of {} started, follow it with `hmd status --follow`",
        config.project
    ));
    Ok(())
}

async fn start_on_server(
    session: &Session,
    config: &ProjectConfig,
    paths: &ProjectPaths,
    branch: &str,
    output: &Output,
    diag: &mut Diagnostics,
) -> Result<()> {
    upload_artifacts(session, &config.artifacts, paths, output, diag).await?;

    output.progress(&format!("  → Uploading {} stage(s)...", config.stages.len()));
    session
        .upload(
            &paths.work_tree_file(Stages::FILENAME),
            config.stages.to_yaml()?.as_bytes(),
        )
        .await?;

    output.progress("  → Starting pipeline...");
    run_remote(
        session,
        &start_pipeline_cmd(paths, &config.remote_bin, Some(branch)),
    )
    .await?;
    Ok(())
}

/// Copy local artifacts into the work tree, by file name.
async fn upload_artifacts(
    session: &Session,
    artifacts: &[impl AsRef<Path>],
    paths: &ProjectPaths,
    output: &Output,
    diag: &mut Diagnostics,
) -> Result<()> {
    for artifact in artifacts {
        let artifact = artifact.as_ref();
        let Some(name) = artifact.file_name().and_then(|n| n.to_str()) else {
            diag.warn(Warning::missing_artifact(format!(
                "artifact {} has no file name, skipped",
                artifact.display()
            )));
            continue;
        };

        let contents = match tokio::fs::read(artifact).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                diag.warn(Warning::missing_artifact(format!(
                    "artifact {} not found, skipped",
                    artifact.display()
                )));
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        output.progress(&format!("  → Uploading {}...", artifact.display()));
        session
            .upload(&paths.work_tree_file(name), &contents)
            .await?;
    }
    Ok(())
}

/// Start the last deployed pipeline again without pushing.
pub async fn restart(
    ssh: Option<SshAddress>,
    project: Option<ProjectName>,
    output: Output,
) -> Result<()> {
    let target = Target::resolve(ssh, project)?;
    let mut diag = Diagnostics::default();

    let session = connect(&target.address, target.global.as_ref(), &output).await?;
    output.progress("  → Restarting pipeline...");
    let result = run_remote(
        &session,
        &start_pipeline_cmd(&target.paths, &target.remote_bin, None),
    )
    .await;
    disconnect(session, &target.address, &mut diag).await;
    result?;

    emit_warnings(&diag, &output);
    output.success("Pipeline restarted");
    Ok(())
}
