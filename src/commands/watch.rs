// ABOUTME: Status and log command implementations.
// ABOUTME: Stream status.log and out.log from the server until the command ends or Ctrl-C.

use super::{Target, connect, disconnect, emit_warnings};
use hmd::config::SshAddress;
use hmd::diagnostics::Diagnostics;
use hmd::error::{Error, Result};
use hmd::output::Output;
use hmd::remote::{log_cmd, status_cmd};
use hmd::types::ProjectName;

/// Print the stage status record.
pub async fn status(
    ssh: Option<SshAddress>,
    project: Option<ProjectName>,
    follow: bool,
    output: Output,
) -> Result<()> {
    let target = Target::resolve(ssh, project)?;
    stream(&target, &status_cmd(&target.paths, follow), &output).await
}

/// Follow the pipeline output.
pub async fn log(
    ssh: Option<SshAddress>,
    project: Option<ProjectName>,
    lines: usize,
    output: Output,
) -> Result<()> {
    let target = Target::resolve(ssh, project)?;
    stream(&target, &log_cmd(&target.paths, lines), &output).await
}

async fn stream(target: &Target, command: &str, output: &Output) -> Result<()> {
    let mut diag = Diagnostics::default();
    let session = connect(&target.address, target.global.as_ref(), output).await?;

    let result = tokio::select! {
        exit_code = session.exec_streaming(command) => match exit_code {
            Ok(0) => Ok(()),
            Ok(exit_code) => Err(Error::RemoteCommandFailed {
                exit_code,
                stderr: "see output above".to_string(),
            }),
            Err(e) => Err(e.into()),
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::debug!("Interrupted, closing session");
            Ok(())
        }
    };

    disconnect(session, &target.address, &mut diag).await;
    emit_warnings(&diag, output);
    result
}
