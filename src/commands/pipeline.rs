// ABOUTME: Hidden pipeline command, run on the server by deploy and restart.
// ABOUTME: Executes the uploaded stages in the current directory and tracks their status.

use hmd::config::Stages;
use hmd::error::{Error, Result};
use hmd::pipeline::{Outcome, Pipeline};
use std::env;
use std::path::Path;

pub async fn pipeline(file: &Path) -> Result<()> {
    let cwd = env::current_dir()?;
    let stages = Stages::load(&cwd.join(file))?;
    tracing::info!(
        "Running {} stage(s) from {}",
        stages.len(),
        file.display()
    );

    match Pipeline::new(stages, &cwd).run().await? {
        Outcome::Completed => Ok(()),
        Outcome::Aborted(aborted) => Err(Error::StageFailed {
            index: aborted.index,
            stage: aborted.stage,
        }),
    }
}
