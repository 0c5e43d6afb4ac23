// ABOUTME: Server-side pipeline driver that runs stages in order.
// ABOUTME: Reports every stage transition to the status tracker and stops at the first failure.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tokio::process::Command;

use crate::config::Stages;
use crate::error::Result;
use crate::status::{Aborted, StageList, StatusTracker, TIMESTAMP_FORMAT};

/// How a pipeline run ended.
#[derive(Debug)]
pub enum Outcome {
    /// Every stage succeeded.
    Completed,
    /// A stage failed; later stages were not run.
    Aborted(Aborted),
}

/// Runs stage commands in a working directory.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Stages,
    names: StageList,
    dir: PathBuf,
    tracker: StatusTracker,
    shell: String,
}

impl Pipeline {
    /// Pipeline running in `dir`, writing `status.log` there.
    pub fn new(stages: Stages, dir: &Path) -> Self {
        Self {
            names: stages.names(),
            stages,
            dir: dir.to_path_buf(),
            tracker: StatusTracker::in_dir(dir),
            shell: "bash".to_string(),
        }
    }

    /// Shell used as `<shell> -c <command>` for each stage.
    pub fn shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Run every stage in order.
    ///
    /// Tracker write failures are returned as errors; a failing stage is
    /// recorded and returned as [`Outcome::Aborted`].
    pub async fn run(&self) -> Result<Outcome> {
        for (index, (name, command)) in self.stages.iter().enumerate() {
            println!("\n🟩 [{}] > Start {name}\n{command}\n", now());
            self.tracker.run(index, &self.names)?;

            match self.run_stage(command).await {
                Ok(status) if status.success() => {
                    self.tracker.complete(index, &self.names)?;
                    println!("\n🟩 [{}] > End {name}\n", now());
                }
                result => {
                    match result {
                        Ok(status) => tracing::warn!("Stage {} exited with {}", name, status),
                        Err(e) => tracing::warn!("Stage {} could not be started: {}", name, e),
                    }
                    println!("\n❌ [{}] > Failed {name}\n", now());
                    let aborted = self.tracker.panic(index, &self.names)?;
                    return Ok(Outcome::Aborted(aborted));
                }
            }
        }

        Ok(Outcome::Completed)
    }

    async fn run_stage(&self, command: &str) -> std::io::Result<ExitStatus> {
        Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .current_dir(&self.dir)
            .status()
            .await
    }
}

fn now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}
