// ABOUTME: Persists status records for run, complete, and panic events.
// ABOUTME: Each write replaces status.log atomically via a temp file and rename.

use chrono::Local;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::error::{StatusError, StatusResult};
use super::record::{StageEvent, StageList, StatusRecord};

/// Returned by [`StatusTracker::panic`] once the failure has been recorded.
///
/// The pipeline must not resume after this: the driver turns it into a
/// failed process exit.
#[must_use = "an aborted pipeline must terminate the deploy process"]
#[derive(Debug, Clone)]
pub struct Aborted {
    /// Index of the failed stage.
    pub index: usize,
    /// Name of the failed stage.
    pub stage: String,
    /// Record written for the failure.
    pub record: StatusRecord,
}

/// Writes the status record of a pipeline to a single file.
///
/// Not safe for concurrent deploys of the same project: the last writer wins.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    path: PathBuf,
}

impl StatusTracker {
    pub const FILENAME: &'static str = "status.log";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Tracker writing `status.log` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(Self::FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record that stage `index` started.
    pub fn run(&self, index: usize, stages: &StageList) -> StatusResult<StatusRecord> {
        self.record(StageEvent::Run, index, stages)
    }

    /// Record that every stage through `index` succeeded.
    pub fn complete(&self, index: usize, stages: &StageList) -> StatusResult<StatusRecord> {
        self.record(StageEvent::Complete, index, stages)
    }

    /// Record that stage `index` failed.
    pub fn panic(&self, index: usize, stages: &StageList) -> StatusResult<Aborted> {
        let record = self.record(StageEvent::Panic, index, stages)?;
        let stage = stages.get(index).unwrap_or_default().to_string();
        Ok(Aborted {
            index,
            stage,
            record,
        })
    }

    fn record(
        &self,
        event: StageEvent,
        index: usize,
        stages: &StageList,
    ) -> StatusResult<StatusRecord> {
        let record = StatusRecord::render(event, index, stages, Local::now().naive_local())?;
        self.persist(&record)?;
        tracing::debug!(
            "Recorded {} of stage {} in {}",
            event,
            index,
            self.path().display()
        );
        Ok(record)
    }

    fn persist(&self, record: &StatusRecord) -> StatusResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)
            .map_err(|e| StatusError::write_failure(&self.path, e))?;
        file.write_all(record.to_string().as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| StatusError::write_failure(&self.path, e))?;
        file.persist(&self.path)
            .map_err(|e| StatusError::write_failure(&self.path, e.error))?;
        Ok(())
    }
}
