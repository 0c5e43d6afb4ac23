// ABOUTME: Pure rendering of pipeline progress into a status record.
// ABOUTME: Glyph assignment depends only on stage count, current index, and event.

use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::fmt;

use super::error::{StatusError, StatusResult};

/// Timestamp format of the trailing status line, local time with second precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Status of a single stage within one rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// Stage completed successfully.
    Done,
    /// Stage currently executing.
    Running,
    /// Stage not reached yet.
    Pending,
    /// Stage where the pipeline failed.
    Failed,
    /// Stage after a failure; it will not run.
    Blocked,
}

impl StageState {
    /// Glyph written in front of the stage name.
    pub fn glyph(&self) -> &'static str {
        match self {
            StageState::Done => "✅",
            StageState::Running => "🟩",
            StageState::Pending => "🟨",
            StageState::Failed => "❌",
            StageState::Blocked => "🟥",
        }
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

/// Pipeline lifecycle event reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    /// The stage at the current index started.
    Run,
    /// Every stage up to and including the current index succeeded.
    Complete,
    /// The stage at the current index failed.
    Panic,
}

impl StageEvent {
    /// State of `stage` when this event fires at `current`.
    pub fn state_of(self, stage: usize, current: usize) -> StageState {
        match (self, stage.cmp(&current)) {
            (_, Ordering::Less) => StageState::Done,
            (StageEvent::Run, Ordering::Equal) => StageState::Running,
            (StageEvent::Complete, Ordering::Equal) => StageState::Done,
            (StageEvent::Panic, Ordering::Equal) => StageState::Failed,
            (StageEvent::Run | StageEvent::Complete, Ordering::Greater) => StageState::Pending,
            (StageEvent::Panic, Ordering::Greater) => StageState::Blocked,
        }
    }
}

impl fmt::Display for StageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageEvent::Run => write!(f, "run"),
            StageEvent::Complete => write!(f, "complete"),
            StageEvent::Panic => write!(f, "panic"),
        }
    }
}

/// Ordered stage names of one deploy run. Indices identify stages, names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageList(Vec<String>);

impl StageList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    fn check_index(&self, index: usize) -> StatusResult<()> {
        if index < self.len() {
            Ok(())
        } else {
            Err(StatusError::IndexOutOfRange {
                index,
                len: self.len(),
            })
        }
    }
}

/// One full rendering of the pipeline: a line per stage plus a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    stages: Vec<(StageState, String)>,
    timestamp: NaiveDateTime,
}

impl StatusRecord {
    /// Render every stage for `event` fired at `index`.
    ///
    /// Fails with [`StatusError::IndexOutOfRange`] unless `index < stages.len()`.
    pub fn render(
        event: StageEvent,
        index: usize,
        stages: &StageList,
        timestamp: NaiveDateTime,
    ) -> StatusResult<Self> {
        stages.check_index(index)?;

        let stages = stages
            .iter()
            .enumerate()
            .map(|(stage, name)| (event.state_of(stage, index), name.to_string()))
            .collect();

        Ok(Self { stages, timestamp })
    }

    /// Rendered stages in pipeline order.
    pub fn stages(&self) -> &[(StageState, String)] {
        &self.stages
    }

    /// Record lines without line terminators, timestamp last.
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .stages()
            .iter()
            .map(|(state, name)| format!("{state} {name}"))
            .collect();
        lines.push(self.timestamp.format(TIMESTAMP_FORMAT).to_string());
        lines
    }
}

impl fmt::Display for StatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at_noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(12, 0, 5)
            .unwrap()
    }

    fn states(record: &StatusRecord) -> Vec<StageState> {
        record.stages().iter().map(|(state, _)| *state).collect()
    }

    fn stages() -> StageList {
        StageList::new(["push", "build", "restart"])
    }

    #[test]
    fn glyphs_match_status_file_alphabet() {
        assert_eq!(StageState::Done.glyph(), "✅");
        assert_eq!(StageState::Running.glyph(), "🟩");
        assert_eq!(StageState::Pending.glyph(), "🟨");
        assert_eq!(StageState::Failed.glyph(), "❌");
        assert_eq!(StageState::Blocked.glyph(), "🟥");
    }

    #[test]
    fn run_marks_current_stage_running() {
        let record = StatusRecord::render(StageEvent::Run, 1, &stages(), at_noon()).unwrap();
        assert_eq!(
            record.to_string(),
            "✅ push\n🟩 build\n🟨 restart\n2024-03-09T12:00:05\n"
        );
    }

    #[test]
    fn complete_has_no_running_stage() {
        let record = StatusRecord::render(StageEvent::Complete, 1, &stages(), at_noon()).unwrap();
        assert_eq!(
            states(&record),
            vec![StageState::Done, StageState::Done, StageState::Pending]
        );
    }

    #[test]
    fn panic_blocks_later_stages() {
        let record = StatusRecord::render(StageEvent::Panic, 0, &stages(), at_noon()).unwrap();
        assert_eq!(
            states(&record),
            vec![StageState::Failed, StageState::Blocked, StageState::Blocked]
        );
    }

    #[test]
    fn index_past_last_stage_is_rejected() {
        let err = StatusRecord::render(StageEvent::Run, 3, &stages(), at_noon()).unwrap_err();
        assert!(matches!(
            err,
            StatusError::IndexOutOfRange { index: 3, len: 3 }
        ));
    }

    #[test]
    fn empty_stage_list_is_rejected() {
        let err = StatusRecord::render(StageEvent::Complete, 0, &StageList::default(), at_noon())
            .unwrap_err();
        assert!(matches!(
            err,
            StatusError::IndexOutOfRange { index: 0, len: 0 }
        ));
    }

    #[test]
    fn duplicate_names_are_rendered_by_index() {
        let stages = StageList::new(["step", "step"]);
        let record = StatusRecord::render(StageEvent::Run, 1, &stages, at_noon()).unwrap();
        assert_eq!(record.lines()[..2], ["✅ step", "🟩 step"]);
    }
}
