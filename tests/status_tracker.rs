// ABOUTME: Integration tests for the stage status tracker.
// ABOUTME: Checks status.log contents for run, complete, and panic events.

use chrono::NaiveDateTime;
use hmd::config::Stages;
use hmd::status::{
    StageEvent, StageList, StageState, StatusError, StatusRecord, StatusTracker, TIMESTAMP_FORMAT,
};
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

fn pipeline_stages() -> StageList {
    StageList::new(["push", "build", "restart"])
}

/// Stage lines and timestamp line of the written status file.
fn read_status(tracker: &StatusTracker) -> (Vec<String>, String) {
    let content = fs::read_to_string(tracker.path()).unwrap();
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    let timestamp = lines.pop().unwrap();
    (lines, timestamp)
}

fn assert_timestamp(line: &str) {
    assert!(
        NaiveDateTime::parse_from_str(line, TIMESTAMP_FORMAT).is_ok(),
        "not a timestamp: {line:?}"
    );
}

mod scenarios {
    use super::*;

    #[test]
    fn run_marks_earlier_done_and_later_pending() {
        let dir = TempDir::new().unwrap();
        let tracker = StatusTracker::in_dir(dir.path());

        tracker.run(1, &pipeline_stages()).unwrap();

        let (lines, timestamp) = read_status(&tracker);
        assert_eq!(lines, ["✅ push", "🟩 build", "🟨 restart"]);
        assert_timestamp(&timestamp);
    }

    #[test]
    fn complete_at_last_stage_marks_everything_done() {
        let dir = TempDir::new().unwrap();
        let tracker = StatusTracker::in_dir(dir.path());

        tracker.complete(2, &pipeline_stages()).unwrap();

        let (lines, timestamp) = read_status(&tracker);
        assert_eq!(lines, ["✅ push", "✅ build", "✅ restart"]);
        assert_timestamp(&timestamp);
    }

    #[test]
    fn panic_marks_failed_and_blocked() {
        let dir = TempDir::new().unwrap();
        let tracker = StatusTracker::in_dir(dir.path());

        let aborted = tracker.panic(1, &pipeline_stages()).unwrap();

        let (lines, timestamp) = read_status(&tracker);
        assert_eq!(lines, ["✅ push", "❌ build", "🟥 restart"]);
        assert_timestamp(&timestamp);
        assert_eq!(aborted.stage, "build");
    }

    #[test]
    fn single_stage_run() {
        let dir = TempDir::new().unwrap();
        let tracker = StatusTracker::in_dir(dir.path());

        tracker.run(0, &StageList::new(["only"])).unwrap();

        let (lines, timestamp) = read_status(&tracker);
        assert_eq!(lines, ["🟩 only"]);
        assert_timestamp(&timestamp);
    }
}

mod persistence {
    use super::*;

    #[test]
    fn each_event_replaces_previous_record() {
        let dir = TempDir::new().unwrap();
        let tracker = StatusTracker::in_dir(dir.path());
        let stages = pipeline_stages();

        tracker.run(0, &stages).unwrap();
        tracker.complete(0, &stages).unwrap();
        tracker.run(1, &stages).unwrap();

        let content = fs::read_to_string(tracker.path()).unwrap();
        assert_eq!(content.lines().count(), 4);
        assert!(content.starts_with("✅ push\n🟩 build\n🟨 restart\n"));
    }

    #[test]
    fn repeated_event_is_identical_apart_from_timestamp() {
        let dir = TempDir::new().unwrap();
        let tracker = StatusTracker::in_dir(dir.path());
        let stages = pipeline_stages();

        tracker.run(2, &stages).unwrap();
        let (first, _) = read_status(&tracker);
        tracker.run(2, &stages).unwrap();
        let (second, _) = read_status(&tracker);

        assert_eq!(first, second);
    }

    #[test]
    fn record_ends_with_single_newline() {
        let dir = TempDir::new().unwrap();
        let tracker = StatusTracker::in_dir(dir.path());

        tracker.complete(0, &StageList::new(["build"])).unwrap();

        let content = fs::read_to_string(tracker.path()).unwrap();
        assert!(content.ends_with('\n'));
        assert!(!content.ends_with("\n\n"));
    }

    #[test]
    fn returned_record_matches_file() {
        let dir = TempDir::new().unwrap();
        let tracker = StatusTracker::in_dir(dir.path());

        let record = tracker.run(1, &pipeline_stages()).unwrap();

        assert_eq!(
            fs::read_to_string(tracker.path()).unwrap(),
            record.to_string()
        );
    }

    #[test]
    fn out_of_range_keeps_previous_record() {
        let dir = TempDir::new().unwrap();
        let tracker = StatusTracker::in_dir(dir.path());
        let stages = pipeline_stages();

        tracker.run(0, &stages).unwrap();
        let before = fs::read_to_string(tracker.path()).unwrap();

        let err = tracker.panic(3, &stages).unwrap_err();
        assert!(matches!(
            err,
            StatusError::IndexOutOfRange { index: 3, len: 3 }
        ));
        assert_eq!(fs::read_to_string(tracker.path()).unwrap(), before);
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let tracker = StatusTracker::in_dir(dir.path());

        tracker.run(0, &pipeline_stages()).unwrap();
        tracker.complete(2, &pipeline_stages()).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}

mod stage_names {
    use super::*;

    #[test]
    fn multiline_stage_name_never_reaches_status_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(Stages::FILENAME),
            "\"push\\nsecret\": echo hi\nbuild: make\n",
        )
        .unwrap();

        let loaded = Stages::load(&dir.path().join(Stages::FILENAME));

        assert!(loaded.is_err());
        assert!(!dir.path().join(StatusTracker::FILENAME).exists());
    }

    #[test]
    fn accepted_stages_write_one_line_per_stage() {
        let dir = TempDir::new().unwrap();
        let tracker = StatusTracker::in_dir(dir.path());
        let stages = Stages::from_yaml("\"push: now\": git push\n\"build all\": make\n").unwrap();

        tracker.run(0, &stages.names()).unwrap();

        let content = fs::read_to_string(tracker.path()).unwrap();
        assert_eq!(content.matches('\n').count(), stages.len() + 1);
        assert!(content.starts_with("🟩 push: now\n🟨 build all\n"));
    }
}

fn stage_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,8}", 1..12)
}

fn names_and_index() -> impl Strategy<Value = (Vec<String>, usize)> {
    stage_names().prop_flat_map(|names| {
        let len = names.len();
        (Just(names), 0..len)
    })
}

fn states(record: &StatusRecord) -> Vec<StageState> {
    record.stages().iter().map(|(state, _)| *state).collect()
}

fn noon() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2024-01-01T12:00:00", TIMESTAMP_FORMAT).unwrap()
}

proptest! {
    #[test]
    fn run_renders_done_running_pending((names, index) in names_and_index()) {
        let stages = StageList::new(names.clone());
        let record = StatusRecord::render(StageEvent::Run, index, &stages, noon()).unwrap();

        prop_assert_eq!(record.lines().len(), names.len() + 1);
        for (stage, state) in states(&record).into_iter().enumerate() {
            let expected = match stage {
                s if s < index => StageState::Done,
                s if s == index => StageState::Running,
                _ => StageState::Pending,
            };
            prop_assert_eq!(state, expected);
        }
    }

    #[test]
    fn complete_never_shows_running_or_failure((names, index) in names_and_index()) {
        let stages = StageList::new(names.clone());
        let record = StatusRecord::render(StageEvent::Complete, index, &stages, noon()).unwrap();

        prop_assert_eq!(record.lines().len(), names.len() + 1);
        for (stage, state) in states(&record).into_iter().enumerate() {
            let expected = if stage <= index { StageState::Done } else { StageState::Pending };
            prop_assert_eq!(state, expected);
        }
    }

    #[test]
    fn panic_renders_done_failed_blocked((names, index) in names_and_index()) {
        let stages = StageList::new(names.clone());
        let record = StatusRecord::render(StageEvent::Panic, index, &stages, noon()).unwrap();

        prop_assert_eq!(record.lines().len(), names.len() + 1);
        for (stage, state) in states(&record).into_iter().enumerate() {
            let expected = match stage {
                s if s < index => StageState::Done,
                s if s == index => StageState::Failed,
                _ => StageState::Blocked,
            };
            prop_assert_eq!(state, expected);
        }
    }

    #[test]
    fn stage_lines_keep_names_in_order(names in stage_names()) {
        let stages = StageList::new(names.clone());
        let record = StatusRecord::render(StageEvent::Run, 0, &stages, noon()).unwrap();

        let rendered: Vec<String> = record.stages().iter().map(|(_, name)| name.clone()).collect();
        prop_assert_eq!(rendered, names);
    }

    #[test]
    fn valid_stage_names_keep_one_line_per_stage(
        names in prop::collection::vec("[a-z\r\n ]{1,6}", 1..8)
    ) {
        let stages = Stages::new(names.iter().map(|name| (name.clone(), "true".to_string())));
        let has_break = names.iter().any(|name| name.contains(['\n', '\r']));

        match stages.validate() {
            Err(_) => prop_assert!(has_break),
            Ok(()) => {
                prop_assert!(!has_break);
                let record =
                    StatusRecord::render(StageEvent::Run, 0, &stages.names(), noon()).unwrap();
                let rendered = record.to_string();
                prop_assert_eq!(rendered.matches('\n').count(), stages.len() + 1);
                prop_assert!(!rendered.contains('\r'));
            }
        }
    }

    #[test]
    fn index_at_or_past_len_is_rejected(names in stage_names(), extra in 0usize..5) {
        let stages = StageList::new(names.clone());
        let index = names.len() + extra;
        for event in [StageEvent::Run, StageEvent::Complete, StageEvent::Panic] {
            let out_of_range = matches!(
                StatusRecord::render(event, index, &stages, noon()),
                Err(StatusError::IndexOutOfRange { .. })
            );
            prop_assert!(out_of_range);
        }
    }
}
