// ABOUTME: Integration tests for the server-side pipeline driver.
// ABOUTME: Runs real shell stages in a temp dir and checks status.log and stop-on-failure.

use hmd::config::Stages;
use hmd::pipeline::{Outcome, Pipeline};
use std::fs;
use tempfile::TempDir;

fn status_lines(dir: &TempDir) -> Vec<String> {
    let content = fs::read_to_string(dir.path().join("status.log")).unwrap();
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    lines.pop();
    lines
}

/// Test: all stages succeed and every stage ends up done.
#[tokio::test]
async fn successful_pipeline_marks_all_done() {
    let dir = TempDir::new().unwrap();
    let stages = Stages::new([
        ("lint", "true"),
        ("build", "echo built > artifact.txt"),
        ("run", "test -f artifact.txt"),
    ]);

    let outcome = Pipeline::new(stages, dir.path()).shell("sh").run().await.unwrap();

    assert!(matches!(outcome, Outcome::Completed));
    assert_eq!(status_lines(&dir), ["✅ lint", "✅ build", "✅ run"]);
}

/// Test: a failing stage stops the pipeline and blocks later stages.
#[tokio::test]
async fn failing_stage_aborts_pipeline() {
    let dir = TempDir::new().unwrap();
    let stages = Stages::new([
        ("push", "true"),
        ("build", "exit 3"),
        ("restart", "touch restarted"),
    ]);

    let outcome = Pipeline::new(stages, dir.path()).shell("sh").run().await.unwrap();

    let Outcome::Aborted(aborted) = outcome else {
        panic!("pipeline should abort");
    };
    assert_eq!(aborted.index, 1);
    assert_eq!(aborted.stage, "build");
    assert_eq!(status_lines(&dir), ["✅ push", "❌ build", "🟥 restart"]);
    assert!(!dir.path().join("restarted").exists());
}

/// Test: the first stage failing blocks every other stage.
#[tokio::test]
async fn first_stage_failure_blocks_rest() {
    let dir = TempDir::new().unwrap();
    let stages = Stages::new([("lint", "false"), ("test", "true")]);

    let outcome = Pipeline::new(stages, dir.path()).shell("sh").run().await.unwrap();

    assert!(matches!(outcome, Outcome::Aborted(_)));
    assert_eq!(status_lines(&dir), ["❌ lint", "🟥 test"]);
}

/// Test: a shell that cannot be spawned counts as a failed stage.
#[tokio::test]
async fn missing_shell_fails_stage() {
    let dir = TempDir::new().unwrap();
    let stages = Stages::new([("build", "true")]);

    let outcome = Pipeline::new(stages, dir.path())
        .shell("/nonexistent/shell")
        .run()
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Aborted(_)));
    assert_eq!(status_lines(&dir), ["❌ build"]);
}

/// Test: stages run inside the pipeline directory.
#[tokio::test]
async fn stages_run_in_pipeline_dir() {
    let dir = TempDir::new().unwrap();
    let stages = Stages::new([("where", "pwd > where.txt")]);

    Pipeline::new(stages, dir.path()).shell("sh").run().await.unwrap();

    let recorded = fs::read_to_string(dir.path().join("where.txt")).unwrap();
    assert_eq!(
        fs::canonicalize(recorded.trim()).unwrap(),
        fs::canonicalize(dir.path()).unwrap()
    );
}

/// Test: a stage sees the status of itself as running while it executes.
#[tokio::test]
async fn running_stage_is_visible_to_itself() {
    let dir = TempDir::new().unwrap();
    let stages = Stages::new([
        ("first", "true"),
        ("second", "head -n 2 status.log > seen.txt"),
        ("third", "true"),
    ]);

    Pipeline::new(stages, dir.path()).shell("sh").run().await.unwrap();

    let seen = fs::read_to_string(dir.path().join("seen.txt")).unwrap();
    assert_eq!(seen, "✅ first\n🟩 second\n");
}
