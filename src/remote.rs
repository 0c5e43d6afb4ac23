// ABOUTME: Remote project layout under ~/.hmd and the shell commands run there.
// ABOUTME: Commands are plain strings so they can be checked without a server.

use crate::config::{HMD_ROOT, Stages};
use crate::status::StatusTracker;
use crate::types::ProjectName;

/// Combined stdout/stderr of the pipeline process.
pub const OUT_LOG: &str = "out.log";
/// PID of the detached pipeline process.
pub const PIPELINE_PID: &str = "pipeline.pid";

/// Paths of one project on the server, relative to the remote home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub project_dir: String,
    pub git_dir: String,
    pub work_tree: String,
}

impl ProjectPaths {
    pub fn new(project: &ProjectName) -> Self {
        let project_dir = format!("~/{HMD_ROOT}/{project}");
        Self {
            git_dir: format!("{project_dir}/git"),
            work_tree: format!("{project_dir}/work-tree"),
            project_dir,
        }
    }

    pub fn out_log(&self) -> String {
        format!("{}/{}", self.work_tree, OUT_LOG)
    }

    pub fn status_log(&self) -> String {
        format!("{}/{}", self.work_tree, StatusTracker::FILENAME)
    }

    pub fn pipeline_pid(&self) -> String {
        format!("{}/{}", self.work_tree, PIPELINE_PID)
    }

    /// Shell-ready path of `name` inside the work tree.
    pub fn work_tree_file(&self, name: &str) -> String {
        format!("{}/{}", self.work_tree, shell_quote(name))
    }
}

/// Quote `s` for a POSIX shell.
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '='))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Create the bare repository and the work tree.
pub fn init_repo_cmd(paths: &ProjectPaths) -> String {
    format!(
        "mkdir -p {git} {work_tree} && cd {git} && git init --bare",
        git = paths.git_dir,
        work_tree = paths.work_tree
    )
}

/// Interrupt the pipeline's children until none are left.
pub fn kill_and_wait_cmd(paths: &ProjectPaths) -> String {
    format!(
        "while pkill -SIGINT -P `cat {pid} 2>/dev/null` 2>/dev/null; do sleep 1; done",
        pid = paths.pipeline_pid()
    )
}

/// Stop the running pipeline, optionally check out `branch`, and start the pipeline detached.
///
/// Nothing after the `cd` runs when the work tree is missing.
pub fn start_pipeline_cmd(paths: &ProjectPaths, remote_bin: &str, branch: Option<&str>) -> String {
    let mut steps = vec![kill_and_wait_cmd(paths)];
    if let Some(branch) = branch {
        steps.push(format!(
            "git --git-dir=$HOME/{} --work-tree=. checkout --force {}",
            paths.git_dir.trim_start_matches("~/"),
            shell_quote(branch)
        ));
    }
    steps.push(format!(
        "nohup {remote_bin} pipeline --file {stages} > {out} 2>&1 < /dev/null & echo $! > {pid}",
        stages = Stages::FILENAME,
        out = OUT_LOG,
        pid = PIPELINE_PID
    ));
    format!(
        "[ -f ~/.profile ] && . ~/.profile; cd {} && {{ {}; }}",
        paths.work_tree,
        steps.join("; ")
    )
}

/// Print the status record, following updates when `follow` is set.
///
/// The record is replaced by rename on every write, so it is followed by name.
pub fn status_cmd(paths: &ProjectPaths, follow: bool) -> String {
    if follow {
        format!("tail -n +1 -F {}", paths.status_log())
    } else {
        format!("cat {}", paths.status_log())
    }
}

/// Follow the pipeline output starting `lines` lines back.
pub fn log_cmd(paths: &ProjectPaths, lines: usize) -> String {
    format!("tail -n {lines} -f {}", paths.out_log())
}

pub fn list_cmd() -> String {
    format!("ls ~/{HMD_ROOT}")
}

/// Stop the pipeline and delete everything of the project.
pub fn remove_cmd(paths: &ProjectPaths) -> String {
    format!(
        "{}; rm -rf {}",
        kill_and_wait_cmd(paths),
        paths.project_dir
    )
}
