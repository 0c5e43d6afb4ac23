// ABOUTME: Validated domain types shared by config and commands.
// ABOUTME: Project names double as remote directory names, so they are checked on parse.

mod project_name;

pub use project_name::{ProjectName, ProjectNameError};
