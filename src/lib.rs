// ABOUTME: Library root for hmd - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod git;
pub mod output;
pub mod pipeline;
pub mod remote;
pub mod ssh;
pub mod status;
pub mod types;
