// ABOUTME: Stage status tracker for deploy pipelines.
// ABOUTME: Renders every stage's state into status.log on each lifecycle event.

mod error;
mod record;
mod tracker;

pub use error::{StatusError, StatusResult};
pub use record::{StageEvent, StageList, StageState, StatusRecord, TIMESTAMP_FORMAT};
pub use tracker::{Aborted, StatusTracker};
