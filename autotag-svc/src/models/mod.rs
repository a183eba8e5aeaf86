//! Data models

pub mod job;
pub mod outcome;

pub use job::{JobState, ProcessingJob, StatusSnapshot};
pub use outcome::ProcessingOutcome;
