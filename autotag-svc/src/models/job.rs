//! Batch job state machine
//!
//! A job progresses `Running → (Completed | Stopped)`. The job manager is
//! the only writer of a `ProcessingJob`; every other component reads
//! `StatusSnapshot` copies, never the live object.

use crate::models::ProcessingOutcome;
use autotag_common::human_time::format_duration;
use autotag_common::{SaveMode, TagMode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// Maximum error entries retained per job for status reporting
const MAX_REPORTED_ERRORS: usize = 20;

/// Batch job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    /// File loop in progress
    Running,
    /// File sequence exhausted
    Completed,
    /// Explicitly stopped before the sequence was exhausted
    Stopped,
}

/// One recorded per-file failure
#[derive(Debug, Clone, Serialize)]
pub struct FileError {
    pub file: String,
    pub message: String,
}

/// One folder-level batch run
#[derive(Debug, Clone)]
pub struct ProcessingJob {
    pub job_id: Uuid,
    pub root_path: PathBuf,
    pub recursive: bool,
    pub tag_mode: TagMode,
    pub save_mode: SaveMode,
    /// Discovered files in enumeration order
    pub files: Vec<PathBuf>,
    /// File currently being processed (empty between files / when done)
    pub current_file: String,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Per-file elapsed seconds, for ETA and stats
    pub file_times: Vec<(String, f64)>,
    /// Recent per-file failures (bounded)
    pub errors: Vec<FileError>,
    pub state: JobState,
}

impl ProcessingJob {
    pub fn new(
        root_path: PathBuf,
        recursive: bool,
        tag_mode: TagMode,
        save_mode: SaveMode,
        files: Vec<PathBuf>,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            root_path,
            recursive,
            tag_mode,
            save_mode,
            files,
            current_file: String::new(),
            processed: 0,
            successful: 0,
            failed: 0,
            started_at: Utc::now(),
            ended_at: None,
            file_times: Vec::new(),
            errors: Vec::new(),
            state: JobState::Running,
        }
    }

    /// Commit one file's outcome into the counters.
    ///
    /// Called under the manager's write guard, so readers always observe
    /// `processed`/`successful`/`failed` from the same commit.
    pub fn commit_outcome(&mut self, outcome: &ProcessingOutcome) {
        self.processed += 1;
        if outcome.success {
            self.successful += 1;
        } else {
            self.failed += 1;
            if self.errors.len() < MAX_REPORTED_ERRORS {
                self.errors.push(FileError {
                    file: file_name(&outcome.path),
                    message: outcome
                        .error
                        .clone()
                        .unwrap_or_else(|| "unknown error".to_string()),
                });
            }
        }
        self.file_times
            .push((file_name(&outcome.path), outcome.elapsed_seconds));
        self.current_file.clear();
    }

    /// Transition to a new state, stamping the end time on terminal states.
    pub fn transition_to(&mut self, new_state: JobState) {
        self.state = new_state;
        if self.is_terminal() {
            self.ended_at = Some(Utc::now());
            self.current_file.clear();
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, JobState::Completed | JobState::Stopped)
    }

    /// Estimated seconds remaining: running average per-file time times the
    /// remaining file count. Zero until at least one file has completed or
    /// once the job is terminal.
    pub fn eta_seconds(&self) -> f64 {
        if self.is_terminal() || self.processed == 0 {
            return 0.0;
        }

        let total_time: f64 = self.file_times.iter().map(|(_, t)| t).sum();
        let avg = total_time / self.processed as f64;
        let remaining = self.files.len().saturating_sub(self.processed);
        avg * remaining as f64
    }

    /// Immutable projection for status readers.
    pub fn snapshot(&self) -> StatusSnapshot {
        let total = self.files.len();
        let eta = self.eta_seconds();
        let runtime = (self.ended_at.unwrap_or_else(Utc::now) - self.started_at)
            .num_milliseconds() as f64
            / 1000.0;

        StatusSnapshot {
            active: self.state == JobState::Running,
            state: Some(self.state),
            job_id: Some(self.job_id),
            current_path: self.root_path.display().to_string(),
            total_files: total,
            processed_files: self.processed,
            successful_files: self.successful,
            failed_files: self.failed,
            current_file: self.current_file.clone(),
            progress_percent: if total > 0 {
                (self.processed as f64 / total as f64) * 100.0
            } else {
                0.0
            },
            eta_seconds: eta,
            eta_formatted: format_duration(eta),
            runtime_formatted: format_duration(runtime),
            tag_mode: self.tag_mode,
            save_mode: self.save_mode,
            errors: self.errors.clone(),
            stats: JobStats::from_times(&self.file_times),
        }
    }
}

/// Read-only status projection of the most recent job.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<JobState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    pub current_path: String,
    pub total_files: usize,
    pub processed_files: usize,
    pub successful_files: usize,
    pub failed_files: usize,
    pub current_file: String,
    pub progress_percent: f64,
    pub eta_seconds: f64,
    pub eta_formatted: String,
    pub runtime_formatted: String,
    pub tag_mode: TagMode,
    pub save_mode: SaveMode,
    pub errors: Vec<FileError>,
    pub stats: JobStats,
}

impl Default for StatusSnapshot {
    /// Status before any job has been accepted.
    fn default() -> Self {
        Self {
            active: false,
            state: None,
            job_id: None,
            current_path: String::new(),
            total_files: 0,
            processed_files: 0,
            successful_files: 0,
            failed_files: 0,
            current_file: String::new(),
            progress_percent: 0.0,
            eta_seconds: 0.0,
            eta_formatted: format_duration(0.0),
            runtime_formatted: format_duration(0.0),
            tag_mode: TagMode::default(),
            save_mode: SaveMode::default(),
            errors: Vec::new(),
            stats: JobStats::default(),
        }
    }
}

/// Per-job timing statistics
#[derive(Debug, Clone, Serialize, Default)]
pub struct JobStats {
    pub avg_time_per_image: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fastest_image: Option<TimedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slowest_image: Option<TimedFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimedFile {
    pub file: String,
    pub time: f64,
}

impl JobStats {
    fn from_times(times: &[(String, f64)]) -> Self {
        if times.is_empty() {
            return Self::default();
        }

        let total: f64 = times.iter().map(|(_, t)| t).sum();
        let fastest = times
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(f, t)| TimedFile {
                file: f.clone(),
                time: *t,
            });
        let slowest = times
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(f, t)| TimedFile {
                file: f.clone(),
                time: *t,
            });

        Self {
            avg_time_per_image: total / times.len() as f64,
            fastest_image: fastest,
            slowest_image: slowest,
        }
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
