//! Batch job manager
//!
//! Owns the single batch job slot. At most one folder job runs at a time;
//! a second start request is refused until the active job reaches a terminal
//! state. The manager is the only writer of the live `ProcessingJob` —
//! handlers and pollers only ever receive `StatusSnapshot` copies.
//!
//! Stop requests are delivered through a `CancellationToken` and take effect
//! between files: the in-flight file always commits its outcome first.

use crate::models::{JobState, ProcessingJob, StatusSnapshot};
use crate::services::pipeline::ImagePipeline;
use crate::services::scanner::{ImageScanner, ScanError};
use autotag_common::{SaveMode, TagMode};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Job control errors
#[derive(Debug, Error)]
pub enum JobError {
    /// A batch job is already running
    #[error("Job {0} is already running")]
    AlreadyRunning(Uuid),

    /// Stop requested with no running job
    #[error("No active job")]
    NoActiveJob,

    /// Folder enumeration failed before the job could start
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Background task machinery failure
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The one batch job slot plus its stop channel
struct JobSlot {
    job: Option<ProcessingJob>,
    cancel: Option<CancellationToken>,
    /// Job id claimed by a start request whose enumeration is still running.
    /// Holds the single-job invariant without keeping the lock across the
    /// directory scan, so status readers never stall behind it.
    pending: Option<Uuid>,
}

/// Batch job manager
pub struct JobManager {
    pipeline: Arc<ImagePipeline>,
    min_confidence_percent: f64,
    slot: Arc<RwLock<JobSlot>>,
}

impl JobManager {
    pub fn new(pipeline: Arc<ImagePipeline>, min_confidence_percent: f64) -> Self {
        Self {
            pipeline,
            min_confidence_percent,
            slot: Arc::new(RwLock::new(JobSlot {
                job: None,
                cancel: None,
                pending: None,
            })),
        }
    }

    /// Start a folder batch job.
    ///
    /// Enumerates the folder up front so the caller gets scan errors
    /// synchronously, then spawns the processing loop and returns the job
    /// id immediately. An empty folder completes the job on the spot.
    ///
    /// # Errors
    /// `AlreadyRunning` if a job is active, `Scan` if enumeration fails.
    pub async fn start(
        &self,
        root_path: PathBuf,
        recursive: bool,
        tag_mode: TagMode,
        save_mode: SaveMode,
    ) -> Result<Uuid, JobError> {
        let job_id = Uuid::new_v4();

        // Claim the slot before enumerating so two concurrent start requests
        // cannot both get in, then release the lock for the scan's duration
        {
            let mut slot = self.slot.write().await;

            if let Some(id) = slot.pending {
                return Err(JobError::AlreadyRunning(id));
            }
            if let Some(job) = &slot.job {
                if job.state == JobState::Running {
                    return Err(JobError::AlreadyRunning(job.job_id));
                }
            }
            slot.pending = Some(job_id);
        }

        let scan_root = root_path.clone();
        let scanned = match tokio::task::spawn_blocking(move || {
            ImageScanner::new().scan(&scan_root, recursive)
        })
        .await
        {
            Ok(result) => result.map_err(JobError::from),
            Err(e) => Err(JobError::Internal(format!("scan task: {}", e))),
        };

        let mut slot = self.slot.write().await;
        slot.pending = None;
        let files = scanned?;

        let mut job = ProcessingJob::new(root_path.clone(), recursive, tag_mode, save_mode, files);
        job.job_id = job_id;

        if job.files.is_empty() {
            info!(job_id = %job_id, path = %root_path.display(), "Folder contains no images, job completed immediately");
            job.transition_to(JobState::Completed);
            slot.job = Some(job);
            slot.cancel = None;
            return Ok(job_id);
        }

        info!(
            job_id = %job_id,
            path = %root_path.display(),
            files = job.files.len(),
            recursive,
            "Starting batch job"
        );

        let cancel = CancellationToken::new();
        let files = job.files.clone();
        slot.job = Some(job);
        slot.cancel = Some(cancel.clone());
        drop(slot);

        let pipeline = Arc::clone(&self.pipeline);
        let slot_handle = Arc::clone(&self.slot);
        let min_confidence = self.min_confidence_percent;

        tokio::spawn(async move {
            run_job(
                slot_handle,
                pipeline,
                files,
                tag_mode,
                save_mode,
                min_confidence,
                cancel,
            )
            .await;
        });

        Ok(job_id)
    }

    /// Request a stop of the running job.
    ///
    /// The in-flight file finishes and commits before the job transitions
    /// to `STOPPED`.
    ///
    /// # Errors
    /// `NoActiveJob` if nothing is running.
    pub async fn stop(&self) -> Result<Uuid, JobError> {
        let slot = self.slot.read().await;

        match (&slot.job, &slot.cancel) {
            (Some(job), Some(cancel)) if job.state == JobState::Running => {
                info!(job_id = %job.job_id, "Stop requested");
                cancel.cancel();
                Ok(job.job_id)
            }
            _ => Err(JobError::NoActiveJob),
        }
    }

    /// Snapshot the most recent job, or the inactive default if no job has
    /// ever been accepted.
    pub async fn status(&self) -> StatusSnapshot {
        let slot = self.slot.read().await;
        slot.job
            .as_ref()
            .map(ProcessingJob::snapshot)
            .unwrap_or_default()
    }
}

/// Background processing loop for one job.
async fn run_job(
    slot: Arc<RwLock<JobSlot>>,
    pipeline: Arc<ImagePipeline>,
    files: Vec<PathBuf>,
    tag_mode: TagMode,
    save_mode: SaveMode,
    min_confidence_percent: f64,
    cancel: CancellationToken,
) {
    for file in &files {
        if cancel.is_cancelled() {
            let mut slot = slot.write().await;
            if let Some(job) = slot.job.as_mut() {
                warn!(
                    job_id = %job.job_id,
                    processed = job.processed,
                    total = files.len(),
                    "Job stopped before completion"
                );
                job.transition_to(JobState::Stopped);
            }
            return;
        }

        {
            let mut slot = slot.write().await;
            if let Some(job) = slot.job.as_mut() {
                job.current_file = file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| file.display().to_string());
            }
        }

        let outcome = pipeline
            .process(file, tag_mode, save_mode, min_confidence_percent)
            .await;

        if !outcome.success {
            // Per-file failures never abort the batch
            error!(
                file = %file.display(),
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "File failed, continuing with next file"
            );
        }

        let mut slot = slot.write().await;
        if let Some(job) = slot.job.as_mut() {
            job.commit_outcome(&outcome);
        }
    }

    let mut slot = slot.write().await;
    if let Some(job) = slot.job.as_mut() {
        // Stop may have arrived during the final file
        let final_state = if cancel.is_cancelled() {
            JobState::Stopped
        } else {
            JobState::Completed
        };
        info!(
            job_id = %job.job_id,
            processed = job.processed,
            successful = job.successful,
            failed = job.failed,
            state = ?final_state,
            "Batch job finished"
        );
        job.transition_to(final_state);
    }
}
