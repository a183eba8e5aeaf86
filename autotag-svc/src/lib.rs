//! autotag-svc - Image Auto-Tagging Service
//!
//! Long-running HTTP service that derives a small fixed vocabulary of
//! descriptive tags (scene, room type, clothing, person count) from images
//! and persists them into image metadata via ExifTool.
//!
//! Exposed as a library so integration tests can drive the router and the
//! job manager directly.

pub mod api;
pub mod classifiers;
pub mod error;
pub mod models;
pub mod services;
pub mod vocab;

pub use crate::error::{ApiError, ApiResult};

use crate::classifiers::{Classifier, PersonClassifier, SceneClassifier};
use crate::services::{ExifToolWriter, ImagePipeline, JobManager, MetadataWriter};
use autotag_common::ServiceConfig;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Uploads above this size are refused before they reach the pipeline
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Service configuration
    pub config: Arc<ServiceConfig>,
    /// Single-image pipeline, shared by the sync endpoint and batch jobs
    pub pipeline: Arc<ImagePipeline>,
    /// Batch job manager (owns the single job slot)
    pub job_manager: Arc<JobManager>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    /// Assemble the full processing stack from configuration.
    pub fn new(config: ServiceConfig) -> Self {
        let classifiers: Vec<Arc<dyn Classifier>> = vec![
            Arc::new(SceneClassifier::new(&config.classifiers)),
            Arc::new(PersonClassifier::new(&config.classifiers)),
        ];
        let writer: Arc<dyn MetadataWriter> = Arc::new(ExifToolWriter::new(
            &config.writer.exiftool_path,
            config.writer.timeout_seconds,
            &config.tagging.output_suffix,
        ));
        let pipeline = Arc::new(ImagePipeline::new(classifiers, writer));
        let job_manager = Arc::new(JobManager::new(
            Arc::clone(&pipeline),
            config.tagging.min_confidence_percent,
        ));

        Self {
            config: Arc::new(config),
            pipeline,
            job_manager,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Build state around pre-constructed collaborators, for tests.
    pub fn with_pipeline(config: ServiceConfig, pipeline: Arc<ImagePipeline>) -> Self {
        let job_manager = Arc::new(JobManager::new(
            Arc::clone(&pipeline),
            config.tagging.min_confidence_percent,
        ));
        Self {
            config: Arc::new(config),
            pipeline,
            job_manager,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::process_routes())
        .merge(api::status_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
