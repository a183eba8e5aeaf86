//! Processing API handlers
//!
//! POST /process/image, POST /process/folder, POST /process/stop

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::JobState,
    AppState,
};
use autotag_common::{SaveMode, TagMode};

/// POST /process/folder request
#[derive(Debug, Deserialize)]
pub struct ProcessFolderRequest {
    pub path: String,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub tag_mode: Option<TagMode>,
    #[serde(default)]
    pub save_mode: Option<SaveMode>,
}

/// POST /process/folder response
#[derive(Debug, Serialize)]
pub struct ProcessFolderResponse {
    pub job_id: Uuid,
    pub state: JobState,
    pub total_files: usize,
}

/// POST /process/image response
#[derive(Debug, Serialize)]
pub struct ProcessImageResponse {
    pub file: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    pub elapsed_seconds: f64,
}

/// POST /process/stop response
#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub job_id: Uuid,
    pub message: String,
}

/// POST /process/image
///
/// Synchronous single-image processing. Accepts a multipart upload with a
/// `file` part and optional `tag_mode` / `save_mode` text parts, runs the
/// full pipeline, and returns the tags once metadata is committed.
pub async fn process_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<ProcessImageResponse>> {
    let mut file_name = String::new();
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut tag_mode = state.config.tagging.default_tag_mode;
    let mut save_mode = SaveMode::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
                file_bytes = Some(bytes.to_vec());
            }
            "tag_mode" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid tag_mode: {}", e)))?;
                tag_mode = TagMode::from_str(&text)
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            }
            "save_mode" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid save_mode: {}", e)))?;
                save_mode = SaveMode::from_str(&text)
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    let bytes = file_bytes
        .ok_or_else(|| ApiError::BadRequest("Missing 'file' part in upload".to_string()))?;

    // Magic-byte check so renamed non-images are refused up front
    match infer::get(&bytes).map(|k| k.mime_type()) {
        Some("image/jpeg") | Some("image/png") => {}
        _ => {
            return Err(ApiError::BadRequest(format!(
                "Not a JPEG or PNG image: {}",
                file_name
            )))
        }
    }

    // Spool the upload to disk for the pipeline's external collaborators
    let extension = PathBuf::from(&file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "jpg".to_string());
    let temp_path =
        std::env::temp_dir().join(format!("autotag-{}.{}", Uuid::new_v4(), extension));
    tokio::fs::write(&temp_path, &bytes).await?;

    let outcome = state
        .pipeline
        .process(
            &temp_path,
            tag_mode,
            save_mode,
            state.config.tagging.min_confidence_percent,
        )
        .await;

    // In replace save mode the temp file IS the tagged output, so the caller
    // would get nothing back; leave cleanup consistent either way and report
    // the suffixed path only when one was produced elsewhere
    if let Err(e) = tokio::fs::remove_file(&temp_path).await {
        tracing::warn!(path = %temp_path.display(), error = %e, "Failed to remove temp upload");
    }

    if !outcome.success {
        let message = outcome
            .error
            .unwrap_or_else(|| "processing failed".to_string());
        *state.last_error.write().await = Some(message.clone());
        return Err(ApiError::Internal(message));
    }

    Ok(Json(ProcessImageResponse {
        file: file_name,
        tags: outcome.tags.qualified(),
        output_path: outcome
            .output_path
            .filter(|p| *p != temp_path)
            .map(|p| p.display().to_string()),
        elapsed_seconds: outcome.elapsed_seconds,
    }))
}

/// POST /process/folder
///
/// Start an asynchronous folder batch job. Returns immediately with the job
/// id; progress is polled through GET /status. Refused with 409 while a job
/// is running.
pub async fn process_folder(
    State(state): State<AppState>,
    Json(request): Json<ProcessFolderRequest>,
) -> ApiResult<Json<ProcessFolderResponse>> {
    let tag_mode = request
        .tag_mode
        .unwrap_or(state.config.tagging.default_tag_mode);
    let save_mode = request.save_mode.unwrap_or_default();

    let job_id = state
        .job_manager
        .start(
            PathBuf::from(&request.path),
            request.recursive,
            tag_mode,
            save_mode,
        )
        .await
        .map_err(ApiError::from)?;

    let snapshot = state.job_manager.status().await;

    Ok(Json(ProcessFolderResponse {
        job_id,
        state: snapshot.state.unwrap_or(JobState::Running),
        total_files: snapshot.total_files,
    }))
}

/// POST /process/stop
///
/// Request a stop of the running batch job. The file currently in flight
/// finishes and commits before the job transitions to STOPPED.
pub async fn process_stop(State(state): State<AppState>) -> ApiResult<Json<StopResponse>> {
    let job_id = state.job_manager.stop().await?;

    Ok(Json(StopResponse {
        job_id,
        message: "Stop requested; job will halt after the current file".to_string(),
    }))
}

/// Build processing routes
pub fn process_routes() -> Router<AppState> {
    Router::new()
        .route("/process/image", post(process_image))
        .route("/process/folder", post(process_folder))
        .route("/process/stop", post(process_stop))
}
