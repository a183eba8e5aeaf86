//! Integration tests for the HTTP API
//!
//! Drives the router through tower's `oneshot`, with the external
//! classifiers and writer replaced by in-process fakes.

use autotag_common::{SaveMode, ServiceConfig, TagMode};
use autotag_svc::classifiers::{Classifier, ClassifierError, ClassifierResult};
use autotag_svc::services::exiftool::{MetadataWriter, WriteError, WriteOutcome};
use autotag_svc::services::ImagePipeline;
use autotag_svc::vocab::{Category, TagSet};
use autotag_svc::{build_router, AppState};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

const JPEG_HEADER: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01,
];

struct FakeSceneClassifier;

#[async_trait::async_trait]
impl Classifier for FakeSceneClassifier {
    fn name(&self) -> &'static str {
        "scene"
    }

    async fn classify(&self, _image: &Path) -> Result<Vec<ClassifierResult>, ClassifierError> {
        Ok(vec![
            ClassifierResult::new(Category::Scene, "indoor", 0.95),
            ClassifierResult::new(Category::RoomType, "kitchen", 0.88),
        ])
    }
}

struct FakeWriter;

#[async_trait::async_trait]
impl MetadataWriter for FakeWriter {
    async fn write(
        &self,
        path: &Path,
        tags: &TagSet,
        _tag_mode: TagMode,
        _save_mode: SaveMode,
    ) -> Result<WriteOutcome, WriteError> {
        Ok(WriteOutcome {
            output_path: path.to_path_buf(),
            tags_written: tags.len(),
        })
    }
}

fn test_app() -> axum::Router {
    let classifiers: Vec<Arc<dyn Classifier>> = vec![Arc::new(FakeSceneClassifier)];
    let writer: Arc<dyn MetadataWriter> = Arc::new(FakeWriter);
    let pipeline = Arc::new(ImagePipeline::new(classifiers, writer));
    let state = AppState::with_pipeline(ServiceConfig::default(), pipeline);
    build_router(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assemble a minimal multipart body with one JPEG `file` part.
fn multipart_jpeg_body(boundary: &str, filename: &str, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "autotag-svc");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_status_before_any_job() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["active"], false);
    assert_eq!(json["total_files"], 0);
    assert!(json.get("job_id").is_none());
}

#[tokio::test]
async fn test_process_image_returns_tags() {
    let body = multipart_jpeg_body("X-BOUNDARY", "kitchen.jpg", JPEG_HEADER);

    let response = test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/process/image")
                .header(
                    header::CONTENT_TYPE,
                    "multipart/form-data; boundary=X-BOUNDARY",
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["file"], "kitchen.jpg");
    assert_eq!(json["tags"], json!(["scene/indoor", "roomtype/kitchen"]));
}

#[tokio::test]
async fn test_process_image_rejects_non_image_upload() {
    let body = multipart_jpeg_body("X-BOUNDARY", "fake.jpg", b"definitely not an image");

    let response = test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/process/image")
                .header(
                    header::CONTENT_TYPE,
                    "multipart/form-data; boundary=X-BOUNDARY",
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_process_folder_missing_path_is_404() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/process/folder")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"path": "/nonexistent/folder"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_process_stop_without_job_is_400() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/process/stop")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_folder_job_lifecycle_over_http() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..3 {
        std::fs::write(dir.path().join(format!("img{}.jpg", i)), JPEG_HEADER).unwrap();
    }

    // Both requests must hit the same app instance to share the job slot
    let app = test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/process/folder")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"path": dir.path(), "recursive": false}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let start = body_json(response).await;
    assert!(start["job_id"].is_string());
    assert_eq!(start["total_files"], 3);

    // Poll /status until the job completes
    let mut last = Value::Null;
    for _ in 0..500 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        last = body_json(response).await;
        if last["active"] == false {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(last["state"], "COMPLETED");
    assert_eq!(last["processed_files"], 3);
    assert_eq!(last["successful_files"], 3);
    assert_eq!(last["failed_files"], 0);
    assert_eq!(last["progress_percent"], 100.0);
}
