//! Scene/room/clothing classifier adapter
//!
//! Executes the configured CLIP sidecar command for one image and parses its
//! JSON output into normalized candidates. The sidecar owns model loading
//! and hardware placement; this adapter only launches it and normalizes
//! label/score lists for the `scene`, `roomtype` and `clothing` categories.

use super::{Classifier, ClassifierError, ClassifierResult};
use crate::vocab::Category;
use autotag_common::config::ClassifierSection;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Scene classifier adapter (external CLIP sidecar)
pub struct SceneClassifier {
    command: String,
    models_dir: std::path::PathBuf,
    use_gpu: bool,
    timeout_seconds: u64,
}

impl SceneClassifier {
    pub fn new(config: &ClassifierSection) -> Self {
        Self {
            command: config.scene_command.clone(),
            models_dir: config.models_dir.clone(),
            use_gpu: config.use_gpu,
            timeout_seconds: config.timeout_seconds,
        }
    }

    async fn run_sidecar(&self, image: &Path) -> Result<SceneOutput, ClassifierError> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("--image")
            .arg(image)
            .arg("--models-dir")
            .arg(&self.models_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if !self.use_gpu {
            cmd.arg("--no-gpu");
        }

        let output = tokio::time::timeout(Duration::from_secs(self.timeout_seconds), cmd.output())
            .await
            .map_err(|_| ClassifierError::Timeout(self.timeout_seconds))?
            .map_err(|e| ClassifierError::Launch(format!("{}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClassifierError::Tool(stderr.trim().to_string()));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ClassifierError::Parse(format!("scene sidecar JSON: {}", e)))
    }
}

#[async_trait::async_trait]
impl Classifier for SceneClassifier {
    fn name(&self) -> &'static str {
        "scene"
    }

    async fn classify(&self, image: &Path) -> Result<Vec<ClassifierResult>, ClassifierError> {
        debug!(image = %image.display(), "Running scene classifier sidecar");

        let output = self.run_sidecar(image).await?;
        let results = normalize_output(output);

        debug!(
            image = %image.display(),
            candidates = results.len(),
            "Scene classification complete"
        );

        Ok(results)
    }
}

/// Flatten the sidecar's per-category label/score lists into candidates.
fn normalize_output(output: SceneOutput) -> Vec<ClassifierResult> {
    let mut results = Vec::new();

    for (category, scores) in [
        (Category::Scene, output.scene),
        (Category::RoomType, output.roomtype),
        (Category::Clothing, output.clothing),
    ] {
        for scored in scores {
            results.push(ClassifierResult::new(category, scored.label, scored.score));
        }
    }

    results
}

// ============================================================================
// Sidecar JSON Output Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SceneOutput {
    #[serde(default)]
    scene: Vec<ScoredLabel>,
    #[serde(default)]
    roomtype: Vec<ScoredLabel>,
    #[serde(default)]
    clothing: Vec<ScoredLabel>,
}

#[derive(Debug, Deserialize)]
struct ScoredLabel {
    label: String,
    score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_all_categories() {
        let output: SceneOutput = serde_json::from_str(
            r#"{
                "scene": [{"label": "indoor", "score": 0.93}, {"label": "outdoor", "score": 0.07}],
                "roomtype": [{"label": "kitchen", "score": 0.81}],
                "clothing": [{"label": "dressed", "score": 0.99}]
            }"#,
        )
        .unwrap();

        let results = normalize_output(output);
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].category, Category::Scene);
        assert_eq!(results[0].value, "indoor");
        assert_eq!(results[2].category, Category::RoomType);
        assert_eq!(results[3].category, Category::Clothing);
    }

    #[test]
    fn test_missing_categories_yield_no_candidates() {
        let output: SceneOutput =
            serde_json::from_str(r#"{"scene": [{"label": "outdoor", "score": 0.88}]}"#).unwrap();

        let results = normalize_output(output);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value, "outdoor");
    }

    #[tokio::test]
    async fn test_missing_sidecar_is_launch_error() {
        let classifier = SceneClassifier {
            command: "/nonexistent/autotag-scene-classifier".to_string(),
            models_dir: std::path::PathBuf::from("/tmp"),
            use_gpu: false,
            timeout_seconds: 5,
        };

        let result = classifier.classify(Path::new("/tmp/img.jpg")).await;
        assert!(matches!(result, Err(ClassifierError::Launch(_))));
    }
}
