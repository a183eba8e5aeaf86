//! Person count classifier adapter
//!
//! Executes the configured person detector sidecar and normalizes its
//! bounding boxes into a single `people/*` candidate: `solo` when exactly
//! one detected person meets the minimum-height threshold, `group` when more
//! than one does, and no candidate at all when none do.

use super::{Classifier, ClassifierError, ClassifierResult};
use crate::vocab::Category;
use autotag_common::config::ClassifierSection;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Person detector adapter (external YOLO-style sidecar)
pub struct PersonClassifier {
    command: String,
    models_dir: std::path::PathBuf,
    use_gpu: bool,
    min_person_height: u32,
    timeout_seconds: u64,
}

impl PersonClassifier {
    pub fn new(config: &ClassifierSection) -> Self {
        Self {
            command: config.person_command.clone(),
            models_dir: config.models_dir.clone(),
            use_gpu: config.use_gpu,
            min_person_height: config.min_person_height,
            timeout_seconds: config.timeout_seconds,
        }
    }

    async fn run_sidecar(&self, image: &Path) -> Result<DetectorOutput, ClassifierError> {
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
            .map_err(|e| ClassifierError::Parse(format!("person sidecar JSON: {}", e)))
    }
}

#[async_trait::async_trait]
impl Classifier for PersonClassifier {
    fn name(&self) -> &'static str {
        "person"
    }

    async fn classify(&self, image: &Path) -> Result<Vec<ClassifierResult>, ClassifierError> {
        debug!(image = %image.display(), "Running person detector sidecar");

        let output = self.run_sidecar(image).await?;
        let results = normalize_detections(&output.persons, self.min_person_height);

        debug!(
            image = %image.display(),
            detections = output.persons.len(),
            candidates = results.len(),
            "Person detection complete"
        );

        Ok(results)
    }
}

/// Map qualifying detections to a `people/*` candidate.
///
/// Detections shorter than `min_height` are ignored (background figures).
/// The candidate's confidence is the mean score of the qualifying boxes.
fn normalize_detections(persons: &[PersonBox], min_height: u32) -> Vec<ClassifierResult> {
    let qualifying: Vec<&PersonBox> = persons.iter().filter(|p| p.height >= min_height).collect();

    if qualifying.is_empty() {
        return Vec::new();
    }

    let mean_score = qualifying.iter().map(|p| p.score).sum::<f64>() / qualifying.len() as f64;
    let value = if qualifying.len() == 1 { "solo" } else { "group" };

    vec![ClassifierResult::new(Category::People, value, mean_score)]
}

// ============================================================================
// Sidecar JSON Output Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct DetectorOutput {
    #[serde(default)]
    persons: Vec<PersonBox>,
}

/// One detected person bounding box
#[derive(Debug, Deserialize)]
struct PersonBox {
    /// Box height in pixels
    height: u32,
    /// Detection score in [0,1]
    score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(height: u32, score: f64) -> PersonBox {
        PersonBox { height, score }
    }

    #[test]
    fn test_zero_qualifying_persons_emit_nothing() {
        assert!(normalize_detections(&[], 40).is_empty());
        // All below the height threshold
        assert!(normalize_detections(&[person(12, 0.9), person(39, 0.8)], 40).is_empty());
    }

    #[test]
    fn test_exactly_one_person_is_solo() {
        let results = normalize_detections(&[person(120, 0.9)], 40);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].category, Category::People);
        assert_eq!(results[0].value, "solo");
        assert_eq!(results[0].confidence, 0.9);
    }

    #[test]
    fn test_multiple_persons_are_group() {
        let results = normalize_detections(&[person(120, 0.8), person(90, 0.6)], 40);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value, "group");
        assert!((results[0].confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_height_threshold_is_inclusive() {
        // A box at exactly min_height counts
        let results = normalize_detections(&[person(40, 0.5)], 40);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value, "solo");
    }

    #[test]
    fn test_short_boxes_do_not_turn_solo_into_group() {
        let results = normalize_detections(&[person(150, 0.9), person(10, 0.9)], 40);
        assert_eq!(results[0].value, "solo");
    }
}
