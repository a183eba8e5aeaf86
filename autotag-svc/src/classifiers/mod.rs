//! Classifier adapters
//!
//! Every external visual classifier is wrapped behind the same capability
//! interface: given an image path, return zero or more normalized
//! `(category, value, confidence)` candidates. The aggregator never branches
//! on classifier identity; heterogeneous native outputs (label/score pairs,
//! bounding boxes, counts) are normalized here.
//!
//! Adapters never retry internally; retry policy belongs to the caller.

pub mod person;
pub mod scene;

pub use person::PersonClassifier;
pub use scene::SceneClassifier;

use crate::vocab::Category;
use std::path::Path;
use thiserror::Error;

/// One normalized classifier candidate for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierResult {
    /// Tag category this candidate belongs to
    pub category: Category,
    /// Candidate value (validated against the vocabulary during aggregation)
    pub value: String,
    /// Confidence in [0.0, 1.0]
    pub confidence: f64,
}

impl ClassifierResult {
    /// Create a candidate with the confidence clamped to [0.0, 1.0].
    pub fn new(category: Category, value: impl Into<String>, confidence: f64) -> Self {
        Self {
            category,
            value: value.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Classifier adapter errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Sidecar process could not be launched
    #[error("Classifier launch failed: {0}")]
    Launch(String),

    /// Sidecar call exceeded its timeout
    #[error("Classifier timed out after {0}s")]
    Timeout(u64),

    /// Sidecar exited nonzero
    #[error("Classifier failed: {0}")]
    Tool(String),

    /// Sidecar output was malformed
    #[error("Classifier output parse error: {0}")]
    Parse(String),

    /// I/O error reading the image or sidecar output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability interface exposed identically by every concrete classifier.
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    /// Classifier name for logging and error attribution
    fn name(&self) -> &'static str;

    /// Classify one image into zero or more normalized candidates.
    ///
    /// # Errors
    /// Returns `ClassifierError` if the external model call errors, times
    /// out, or returns malformed output. Errors are isolated per classifier
    /// by the pipeline; other classifiers still contribute.
    async fn classify(&self, image: &Path) -> Result<Vec<ClassifierResult>, ClassifierError>;
}
