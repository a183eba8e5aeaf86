//! Single-image pipeline
//!
//! Composes classifier adapters → tag aggregator → metadata writer for one
//! image. Synchronous relative to its caller and never lets an error escape:
//! any fault converts into a failed `ProcessingOutcome`, so the batch loop
//! upstream sees values only.

use crate::classifiers::{Classifier, ClassifierResult};
use crate::models::ProcessingOutcome;
use crate::services::aggregator::aggregate;
use crate::services::exiftool::MetadataWriter;
use autotag_common::{SaveMode, TagMode};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Single-image processing pipeline
pub struct ImagePipeline {
    classifiers: Vec<Arc<dyn Classifier>>,
    writer: Arc<dyn MetadataWriter>,
}

impl ImagePipeline {
    pub fn new(classifiers: Vec<Arc<dyn Classifier>>, writer: Arc<dyn MetadataWriter>) -> Self {
        Self {
            classifiers,
            writer,
        }
    }

    /// Process one image end to end.
    ///
    /// Classifier failures are isolated: the remaining classifiers still
    /// contribute, and the outcome is only failed when classifier errors
    /// left nothing to tag, or the metadata write itself failed. An empty
    /// tag set with no classifier errors is a success that skips the write.
    pub async fn process(
        &self,
        path: &Path,
        tag_mode: TagMode,
        save_mode: SaveMode,
        min_confidence_percent: f64,
    ) -> ProcessingOutcome {
        let start = Instant::now();

        let mut results: Vec<ClassifierResult> = Vec::new();
        let mut classifier_errors: Vec<String> = Vec::new();

        for classifier in &self.classifiers {
            match classifier.classify(path).await {
                Ok(candidates) => results.extend(candidates),
                Err(e) => {
                    warn!(
                        classifier = classifier.name(),
                        image = %path.display(),
                        error = %e,
                        "Classifier failed, continuing with remaining classifiers"
                    );
                    classifier_errors.push(format!("{}: {}", classifier.name(), e));
                }
            }
        }

        let tags = aggregate(&results, min_confidence_percent);
        let elapsed = start.elapsed().as_secs_f64();

        if tags.is_empty() {
            if classifier_errors.is_empty() {
                // Nothing met the threshold; a valid, if quiet, result
                debug!(image = %path.display(), "No tags above confidence threshold");
                return ProcessingOutcome::succeeded(path, tags, None, elapsed);
            }
            return ProcessingOutcome::failed(
                path,
                format!("no tags produced; classifier errors: {}", classifier_errors.join("; ")),
                elapsed,
            );
        }

        match self.writer.write(path, &tags, tag_mode, save_mode).await {
            Ok(outcome) => {
                let elapsed = start.elapsed().as_secs_f64();
                info!(
                    image = %path.display(),
                    output = %outcome.output_path.display(),
                    tags = tags.len(),
                    elapsed_seconds = elapsed,
                    "Image processed"
                );
                ProcessingOutcome::succeeded(path, tags, Some(outcome.output_path), elapsed)
            }
            Err(e) => {
                let elapsed = start.elapsed().as_secs_f64();
                warn!(image = %path.display(), error = %e, "Metadata write failed");
                ProcessingOutcome::failed(path, format!("write: {}", e), elapsed)
            }
        }
    }
}
