//! Per-image processing result

use crate::vocab::TagSet;
use std::path::{Path, PathBuf};

/// Result of running the single-image pipeline on one file.
///
/// Failures are values, not panics or escaped errors: the batch loop only
/// ever sees one of these per file.
#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    /// Input file path
    pub path: PathBuf,
    /// Tags produced for this image (possibly empty)
    pub tags: TagSet,
    /// Where the tags were written, if a write happened
    pub output_path: Option<PathBuf>,
    /// Whether the image was processed successfully
    pub success: bool,
    /// Error detail when `success` is false
    pub error: Option<String>,
    /// Wall-clock processing time in seconds
    pub elapsed_seconds: f64,
}

impl ProcessingOutcome {
    pub fn succeeded(
        path: &Path,
        tags: TagSet,
        output_path: Option<PathBuf>,
        elapsed_seconds: f64,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            tags,
            output_path,
            success: true,
            error: None,
            elapsed_seconds,
        }
    }

    pub fn failed(path: &Path, error: String, elapsed_seconds: f64) -> Self {
        Self {
            path: path.to_path_buf(),
            tags: TagSet::new(),
            output_path: None,
            success: false,
            error: Some(error),
            elapsed_seconds,
        }
    }
}
