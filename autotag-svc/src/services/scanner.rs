//! Image file scanner
//!
//! Two-phase directory enumeration for batch jobs:
//! - Phase 1: sequential traversal (depth 1 unless recursive) with symlink
//!   loop detection and ignore patterns
//! - Phase 2: parallel magic-byte verification, so a renamed text file never
//!   reaches the classifiers
//!
//! Results are sorted so a job's file order is deterministic.

use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Image scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Cannot access file
    #[error("File access error {0}: {1}")]
    FileAccessError(PathBuf, String),
}

/// Image file scanner
pub struct ImageScanner {
    ignore_patterns: Vec<String>,
}

impl ImageScanner {
    /// Create a scanner with default ignore patterns for system clutter.
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
            ],
        }
    }

    /// Enumerate image files under `root_path`.
    ///
    /// Non-recursive scans stop at the first directory level, matching the
    /// folder-processing request's recursive flag.
    pub fn scan(&self, root_path: &Path, recursive: bool) -> Result<Vec<PathBuf>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }
        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        // Phase 1: sequential traversal; symlink_visited is mutable so this
        // cannot be parallelized
        let mut candidate_files = Vec::new();
        let mut symlink_visited = HashSet::new();

        let walker = WalkDir::new(root_path)
            .follow_links(false)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e, &mut symlink_visited));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() {
                        candidate_files.push(entry.path().to_path_buf());
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    // Continue scanning, don't abort
                }
            }
        }

        // Phase 2: parallel magic-byte verification; each thread reads a
        // different file
        let mut image_files: Vec<PathBuf> = candidate_files
            .par_iter()
            .filter_map(|path| match self.is_image_file(path) {
                Ok(true) => Some(path.clone()),
                Ok(false) => None,
                Err(e) => {
                    tracing::warn!("Error verifying {}: {}", path.display(), e);
                    None
                }
            })
            .collect();

        image_files.sort();

        tracing::debug!(
            root = %root_path.display(),
            recursive,
            candidates = candidate_files.len(),
            images = image_files.len(),
            "Image scan complete"
        );

        Ok(image_files)
    }

    fn should_process_entry(
        &self,
        entry: &DirEntry,
        symlink_visited: &mut HashSet<PathBuf>,
    ) -> bool {
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy();

        for pattern in &self.ignore_patterns {
            if file_name.contains(pattern) {
                return false;
            }
        }

        // Detect symlink loops
        if entry.file_type().is_symlink() {
            if let Ok(canonical) = path.canonicalize() {
                if !symlink_visited.insert(canonical) {
                    tracing::warn!("Symlink loop detected: {}", path.display());
                    return false;
                }
            }
        }

        true
    }

    /// Extension check first (fast), then magic bytes (reliable).
    fn is_image_file(&self, path: &Path) -> Result<bool, ScanError> {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.is_image_extension(&ext_lower) {
                return self.verify_magic_bytes(path);
            }
        }

        Ok(false)
    }

    fn is_image_extension(&self, ext: &str) -> bool {
        matches!(ext, "jpg" | "jpeg" | "png")
    }

    fn verify_magic_bytes(&self, path: &Path) -> Result<bool, ScanError> {
        let mut file = File::open(path)
            .map_err(|e| ScanError::FileAccessError(path.to_path_buf(), e.to_string()))?;

        let mut buffer = [0u8; 16];
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| ScanError::FileAccessError(path.to_path_buf(), e.to_string()))?;

        if bytes_read < 4 {
            return Ok(false); // Too small to be an image
        }

        let kind = infer::get(&buffer[..bytes_read]);
        Ok(matches!(
            kind.map(|k| k.mime_type()),
            Some("image/jpeg") | Some("image/png")
        ))
    }
}

impl Default for ImageScanner {
    fn default() -> Self {
        Self::new()
    }
}
