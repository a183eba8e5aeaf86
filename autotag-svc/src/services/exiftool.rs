//! Metadata writer adapter (ExifTool)
//!
//! Commits a tag set into image metadata through the external ExifTool
//! process. Tags land in the `XMP-digiKam:TagsList` field, which photo
//! managers read natively.
//!
//! Append mode implements union semantics by reading the file's existing
//! tags first and writing only the set difference, so repeated runs never
//! duplicate entries. ExifTool itself either rewrites the file completely or
//! leaves it untouched, which gives the caller the all-or-nothing guarantee.

use crate::vocab::TagSet;
use autotag_common::{SaveMode, TagMode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Target metadata field for all managed tags
const TAGS_FIELD: &str = "XMP-digiKam:TagsList";

/// Metadata writer errors
#[derive(Debug, Error)]
pub enum WriteError {
    /// Writer process could not be launched
    #[error("Writer launch failed: {0}")]
    Launch(String),

    /// Writer call exceeded its timeout
    #[error("Writer timed out after {0}s")]
    Timeout(u64),

    /// Writer exited nonzero
    #[error("Writer failed: {0}")]
    Tool(String),

    /// Writer output was malformed (existing-tag read)
    #[error("Writer output parse error: {0}")]
    Parse(String),

    /// Target path not writable or other I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of one successful metadata commit
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    /// Path the tags were written to (differs from the input in suffix mode)
    pub output_path: PathBuf,
    /// Number of tags written in this call
    pub tags_written: usize,
}

/// Uniform interface to the external metadata-writing collaborator.
#[async_trait::async_trait]
pub trait MetadataWriter: Send + Sync {
    /// Commit `tags` to `path` under the given modes.
    ///
    /// # Errors
    /// Returns `WriteError` if the external writer errors, times out, or the
    /// target is not writable. A failed write leaves the file's existing
    /// metadata unchanged.
    async fn write(
        &self,
        path: &Path,
        tags: &TagSet,
        tag_mode: TagMode,
        save_mode: SaveMode,
    ) -> Result<WriteOutcome, WriteError>;
}

/// ExifTool-backed metadata writer
pub struct ExifToolWriter {
    exiftool_path: String,
    timeout_seconds: u64,
    output_suffix: String,
}

impl ExifToolWriter {
    pub fn new(exiftool_path: &str, timeout_seconds: u64, output_suffix: &str) -> Self {
        Self {
            exiftool_path: exiftool_path.to_string(),
            timeout_seconds,
            output_suffix: output_suffix.to_string(),
        }
    }

    /// Read the managed tag field from a file (`exiftool -j`).
    async fn read_tags(&self, path: &Path) -> Result<Vec<String>, WriteError> {
        let output = self
            .run(&[
                "-j".to_string(),
                format!("-{}", TAGS_FIELD),
                path.display().to_string(),
            ])
            .await?;

        parse_tag_list(&output)
    }

    async fn run(&self, args: &[String]) -> Result<Vec<u8>, WriteError> {
        let mut cmd = Command::new(&self.exiftool_path);
        cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = tokio::time::timeout(Duration::from_secs(self.timeout_seconds), cmd.output())
            .await
            .map_err(|_| WriteError::Timeout(self.timeout_seconds))?
            .map_err(|e| WriteError::Launch(format!("{}: {}", self.exiftool_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WriteError::Tool(stderr.trim().to_string()));
        }

        Ok(output.stdout)
    }
}

#[async_trait::async_trait]
impl MetadataWriter for ExifToolWriter {
    async fn write(
        &self,
        path: &Path,
        tags: &TagSet,
        tag_mode: TagMode,
        save_mode: SaveMode,
    ) -> Result<WriteOutcome, WriteError> {
        let existing = match tag_mode {
            TagMode::Replace => Vec::new(),
            TagMode::Append => self.read_tags(path).await?,
        };
        let to_write = select_tags(tags, &existing, tag_mode);

        let output_path = match save_mode {
            SaveMode::Replace => path.to_path_buf(),
            SaveMode::Suffix => suffixed_path(path, &self.output_suffix),
        };

        match plan_write(path, &output_path, &to_write, tag_mode, save_mode) {
            WriteAction::Skip => {
                debug!(path = %path.display(), "All tags already present, skipping write");
                Ok(WriteOutcome {
                    output_path,
                    tags_written: 0,
                })
            }
            WriteAction::CopyOnly => {
                // The source already carries every tag; ExifTool refuses a
                // call with no assignments, so produce the copy directly
                debug!(
                    path = %path.display(),
                    output = %output_path.display(),
                    "All tags already present, copying without ExifTool"
                );
                tokio::fs::copy(path, &output_path).await?;
                Ok(WriteOutcome {
                    output_path,
                    tags_written: 0,
                })
            }
            WriteAction::Invoke(args) => {
                let tags_written = to_write.len();

                debug!(
                    path = %path.display(),
                    output = %output_path.display(),
                    tags = tags_written,
                    mode = %tag_mode,
                    save = %save_mode,
                    "Writing tags via ExifTool"
                );

                self.run(&args).await?;

                Ok(WriteOutcome {
                    output_path,
                    tags_written,
                })
            }
        }
    }
}

/// What one write call actually has to do.
#[derive(Debug, PartialEq)]
enum WriteAction {
    /// Append with nothing new, writing in place: leave the file alone
    Skip,
    /// Append with nothing new, suffix save: only the copy is needed
    CopyOnly,
    /// Run ExifTool with the assembled arguments
    Invoke(Vec<String>),
}

/// Decide the action for one write.
///
/// An append that adds nothing must never reach ExifTool: with zero tag
/// assignments the tool reports "Nothing to do" and exits nonzero, which
/// would spuriously fail the file. A replace with an empty set still invokes
/// the tool, since it clears the managed field.
fn plan_write(
    source: &Path,
    output: &Path,
    to_write: &[String],
    tag_mode: TagMode,
    save_mode: SaveMode,
) -> WriteAction {
    if to_write.is_empty() && tag_mode == TagMode::Append {
        return match save_mode {
            SaveMode::Replace => WriteAction::Skip,
            SaveMode::Suffix => WriteAction::CopyOnly,
        };
    }

    WriteAction::Invoke(build_write_args(
        source, output, to_write, tag_mode, save_mode,
    ))
}

/// Tags that actually go on the command line for one write.
///
/// In append mode only tags not already present are emitted (dedup by full
/// qualified string); the existing list is left alone, so the on-file result
/// is the union. In replace mode the new set goes out wholesale.
fn select_tags(tags: &TagSet, existing: &[String], tag_mode: TagMode) -> Vec<String> {
    match tag_mode {
        TagMode::Replace => tags.qualified(),
        TagMode::Append => tags
            .qualified()
            .into_iter()
            .filter(|t| !existing.iter().any(|e| e == t))
            .collect(),
    }
}

/// Output path for suffix save mode: `photo.jpg` → `photo_tagged.jpg`.
fn suffixed_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let file_name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };

    path.with_file_name(file_name)
}

/// Assemble the ExifTool argument list for one write.
fn build_write_args(
    source: &Path,
    output: &Path,
    tags: &[String],
    tag_mode: TagMode,
    save_mode: SaveMode,
) -> Vec<String> {
    let mut args = Vec::new();

    match tag_mode {
        // Repeated plain assignments replace the list wholesale
        TagMode::Replace => {
            if tags.is_empty() {
                args.push(format!("-{}=", TAGS_FIELD));
            } else {
                for tag in tags {
                    args.push(format!("-{}={}", TAGS_FIELD, tag));
                }
            }
        }
        // `+=` adds to the existing list; dedup already happened upstream
        TagMode::Append => {
            for tag in tags {
                args.push(format!("-{}+={}", TAGS_FIELD, tag));
            }
        }
    }

    match save_mode {
        SaveMode::Replace => args.push("-overwrite_original".to_string()),
        SaveMode::Suffix => {
            args.push("-o".to_string());
            args.push(output.display().to_string());
        }
    }

    args.push(source.display().to_string());
    args
}

/// Parse `exiftool -j` output for the managed tag field.
///
/// ExifTool emits a single-item string instead of a one-element array, so
/// both shapes are accepted.
fn parse_tag_list(json: &[u8]) -> Result<Vec<String>, WriteError> {
    #[derive(Debug, Deserialize)]
    struct Entry {
        #[serde(rename = "TagsList")]
        tags_list: Option<serde_json::Value>,
    }

    let entries: Vec<Entry> = serde_json::from_slice(json)
        .map_err(|e| WriteError::Parse(format!("exiftool JSON: {}", e)))?;

    let Some(value) = entries.into_iter().next().and_then(|e| e.tags_list) else {
        return Ok(Vec::new());
    };

    match value {
        serde_json::Value::String(s) => Ok(vec![s]),
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()),
        other => Err(WriteError::Parse(format!(
            "unexpected TagsList shape: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::{Category, Tag};

    fn tag_set(tags: &[(Category, &str)]) -> TagSet {
        let mut set = TagSet::new();
        for (category, value) in tags {
            set.push(Tag::new(*category, value).unwrap());
        }
        set
    }

    #[test]
    fn test_append_preserves_existing_tags() {
        // File already carries people/solo; appending scene/indoor must add
        // only the new tag, leaving the union on the file
        let tags = tag_set(&[(Category::Scene, "indoor")]);
        let existing = vec!["people/solo".to_string()];

        let to_write = select_tags(&tags, &existing, TagMode::Append);
        assert_eq!(to_write, vec!["scene/indoor".to_string()]);
    }

    #[test]
    fn test_append_skips_tags_already_present() {
        let tags = tag_set(&[(Category::Scene, "indoor"), (Category::People, "solo")]);
        let existing = vec!["scene/indoor".to_string()];

        let to_write = select_tags(&tags, &existing, TagMode::Append);
        assert_eq!(to_write, vec!["people/solo".to_string()]);
    }

    #[test]
    fn test_replace_ignores_existing_tags() {
        let tags = tag_set(&[(Category::Scene, "indoor")]);
        let existing = vec!["people/solo".to_string()];

        let to_write = select_tags(&tags, &existing, TagMode::Replace);
        assert_eq!(to_write, vec!["scene/indoor".to_string()]);
    }

    #[test]
    fn test_empty_append_in_place_skips_exiftool() {
        let action = plan_write(
            Path::new("/data/a.jpg"),
            Path::new("/data/a.jpg"),
            &[],
            TagMode::Append,
            SaveMode::Replace,
        );
        assert_eq!(action, WriteAction::Skip);
    }

    #[test]
    fn test_empty_append_with_suffix_copies_without_exiftool() {
        // No assignments to pass, but the suffixed copy is still owed
        let action = plan_write(
            Path::new("/data/a.jpg"),
            Path::new("/data/a_tagged.jpg"),
            &[],
            TagMode::Append,
            SaveMode::Suffix,
        );
        assert_eq!(action, WriteAction::CopyOnly);
    }

    #[test]
    fn test_empty_replace_still_invokes_to_clear_field() {
        let action = plan_write(
            Path::new("/data/a.jpg"),
            Path::new("/data/a.jpg"),
            &[],
            TagMode::Replace,
            SaveMode::Replace,
        );
        match action {
            WriteAction::Invoke(args) => {
                assert!(args.contains(&"-XMP-digiKam:TagsList=".to_string()));
            }
            other => panic!("expected Invoke, got {:?}", other),
        }
    }

    #[test]
    fn test_suffixed_path() {
        assert_eq!(
            suffixed_path(Path::new("/data/photo.jpg"), "_tagged"),
            PathBuf::from("/data/photo_tagged.jpg")
        );
        assert_eq!(
            suffixed_path(Path::new("noext"), "_tagged"),
            PathBuf::from("noext_tagged")
        );
    }

    #[test]
    fn test_replace_mode_args_assign_list() {
        let tags = vec!["scene/indoor".to_string(), "people/solo".to_string()];
        let args = build_write_args(
            Path::new("/data/a.jpg"),
            Path::new("/data/a.jpg"),
            &tags,
            TagMode::Replace,
            SaveMode::Replace,
        );

        assert_eq!(
            args,
            vec![
                "-XMP-digiKam:TagsList=scene/indoor",
                "-XMP-digiKam:TagsList=people/solo",
                "-overwrite_original",
                "/data/a.jpg",
            ]
        );
    }

    #[test]
    fn test_append_mode_args_add_to_list() {
        let tags = vec!["scene/indoor".to_string()];
        let args = build_write_args(
            Path::new("/data/a.jpg"),
            Path::new("/data/a_tagged.jpg"),
            &tags,
            TagMode::Append,
            SaveMode::Suffix,
        );

        assert_eq!(
            args,
            vec![
                "-XMP-digiKam:TagsList+=scene/indoor",
                "-o",
                "/data/a_tagged.jpg",
                "/data/a.jpg",
            ]
        );
    }

    #[test]
    fn test_parse_tag_list_shapes() {
        // Array shape
        let json = br#"[{"SourceFile": "a.jpg", "TagsList": ["people/solo", "scene/indoor"]}]"#;
        assert_eq!(
            parse_tag_list(json).unwrap(),
            vec!["people/solo".to_string(), "scene/indoor".to_string()]
        );

        // Single string shape
        let json = br#"[{"SourceFile": "a.jpg", "TagsList": "people/solo"}]"#;
        assert_eq!(parse_tag_list(json).unwrap(), vec!["people/solo".to_string()]);

        // Field absent entirely
        let json = br#"[{"SourceFile": "a.jpg"}]"#;
        assert!(parse_tag_list(json).unwrap().is_empty());
    }

    #[test]
    fn test_parse_tag_list_rejects_garbage() {
        assert!(matches!(
            parse_tag_list(b"not json"),
            Err(WriteError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_exiftool_is_launch_error() {
        let writer = ExifToolWriter::new("/nonexistent/exiftool", 5, "_tagged");
        let tags = tag_set(&[(Category::Scene, "indoor")]);

        let result = writer
            .write(
                Path::new("/tmp/img.jpg"),
                &tags,
                TagMode::Replace,
                SaveMode::Replace,
            )
            .await;
        assert!(matches!(result, Err(WriteError::Launch(_))));
    }
}
