//! Configuration loading
//!
//! Resolution priority for every setting:
//! 1. Environment variable (`AUTOTAG_*`, highest priority)
//! 2. TOML configuration file
//! 3. Compiled default
//!
//! The configuration surface is consumed, not owned, by the processing core:
//! values are read once at startup and treated as fixed for the duration of
//! a job.

use crate::error::{Error, Result};
use crate::types::TagMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Full service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    pub service: ServiceSection,
    pub tagging: TaggingSection,
    pub writer: WriterSection,
    pub classifiers: ClassifierSection,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    pub host: String,
    pub port: u16,
}

/// Tag aggregation and commit settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingSection {
    /// Tag mode used when a request does not specify one
    pub default_tag_mode: TagMode,
    /// Minimum classifier confidence, in percent, for a tag candidate to
    /// survive aggregation. Inclusive boundary.
    pub min_confidence_percent: f64,
    /// Base-name suffix used by `SaveMode::Suffix`
    pub output_suffix: String,
}

/// External metadata writer (ExifTool) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterSection {
    /// ExifTool executable (name on PATH or absolute path)
    pub exiftool_path: String,
    /// Per-invocation timeout in seconds
    pub timeout_seconds: u64,
}

/// External classifier sidecar settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    /// Directory holding model artifacts, passed through to the sidecars
    pub models_dir: PathBuf,
    /// Command launching the scene/room/clothing classifier sidecar
    pub scene_command: String,
    /// Command launching the person detector sidecar
    pub person_command: String,
    /// Minimum detected-person bounding-box height, in pixels, for a person
    /// to count toward solo/group
    pub min_person_height: u32,
    /// Per-classifier-call timeout in seconds
    pub timeout_seconds: u64,
    /// GPU enable flag, passed through to the sidecars
    pub use_gpu: bool,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for TaggingSection {
    fn default() -> Self {
        Self {
            default_tag_mode: TagMode::Append,
            min_confidence_percent: 80.0,
            output_suffix: "_tagged".to_string(),
        }
    }
}

impl Default for WriterSection {
    fn default() -> Self {
        Self {
            exiftool_path: "exiftool".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("/var/lib/autotag/models"),
            scene_command: "autotag-scene-classifier".to_string(),
            person_command: "autotag-person-detector".to_string(),
            min_person_height: 40,
            timeout_seconds: 60,
            use_gpu: true,
        }
    }
}

impl ServiceConfig {
    /// Load configuration with env > file > defaults priority.
    ///
    /// `explicit_path` (e.g. from a `--config` flag) takes precedence over
    /// the platform config-file lookup. A missing file is not an error; a
    /// malformed one is.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::locate_config_file(explicit_path) {
            Some(path) => {
                let content = std::fs::read_to_string(&path)?;
                toml::from_str(&content).map_err(|e| {
                    Error::Config(format!("Parse {} failed: {}", path.display(), e))
                })?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Find the config file: explicit path, then `~/.config/autotag/config.toml`,
    /// then `/etc/autotag/config.toml` on Unix.
    fn locate_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit_path {
            return Some(path.to_path_buf());
        }

        if let Some(user_config) = dirs::config_dir().map(|d| d.join("autotag").join("config.toml"))
        {
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/autotag/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Overlay `AUTOTAG_*` environment variables onto the loaded values.
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("AUTOTAG_HOST") {
            self.service.host = host;
        }
        if let Some(port) = env_parse::<u16>("AUTOTAG_PORT") {
            self.service.port = port;
        }
        if let Ok(mode) = std::env::var("AUTOTAG_TAG_MODE") {
            match mode.parse() {
                Ok(mode) => self.tagging.default_tag_mode = mode,
                Err(e) => warn!("Ignoring AUTOTAG_TAG_MODE: {}", e),
            }
        }
        if let Some(pct) = env_parse::<f64>("AUTOTAG_MIN_CONFIDENCE") {
            self.tagging.min_confidence_percent = pct;
        }
        if let Some(timeout) = env_parse::<u64>("AUTOTAG_EXIFTOOL_TIMEOUT") {
            self.writer.timeout_seconds = timeout;
        }
        if let Ok(dir) = std::env::var("AUTOTAG_MODELS_DIR") {
            self.classifiers.models_dir = PathBuf::from(dir);
        }
        if let Some(use_gpu) = env_parse_bool("AUTOTAG_USE_GPU") {
            self.classifiers.use_gpu = use_gpu;
        }
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.tagging.min_confidence_percent) {
            return Err(Error::Config(format!(
                "min_confidence_percent out of range [0,100]: {}",
                self.tagging.min_confidence_percent
            )));
        }
        if self.writer.timeout_seconds == 0 || self.classifiers.timeout_seconds == 0 {
            return Err(Error::Config("timeout_seconds must be nonzero".to_string()));
        }
        Ok(())
    }
}

/// Parse an env var, warning (not failing) on malformed values.
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring {}: could not parse {:?}", name, raw);
                None
            }
        },
        Err(_) => None,
    }
}

/// Accepts the usual truthy/falsy spellings.
fn env_parse_bool(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "y" => Some(true),
        "false" | "no" | "0" | "n" => Some(false),
        other => {
            warn!("Ignoring {}: could not parse {:?} as bool", name, other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.service.port, 8000);
        assert_eq!(config.tagging.min_confidence_percent, 80.0);
        assert_eq!(config.tagging.default_tag_mode, TagMode::Append);
        assert_eq!(config.writer.exiftool_path, "exiftool");
        assert_eq!(config.classifiers.min_person_height, 40);
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[service]
port = 9100

[tagging]
min_confidence_percent = 65.0
default_tag_mode = "replace"
"#
        )
        .unwrap();

        let config = ServiceConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.service.port, 9100);
        assert_eq!(config.tagging.min_confidence_percent, 65.0);
        assert_eq!(config.tagging.default_tag_mode, TagMode::Replace);
        // Untouched sections keep defaults
        assert_eq!(config.writer.timeout_seconds, 30);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[service]\nport = 9100").unwrap();

        std::env::set_var("AUTOTAG_PORT", "9200");
        std::env::set_var("AUTOTAG_USE_GPU", "no");
        let config = ServiceConfig::load(Some(file.path())).unwrap();
        std::env::remove_var("AUTOTAG_PORT");
        std::env::remove_var("AUTOTAG_USE_GPU");

        assert_eq!(config.service.port, 9200);
        assert!(!config.classifiers.use_gpu);
    }

    #[test]
    #[serial]
    fn test_out_of_range_confidence_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tagging]\nmin_confidence_percent = 140.0").unwrap();

        let result = ServiceConfig::load(Some(file.path()));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
