//! Shared API types
//!
//! Request-level modes accepted by every processing entry point. Both are
//! part of the configuration surface (a default tag mode is configurable)
//! and of the HTTP API, so they live in the common crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How newly produced tags combine with tags already present in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TagMode {
    /// Union of existing and new tags, deduplicated by full tag string
    #[default]
    Append,
    /// New tag set fully replaces previously written tags
    Replace,
}

/// How the tagged output file is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SaveMode {
    /// Write tags into the original file in place
    #[default]
    Replace,
    /// Write a new file next to the original with a suffixed base name
    Suffix,
}

impl TagMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagMode::Append => "append",
            TagMode::Replace => "replace",
        }
    }
}

impl SaveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveMode::Replace => "replace",
            SaveMode::Suffix => "suffix",
        }
    }
}

impl fmt::Display for TagMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "append" => Ok(TagMode::Append),
            "replace" | "overwrite" => Ok(TagMode::Replace),
            other => Err(format!("Unknown tag mode: {}", other)),
        }
    }
}

impl FromStr for SaveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "replace" => Ok(SaveMode::Replace),
            "suffix" => Ok(SaveMode::Suffix),
            other => Err(format!("Unknown save mode: {}", other)),
        }
    }
}
