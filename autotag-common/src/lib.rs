//! # AUTOTAG Common Library
//!
//! Shared code for the AUTOTAG service:
//! - Error types
//! - Configuration loading (TOML file + environment overrides)
//! - Shared API types (tag mode, save mode)
//! - Human-readable time formatting for status output

pub mod config;
pub mod error;
pub mod human_time;
pub mod types;

pub use config::ServiceConfig;
pub use error::{Error, Result};
pub use types::{SaveMode, TagMode};
