//! Processing services

pub mod aggregator;
pub mod exiftool;
pub mod job_manager;
pub mod pipeline;
pub mod scanner;

pub use exiftool::{ExifToolWriter, MetadataWriter};
pub use job_manager::{JobError, JobManager};
pub use pipeline::ImagePipeline;
pub use scanner::{ImageScanner, ScanError};
