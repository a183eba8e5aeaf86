//! HTTP API handlers

pub mod health;
pub mod process;
pub mod status;

pub use health::health_routes;
pub use process::process_routes;
pub use status::status_routes;
