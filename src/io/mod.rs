//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `dataset` - Store dataset loading (JSON)
//! - `http` - Analytics HTTP API with health and Prometheus endpoints
//! - `results` - Analysis result log (JSONL format)

pub mod dataset;
pub mod http;
pub mod results;

// Re-export commonly used types
pub use dataset::load_dataset;
pub use http::{start_http_server, ApiState};
pub use results::{AnalyticsResult, ResultLog};
