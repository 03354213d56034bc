//! Services - aggregation, classification and orchestration
//!
//! This module contains the analytics logic:
//! - `tail` - SKU tail (ABC) classification
//! - `elasticity` - Shelf-space reallocation by revenue share
//! - `heatmap` - Traffic-zone performance tiers
//! - `aggregator` - Row aggregation seam (`AnalyticsSource`) and dataset implementation
//! - `analytics` - Request-level orchestration with metrics and result logging

pub mod aggregator;
pub mod analytics;
pub mod elasticity;
pub mod heatmap;
pub mod tail;

// Re-export commonly used types
pub use aggregator::{AnalyticsSource, DatasetAggregator};
pub use analytics::AnalyticsService;
pub use elasticity::space_elasticity;
pub use heatmap::heatmap_analysis;
pub use tail::tail_analysis;
