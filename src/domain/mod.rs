//! Domain models - aggregated rows, store records and report shapes
//!
//! This module contains the canonical data types used throughout the system:
//! - `types` - aggregated input rows (`RevenueRow`, `TrafficZoneRow`, ...) and filters
//! - `records` - raw store records loaded into a `Dataset`
//! - `report` - `TailReport`, `ElasticityReport`, `HeatmapReport`

pub mod records;
pub mod report;
pub mod types;

// Re-export commonly used types at module level
pub use records::Dataset;
pub use report::{ElasticityReport, HeatmapReport, TailReport};
pub use types::{
    AnalysisKind, CategoryId, CategoryRevenueRow, CategorySpaceRow, DateRange, RevenueRow, StoreId,
    TailFilter, TrafficZoneRow,
};
