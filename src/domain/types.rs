//! Shared types for ShelfIQ analytics
//!
//! Aggregated input rows consumed by the classifiers, plus the filter
//! parameters used to produce them.

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Newtype wrapper for store IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct StoreId(pub i64);

impl std::fmt::Display for StoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype wrapper for category IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct CategoryId(pub i64);

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Revenue of one product within the filtered window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRow {
    pub sku: String,
    pub product_name: String,
    pub category: String,
    pub revenue: f64,
}

/// Revenue summed across all products of a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRevenueRow {
    pub category: String,
    pub revenue: f64,
}

/// Shelf meters summed across all allocations of a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpaceRow {
    pub category: String,
    pub meters: f64,
}

/// A traffic zone with its grid position and score (usually 0..=1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficZoneRow {
    pub zone_name: String,
    pub x: i32,
    pub y: i32,
    pub traffic_score: f64,
}

/// Analysis kinds, used for result records and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Tail,
    Space,
    Heatmap,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 3] = [AnalysisKind::Tail, AnalysisKind::Space, AnalysisKind::Heatmap];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Tail => "tail",
            AnalysisKind::Space => "space",
            AnalysisKind::Heatmap => "heatmap",
        }
    }

    /// Stable index for per-kind counter arrays
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            AnalysisKind::Tail => 0,
            AnalysisKind::Space => 1,
            AnalysisKind::Heatmap => 2,
        }
    }
}

impl std::str::FromStr for AnalysisKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "tail" => AnalysisKind::Tail,
            "space" => AnalysisKind::Space,
            "heatmap" => AnalysisKind::Heatmap,
            other => bail!("unknown analysis kind '{other}'"),
        })
    }
}

/// Inclusive date window; either bound may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self { start, end }
    }

    /// Parse optional textual bounds (see [`parse_datetime`])
    pub fn parse(start: Option<&str>, end: Option<&str>) -> anyhow::Result<Self> {
        let start = start
            .map(|s| parse_datetime(s).context("invalid date_start"))
            .transpose()?;
        let end = end
            .map(|s| parse_datetime(s).context("invalid date_end"))
            .transpose()?;
        Ok(Self { start, end })
    }

    #[inline]
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }
}

/// Parse a timestamp in one of the accepted forms
///
/// RFC 3339 values are normalised to UTC and stripped of their offset.
/// A bare date means midnight.
pub fn parse_datetime(value: &str) -> anyhow::Result<NaiveDateTime> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }

    bail!("unrecognised timestamp '{value}'")
}

/// Filter parameters for the per-product revenue aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct TailFilter {
    pub store_id: StoreId,
    pub date_range: DateRange,
    pub category_id: Option<CategoryId>,
    pub search: Option<String>,
}

impl TailFilter {
    pub fn for_store(store_id: StoreId) -> Self {
        Self { store_id, date_range: DateRange::default(), category_id: None, search: None }
    }

    /// Search term, treating an empty string as absent
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }
}
