//! Report types returned by the three analyses
//!
//! Field names and nesting form the JSON response contract, so renames here
//! are breaking changes for any dashboard reading them.

use serde::Serialize;

/// Round to a fixed number of decimal places (half away from zero)
#[inline]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Revenue tier of a SKU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Core,
    Average,
    Tail,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TailSummary {
    pub total_skus: usize,
    pub core_pct: f64,
    pub average_pct: f64,
    pub tail_pct: f64,
    pub tail_sales_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TailRow {
    pub sku: String,
    pub product_name: String,
    pub category: String,
    pub sales_pct: f64,
    pub classification: Classification,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TailChart {
    pub core_sales_share: f64,
    pub average_sales_share: f64,
    pub tail_sales_share: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TailReport {
    pub summary: TailSummary,
    pub table: Vec<TailRow>,
    pub chart: TailChart,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElasticityRow {
    pub category: String,
    pub sales_pct: f64,
    pub current_meters: f64,
    pub recommended_meters: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMeters {
    pub category: String,
    pub meters: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ElasticityChart {
    pub current: Vec<CategoryMeters>,
    pub recommended: Vec<CategoryMeters>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ElasticityReport {
    pub table: Vec<ElasticityRow>,
    pub chart: ElasticityChart,
}

/// Zone performance tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Performance {
    High,
    Average,
    Low,
}

impl Performance {
    /// Display color used by the heatmap view
    #[inline]
    pub fn color(&self) -> ZoneColor {
        match self {
            Performance::High => ZoneColor::Blue,
            Performance::Average => ZoneColor::Orange,
            Performance::Low => ZoneColor::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneColor {
    Blue,
    Orange,
    Red,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapZone {
    pub zone_name: String,
    pub x: i32,
    pub y: i32,
    pub traffic_score: f64,
    pub performance: Performance,
    pub color: ZoneColor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeatmapReport {
    pub zones: Vec<HeatmapZone>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.1234567, 6), 0.123457);
        assert_eq!(round_to(3.33333, 4), 3.3333);
        assert_eq!(round_to(0.0, 6), 0.0);
        assert_eq!(round_to(1.0, 6), 1.0);
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Classification::Average).unwrap(), r#""average""#);
        assert_eq!(serde_json::to_string(&Performance::High).unwrap(), r#""high""#);
        assert_eq!(serde_json::to_string(&ZoneColor::Orange).unwrap(), r#""orange""#);
    }

    #[test]
    fn test_empty_tail_report_shape() {
        let json = serde_json::to_value(TailReport::default()).unwrap();
        assert_eq!(json["summary"]["total_skus"], 0);
        assert_eq!(json["summary"]["tail_sales_share"], 0.0);
        assert_eq!(json["table"].as_array().unwrap().len(), 0);
        assert_eq!(json["chart"]["core_sales_share"], 0.0);
    }
}
