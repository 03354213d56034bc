//! Traffic-zone heatmap classification
//!
//! Pure per-zone mapping from traffic score to a performance tier and the
//! color the store map renders it with.

use crate::domain::report::{HeatmapReport, HeatmapZone, Performance};
use crate::domain::types::TrafficZoneRow;

/// Lowest score (inclusive) rated high
pub const HIGH_THRESHOLD: f64 = 0.70;
/// Lowest score (inclusive) rated average
pub const AVERAGE_THRESHOLD: f64 = 0.40;

#[inline]
pub fn classify_score(traffic_score: f64) -> Performance {
    if traffic_score >= HIGH_THRESHOLD {
        Performance::High
    } else if traffic_score >= AVERAGE_THRESHOLD {
        Performance::Average
    } else {
        Performance::Low
    }
}

/// Classify every zone, preserving input order
pub fn heatmap_analysis(zones: &[TrafficZoneRow]) -> HeatmapReport {
    let zones = zones
        .iter()
        .map(|zone| {
            let performance = classify_score(zone.traffic_score);
            HeatmapZone {
                zone_name: zone.zone_name.clone(),
                x: zone.x,
                y: zone.y,
                traffic_score: zone.traffic_score,
                performance,
                color: performance.color(),
            }
        })
        .collect();

    HeatmapReport { zones }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::ZoneColor;

    fn zone(name: &str, score: f64) -> TrafficZoneRow {
        TrafficZoneRow { zone_name: name.to_string(), x: 1, y: 2, traffic_score: score }
    }

    #[test]
    fn test_boundaries_are_inclusive_low() {
        assert_eq!(classify_score(0.70), Performance::High);
        assert_eq!(classify_score(0.6999), Performance::Average);
        assert_eq!(classify_score(0.40), Performance::Average);
        assert_eq!(classify_score(0.3999), Performance::Low);
        assert_eq!(classify_score(1.0), Performance::High);
        assert_eq!(classify_score(0.0), Performance::Low);
    }

    #[test]
    fn test_colors_follow_performance() {
        let report = heatmap_analysis(&[zone("Entrance", 0.9), zone("Aisle 4", 0.5), zone("Back", 0.1)]);

        let colors: Vec<ZoneColor> = report.zones.iter().map(|z| z.color).collect();
        assert_eq!(colors, vec![ZoneColor::Blue, ZoneColor::Orange, ZoneColor::Red]);
    }

    #[test]
    fn test_order_and_fields_preserved() {
        let input = vec![zone("B", 0.123456789), zone("A", 0.75)];
        let report = heatmap_analysis(&input);

        assert_eq!(report.zones.len(), 2);
        assert_eq!(report.zones[0].zone_name, "B");
        assert_eq!(report.zones[0].traffic_score, 0.123456789);
        assert_eq!((report.zones[0].x, report.zones[0].y), (1, 2));
        assert_eq!(report.zones[1].zone_name, "A");
        assert_eq!(report.zones[1].performance, Performance::High);
    }

    #[test]
    fn test_out_of_range_scores_still_map() {
        assert_eq!(classify_score(1.7), Performance::High);
        assert_eq!(classify_score(-0.2), Performance::Low);
    }

    #[test]
    fn test_empty_input() {
        assert!(heatmap_analysis(&[]).zones.is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(heatmap_analysis(&[zone("Entrance", 0.7)])).unwrap();
        let first = &json["zones"][0];
        assert_eq!(first["zone_name"], "Entrance");
        assert_eq!(first["performance"], "high");
        assert_eq!(first["color"], "blue");
        assert_eq!(first["traffic_score"], 0.7);
    }
}
