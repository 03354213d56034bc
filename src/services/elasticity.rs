//! Shelf-space elasticity recommendation
//!
//! Redistributes the store's existing shelf footprint across categories in
//! proportion to each category's revenue share. Total space is never grown
//! or shrunk, only reallocated.

use crate::domain::report::{
    round_to, CategoryMeters, ElasticityChart, ElasticityReport, ElasticityRow,
};
use crate::domain::types::{CategoryRevenueRow, CategorySpaceRow};
use rustc_hash::FxHashMap;

const SHARE_PLACES: i32 = 6;
const METER_PLACES: i32 = 4;

/// Compare current vs. revenue-proportional shelf meters per category
///
/// Only categories present in `revenue_rows` produce output rows (in input
/// order). Space held by categories without sales still counts toward the
/// total footprint being redistributed.
pub fn space_elasticity(
    revenue_rows: &[CategoryRevenueRow],
    space_rows: &[CategorySpaceRow],
) -> ElasticityReport {
    let total_revenue: f64 = revenue_rows.iter().map(|r| r.revenue).sum();

    let mut space_by_category: FxHashMap<&str, f64> = FxHashMap::default();
    for space in space_rows {
        *space_by_category.entry(space.category.as_str()).or_insert(0.0) += space.meters;
    }
    let total_current_meters: f64 = space_by_category.values().sum();

    let mut table = Vec::with_capacity(revenue_rows.len());
    let mut current = Vec::with_capacity(revenue_rows.len());
    let mut recommended = Vec::with_capacity(revenue_rows.len());

    for row in revenue_rows {
        let sales_pct = if total_revenue != 0.0 { row.revenue / total_revenue } else { 0.0 };
        let current_meters = space_by_category.get(row.category.as_str()).copied().unwrap_or(0.0);
        let recommended_meters =
            if total_current_meters != 0.0 { total_current_meters * sales_pct } else { 0.0 };

        let current_meters = round_to(current_meters, METER_PLACES);
        let recommended_meters = round_to(recommended_meters, METER_PLACES);

        table.push(ElasticityRow {
            category: row.category.clone(),
            sales_pct: round_to(sales_pct, SHARE_PLACES),
            current_meters,
            recommended_meters,
        });
        current.push(CategoryMeters { category: row.category.clone(), meters: current_meters });
        recommended.push(CategoryMeters { category: row.category.clone(), meters: recommended_meters });
    }

    ElasticityReport { table, chart: ElasticityChart { current, recommended } }
}
