//! SKU tail classification (ABC / Pareto segmentation)
//!
//! Ranks products by revenue and assigns each one a tier from the cumulative
//! revenue share reached after adding it.
//!
//! Key behaviors:
//! - Share ≤ 70% is core, ≤ 90% is average, anything beyond is tail
//! - Equal revenues are ordered by SKU so output is reproducible
//! - Zero total revenue yields an all-zero report with an empty table

use crate::domain::report::{round_to, Classification, TailChart, TailReport, TailRow, TailSummary};
use crate::domain::types::RevenueRow;
use std::cmp::Ordering;

/// Upper cumulative share (inclusive) of the core tier
pub const CORE_THRESHOLD: f64 = 0.70;
/// Upper cumulative share (inclusive) of the average tier
pub const AVERAGE_THRESHOLD: f64 = 0.90;

const SHARE_PLACES: i32 = 6;

/// Tier for a cumulative revenue share
#[inline]
pub fn classify_share(cumulative_share: f64) -> Classification {
    if cumulative_share <= CORE_THRESHOLD {
        Classification::Core
    } else if cumulative_share <= AVERAGE_THRESHOLD {
        Classification::Average
    } else {
        Classification::Tail
    }
}

/// Revenue descending, then SKU, name and category ascending
fn rank_order(a: &RevenueRow, b: &RevenueRow) -> Ordering {
    b.revenue
        .total_cmp(&a.revenue)
        .then_with(|| a.sku.cmp(&b.sku))
        .then_with(|| a.product_name.cmp(&b.product_name))
        .then_with(|| a.category.cmp(&b.category))
}

/// Per-tier SKU count and revenue
#[derive(Debug, Default, Clone, Copy)]
struct TierTotals {
    count: usize,
    revenue: f64,
}

impl TierTotals {
    #[inline]
    fn add(&mut self, revenue: f64) {
        self.count += 1;
        self.revenue += revenue;
    }
}

/// Classify products into core/average/tail tiers by cumulative revenue share
pub fn tail_analysis(rows: &[RevenueRow]) -> TailReport {
    let total_revenue: f64 = rows.iter().map(|r| r.revenue).sum();
    let total_skus = rows.len();

    if total_revenue == 0.0 || total_skus == 0 {
        return TailReport::default();
    }

    let mut ranked: Vec<&RevenueRow> = rows.iter().collect();
    ranked.sort_by(|a, b| rank_order(a, b));

    let mut cumulative_revenue = 0.0;
    let mut core = TierTotals::default();
    let mut average = TierTotals::default();
    let mut tail = TierTotals::default();
    let mut table = Vec::with_capacity(total_skus);

    for row in ranked {
        cumulative_revenue += row.revenue;
        let classification = classify_share(cumulative_revenue / total_revenue);

        match classification {
            Classification::Core => core.add(row.revenue),
            Classification::Average => average.add(row.revenue),
            Classification::Tail => tail.add(row.revenue),
        }

        table.push(TailRow {
            sku: row.sku.clone(),
            product_name: row.product_name.clone(),
            category: row.category.clone(),
            sales_pct: round_to(row.revenue / total_revenue, SHARE_PLACES),
            classification,
        });
    }

    let count_share = |t: TierTotals| round_to(t.count as f64 / total_skus as f64, SHARE_PLACES);
    let revenue_share = |t: TierTotals| round_to(t.revenue / total_revenue, SHARE_PLACES);

    TailReport {
        summary: TailSummary {
            total_skus,
            core_pct: count_share(core),
            average_pct: count_share(average),
            tail_pct: count_share(tail),
            tail_sales_share: revenue_share(tail),
        },
        table,
        chart: TailChart {
            core_sales_share: revenue_share(core),
            average_sales_share: revenue_share(average),
            tail_sales_share: revenue_share(tail),
        },
    }
}
