//! Row aggregation feeding the analyses
//!
//! [`AnalyticsSource`] is the seam between storage and the pure classifiers.
//! [`DatasetAggregator`] implements it over an in-memory [`Dataset`] with the
//! same join and filter rules the reports were designed against:
//! - sales join product and category; orphaned sales are skipped
//! - date bounds are inclusive and apply to sales only
//! - shelf space and traffic zones are scoped by store, never by date

use crate::domain::records::{Category, Dataset, Product};
use crate::domain::types::{
    CategoryId, CategoryRevenueRow, CategorySpaceRow, DateRange, RevenueRow, StoreId, TailFilter,
    TrafficZoneRow,
};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Supplies pre-aggregated rows for one store
pub trait AnalyticsSource: Send + Sync {
    /// Revenue per product within the filter, one row per product
    fn fetch_revenue_by_product(&self, filter: &TailFilter) -> anyhow::Result<Vec<RevenueRow>>;

    /// Revenue per category with sales, plus shelf meters per category
    fn fetch_revenue_and_space_by_category(
        &self,
        store_id: StoreId,
        date_range: &DateRange,
    ) -> anyhow::Result<(Vec<CategoryRevenueRow>, Vec<CategorySpaceRow>)>;

    /// Traffic zones of the store in stored order
    fn fetch_traffic_zones(&self, store_id: StoreId) -> anyhow::Result<Vec<TrafficZoneRow>>;
}

/// Aggregates rows from a shared, read-only dataset
pub struct DatasetAggregator {
    dataset: Arc<Dataset>,
}

impl DatasetAggregator {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    fn products_by_id(&self) -> FxHashMap<i64, &Product> {
        self.dataset.products.iter().map(|p| (p.id, p)).collect()
    }

    fn categories_by_id(&self) -> FxHashMap<CategoryId, &Category> {
        self.dataset.categories.iter().map(|c| (c.id, c)).collect()
    }
}

/// Case-insensitive substring match on product name or SKU
fn matches_search(product: &Product, needle_lower: &str) -> bool {
    product.name.to_lowercase().contains(needle_lower)
        || product.sku.to_lowercase().contains(needle_lower)
}

impl AnalyticsSource for DatasetAggregator {
    fn fetch_revenue_by_product(&self, filter: &TailFilter) -> anyhow::Result<Vec<RevenueRow>> {
        let products = self.products_by_id();
        let categories = self.categories_by_id();
        let search = filter.search_term().map(str::to_lowercase);

        // Keyed by product id so output order is stable
        let mut revenue_by_product: BTreeMap<i64, (&Product, &Category, f64)> = BTreeMap::new();
        let mut skipped = 0usize;

        for sale in &self.dataset.sales {
            if sale.store_id != filter.store_id || !filter.date_range.contains(sale.date) {
                continue;
            }
            let Some(&product) = products.get(&sale.product_id) else {
                skipped += 1;
                continue;
            };
            let Some(&category) = categories.get(&product.category_id) else {
                skipped += 1;
                continue;
            };
            if filter.category_id.is_some_and(|id| id != product.category_id) {
                continue;
            }
            if let Some(needle) = search.as_deref() {
                if !matches_search(product, needle) {
                    continue;
                }
            }

            revenue_by_product.entry(product.id).or_insert((product, category, 0.0)).2 +=
                sale.revenue;
        }

        debug!(
            store_id = %filter.store_id,
            products = revenue_by_product.len(),
            skipped_sales = skipped,
            "revenue_by_product_aggregated"
        );

        Ok(revenue_by_product
            .into_values()
            .map(|(product, category, revenue)| RevenueRow {
                sku: product.sku.clone(),
                product_name: product.name.clone(),
                category: category.name.clone(),
                revenue,
            })
            .collect())
    }

    fn fetch_revenue_and_space_by_category(
        &self,
        store_id: StoreId,
        date_range: &DateRange,
    ) -> anyhow::Result<(Vec<CategoryRevenueRow>, Vec<CategorySpaceRow>)> {
        let products = self.products_by_id();
        let categories = self.categories_by_id();

        let mut revenue_by_category: BTreeMap<CategoryId, (&Category, f64)> = BTreeMap::new();
        for sale in &self.dataset.sales {
            if sale.store_id != store_id || !date_range.contains(sale.date) {
                continue;
            }
            let Some(category) = products
                .get(&sale.product_id)
                .and_then(|p| categories.get(&p.category_id))
                .copied()
            else {
                continue;
            };
            revenue_by_category.entry(category.id).or_insert((category, 0.0)).1 += sale.revenue;
        }

        let mut space_by_category: BTreeMap<CategoryId, (&Category, f64)> = BTreeMap::new();
        for space in &self.dataset.shelf_space {
            if space.store_id != store_id {
                continue;
            }
            let Some(&category) = categories.get(&space.category_id) else {
                continue;
            };
            space_by_category.entry(category.id).or_insert((category, 0.0)).1 +=
                space.current_meters;
        }

        debug!(
            store_id = %store_id,
            revenue_categories = revenue_by_category.len(),
            space_categories = space_by_category.len(),
            "revenue_and_space_by_category_aggregated"
        );

        let revenue_rows = revenue_by_category
            .into_values()
            .map(|(category, revenue)| CategoryRevenueRow { category: category.name.clone(), revenue })
            .collect();
        let space_rows = space_by_category
            .into_values()
            .map(|(category, meters)| CategorySpaceRow { category: category.name.clone(), meters })
            .collect();

        Ok((revenue_rows, space_rows))
    }

    fn fetch_traffic_zones(&self, store_id: StoreId) -> anyhow::Result<Vec<TrafficZoneRow>> {
        Ok(self
            .dataset
            .traffic_zones
            .iter()
            .filter(|z| z.store_id == store_id)
            .map(|z| TrafficZoneRow {
                zone_name: z.zone_name.clone(),
                x: z.x,
                y: z.y,
                traffic_score: z.traffic_score,
            })
            .collect())
    }
}
