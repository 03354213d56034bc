//! Analytics service - fetch rows, run a classifier, record the outcome
//!
//! Each call is independent: the source is read-only, metrics are atomic and
//! the result log appends whole lines, so one service is shared by all
//! request handlers without locking.

use crate::domain::report::{ElasticityReport, HeatmapReport, TailReport};
use crate::domain::types::{AnalysisKind, DateRange, StoreId, TailFilter};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::results::{AnalyticsResult, ResultLog};
use crate::services::aggregator::AnalyticsSource;
use crate::services::{elasticity, heatmap, tail};
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub struct AnalyticsService<S> {
    source: S,
    metrics: Arc<Metrics>,
    results: Option<ResultLog>,
}

impl<S: AnalyticsSource> AnalyticsService<S> {
    pub fn new(source: S, metrics: Arc<Metrics>) -> Self {
        Self { source, metrics, results: None }
    }

    /// Build a service, enabling the result log if configured
    pub fn from_config(source: S, metrics: Arc<Metrics>, config: &Config) -> Self {
        let service = Self::new(source, metrics);
        if config.results_enabled() {
            service.with_result_log(ResultLog::new(config.results_file()))
        } else {
            service
        }
    }

    pub fn with_result_log(mut self, results: ResultLog) -> Self {
        self.results = Some(results);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// SKU tail classification for the filtered sales window
    pub fn tail(&self, filter: &TailFilter) -> anyhow::Result<TailReport> {
        let start = Instant::now();
        let rows = self
            .source
            .fetch_revenue_by_product(filter)
            .map_err(|e| self.fail(AnalysisKind::Tail, filter.store_id, e))?;

        let report = tail::tail_analysis(&rows);
        if report.summary.total_skus == 0 && !rows.is_empty() {
            warn!(store_id = %filter.store_id, rows = rows.len(), "tail_zero_revenue");
        }

        self.complete(AnalysisKind::Tail, filter.store_id, &filter.date_range, rows.len(), start, &report);
        Ok(report)
    }

    /// Current vs. recommended shelf meters per category
    pub fn space(&self, store_id: StoreId, date_range: &DateRange) -> anyhow::Result<ElasticityReport> {
        let start = Instant::now();
        let (revenue_rows, space_rows) = self
            .source
            .fetch_revenue_and_space_by_category(store_id, date_range)
            .map_err(|e| self.fail(AnalysisKind::Space, store_id, e))?;

        let report = elasticity::space_elasticity(&revenue_rows, &space_rows);

        let rows = revenue_rows.len() + space_rows.len();
        self.complete(AnalysisKind::Space, store_id, date_range, rows, start, &report);
        Ok(report)
    }

    /// Traffic-zone performance tiers
    pub fn heatmap(&self, store_id: StoreId) -> anyhow::Result<HeatmapReport> {
        let start = Instant::now();
        let zones = self
            .source
            .fetch_traffic_zones(store_id)
            .map_err(|e| self.fail(AnalysisKind::Heatmap, store_id, e))?;

        let report = heatmap::heatmap_analysis(&zones);

        self.complete(AnalysisKind::Heatmap, store_id, &DateRange::default(), zones.len(), start, &report);
        Ok(report)
    }

    fn fail(&self, kind: AnalysisKind, store_id: StoreId, e: anyhow::Error) -> anyhow::Error {
        self.metrics.record_failure(kind);
        error!(kind = %kind.as_str(), store_id = %store_id, error = %format!("{e:#}"), "analysis_failed");
        e.context(format!("{} analysis for store {} failed", kind.as_str(), store_id))
    }

    fn complete<R: Serialize>(
        &self,
        kind: AnalysisKind,
        store_id: StoreId,
        date_range: &DateRange,
        rows: usize,
        start: Instant,
        report: &R,
    ) {
        let latency_us = start.elapsed().as_micros() as u64;
        self.metrics.record_analysis(kind, rows, latency_us);

        info!(
            kind = %kind.as_str(),
            store_id = %store_id,
            rows = rows,
            latency_us = latency_us,
            "analysis_completed"
        );

        if let Some(results) = &self.results {
            let written = serde_json::to_value(report)
                .context("report is not representable as JSON")
                .map(|payload| AnalyticsResult::new(store_id, kind, date_range, payload))
                .map(|result| results.write_result(&result))
                .unwrap_or_else(|e| {
                    error!(kind = %kind.as_str(), error = %format!("{e:#}"), "result_payload_failed");
                    false
                });
            self.metrics.record_result_write(written);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::Classification;
    use crate::domain::types::{CategoryRevenueRow, CategorySpaceRow, RevenueRow, TrafficZoneRow};
    use crate::services::aggregator::tests::sample_dataset;
    use crate::services::aggregator::DatasetAggregator;
    use anyhow::bail;
    use tempfile::TempDir;

    fn dataset_service() -> AnalyticsService<DatasetAggregator> {
        AnalyticsService::new(
            DatasetAggregator::new(Arc::new(sample_dataset())),
            Arc::new(Metrics::new()),
        )
    }

    /// Source whose storage is unavailable
    struct FailingSource;

    impl AnalyticsSource for FailingSource {
        fn fetch_revenue_by_product(&self, _: &TailFilter) -> anyhow::Result<Vec<RevenueRow>> {
            bail!("storage offline")
        }

        fn fetch_revenue_and_space_by_category(
            &self,
            _: StoreId,
            _: &DateRange,
        ) -> anyhow::Result<(Vec<CategoryRevenueRow>, Vec<CategorySpaceRow>)> {
            bail!("storage offline")
        }

        fn fetch_traffic_zones(&self, _: StoreId) -> anyhow::Result<Vec<TrafficZoneRow>> {
            bail!("storage offline")
        }
    }

    #[test]
    fn test_tail_from_dataset() {
        let service = dataset_service();
        let report = service.tail(&TailFilter::for_store(StoreId(1))).unwrap();

        // 700, 150, 100, 50 of 1000
        assert_eq!(report.summary.total_skus, 4);
        let classes: Vec<Classification> = report.table.iter().map(|r| r.classification).collect();
        assert_eq!(
            classes,
            vec![
                Classification::Core,
                Classification::Average,
                Classification::Tail,
                Classification::Tail
            ]
        );
        assert_eq!(report.table[0].sku, "DAI-001");
        assert_eq!(report.summary.tail_sales_share, 0.15);
        assert_eq!(service.metrics().analyses_total(AnalysisKind::Tail), 1);
    }

    #[test]
    fn test_space_from_dataset() {
        let report = dataset_service().space(StoreId(1), &DateRange::default()).unwrap();

        // 10 m in total, Dairy earns 80% and Snacks 20%
        assert_eq!(report.table.len(), 2);
        assert_eq!(report.table[0].category, "Dairy");
        assert_eq!(report.table[0].current_meters, 6.0);
        assert_eq!(report.table[0].recommended_meters, 8.0);
        assert_eq!(report.table[1].recommended_meters, 2.0);
    }

    #[test]
    fn test_heatmap_from_dataset() {
        let report = dataset_service().heatmap(StoreId(1)).unwrap();
        assert_eq!(report.zones.len(), 2);
        assert_eq!(report.zones[0].zone_name, "Entrance");
    }

    #[test]
    fn test_source_failure_is_counted_and_propagated() {
        let service = AnalyticsService::new(FailingSource, Arc::new(Metrics::new()));

        let err = service.tail(&TailFilter::for_store(StoreId(5))).unwrap_err();
        assert!(format!("{err:#}").contains("storage offline"));
        assert!(err.to_string().contains("tail analysis for store 5"));
        assert!(service.heatmap(StoreId(5)).is_err());

        assert_eq!(service.metrics().failures_total(AnalysisKind::Tail), 1);
        assert_eq!(service.metrics().failures_total(AnalysisKind::Heatmap), 1);
        assert_eq!(service.metrics().analyses_total(AnalysisKind::Tail), 0);
    }

    #[test]
    fn test_results_logged_when_enabled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.jsonl");
        let config = Config::default().with_results_file(path.to_str().unwrap());

        let service = AnalyticsService::from_config(
            DatasetAggregator::new(Arc::new(sample_dataset())),
            Arc::new(Metrics::new()),
            &config,
        );
        service.heatmap(StoreId(1)).unwrap();
        service.space(StoreId(1), &DateRange::default()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> =
            content.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "heatmap");
        assert_eq!(lines[0]["payload_json"]["zones"][0]["color"], "blue");
        assert_eq!(lines[1]["type"], "space");

        let summary = service.metrics().report();
        assert_eq!(summary.results_written_total, 2);
    }

    #[test]
    fn test_results_not_logged_by_default() {
        let service = AnalyticsService::from_config(
            DatasetAggregator::new(Arc::new(sample_dataset())),
            Arc::new(Metrics::new()),
            &Config::default(),
        );
        service.heatmap(StoreId(1)).unwrap();
        assert_eq!(service.metrics().report().results_written_total, 0);
    }
}
