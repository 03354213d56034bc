//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations so concurrent requests never contend.
//! Latency is tracked twice: a window histogram that `report()` drains for the
//! periodic log line, and a lifetime histogram that only grows, for scrapers
//! that compute rates themselves.
//!
//! NOTE: All atomics use Relaxed ordering intentionally; these are statistical
//! counters only. Do NOT use them for coordination or logic decisions.

use crate::domain::types::AnalysisKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Exponential bucket boundaries (microseconds)
/// Buckets: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200
const BUCKET_BOUNDS: [u64; 10] = [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];
const NUM_BUCKETS: usize = BUCKET_BOUNDS.len() + 1;

const NUM_KINDS: usize = AnalysisKind::ALL.len();

/// Bucket slot for a latency; values above the largest bound land in the last slot
#[inline]
fn bucket_slot(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Upper edge reported for a slot; the overflow slot reports twice the largest bound
#[inline]
fn slot_upper_edge(slot: usize) -> u64 {
    BUCKET_BOUNDS.get(slot).copied().unwrap_or(BUCKET_BOUNDS[BUCKET_BOUNDS.len() - 1] * 2)
}

/// Upper edge of the bucket that holds the given quantile (0 when empty)
fn quantile_upper_edge(counts: &[u64; NUM_BUCKETS], quantile: f64) -> u64 {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return 0;
    }

    let rank = ((total as f64 * quantile).ceil() as u64).max(1);
    let mut seen = 0u64;
    for (slot, &count) in counts.iter().enumerate() {
        seen += count;
        if seen >= rank {
            return slot_upper_edge(slot);
        }
    }
    slot_upper_edge(NUM_BUCKETS - 1)
}

/// Counts per latency bucket plus the exact latency sum
struct LatencyHistogram {
    counts: [AtomicU64; NUM_BUCKETS],
    sum_us: AtomicU64,
}

impl LatencyHistogram {
    fn new() -> Self {
        Self { counts: std::array::from_fn(|_| AtomicU64::new(0)), sum_us: AtomicU64::new(0) }
    }

    #[inline]
    fn observe(&self, latency_us: u64) {
        self.counts[bucket_slot(latency_us)].fetch_add(1, Ordering::Relaxed);
        self.sum_us.fetch_add(latency_us, Ordering::Relaxed);
    }

    /// Current counts and sum, leaving them in place
    fn read(&self) -> ([u64; NUM_BUCKETS], u64) {
        let counts = std::array::from_fn(|i| self.counts[i].load(Ordering::Relaxed));
        (counts, self.sum_us.load(Ordering::Relaxed))
    }

    /// Current counts and sum, zeroing them
    fn drain(&self) -> ([u64; NUM_BUCKETS], u64) {
        let counts = std::array::from_fn(|i| self.counts[i].swap(0, Ordering::Relaxed));
        (counts, self.sum_us.swap(0, Ordering::Relaxed))
    }
}

#[inline]
fn load_counters(counters: &[AtomicU64; NUM_KINDS]) -> [u64; NUM_KINDS] {
    std::array::from_fn(|i| counters[i].load(Ordering::Relaxed))
}

/// Lock-free metrics collector
///
/// All recording operations are lock-free using atomics.
/// The `report()` method swaps the window counters to get a consistent snapshot.
pub struct Metrics {
    /// Completed analyses per kind (monotonic)
    analyses_total: [AtomicU64; NUM_KINDS],
    /// Failed analyses per kind (monotonic)
    failures_total: [AtomicU64; NUM_KINDS],
    /// Aggregated input rows fed to the classifiers (monotonic)
    rows_total: AtomicU64,
    /// Analysis results appended to the result log (monotonic)
    results_written_total: AtomicU64,
    /// Result log appends that failed (monotonic)
    results_failed_total: AtomicU64,
    /// Latency since last report (reset on report)
    window_latency: LatencyHistogram,
    /// Max latency in microseconds (reset on report)
    window_max_us: AtomicU64,
    /// Latency since startup (monotonic)
    lifetime_latency: LatencyHistogram,
    /// Last report time (only accessed from reporter, not atomic)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            analyses_total: std::array::from_fn(|_| AtomicU64::new(0)),
            failures_total: std::array::from_fn(|_| AtomicU64::new(0)),
            rows_total: AtomicU64::new(0),
            results_written_total: AtomicU64::new(0),
            results_failed_total: AtomicU64::new(0),
            window_latency: LatencyHistogram::new(),
            window_max_us: AtomicU64::new(0),
            lifetime_latency: LatencyHistogram::new(),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record a completed analysis with its input size and latency (lock-free)
    #[inline]
    pub fn record_analysis(&self, kind: AnalysisKind, rows: usize, latency_us: u64) {
        self.analyses_total[kind.index()].fetch_add(1, Ordering::Relaxed);
        self.rows_total.fetch_add(rows as u64, Ordering::Relaxed);
        self.window_latency.observe(latency_us);
        self.lifetime_latency.observe(latency_us);
        self.window_max_us.fetch_max(latency_us, Ordering::Relaxed);
    }

    /// Record an analysis whose aggregation step failed
    #[inline]
    pub fn record_failure(&self, kind: AnalysisKind) {
        self.failures_total[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of a result log append
    #[inline]
    pub fn record_result_write(&self, ok: bool) {
        if ok {
            self.results_written_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.results_failed_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Completed analyses of one kind
    #[inline]
    pub fn analyses_total(&self, kind: AnalysisKind) -> u64 {
        self.analyses_total[kind.index()].load(Ordering::Relaxed)
    }

    /// Failed analyses of one kind
    #[inline]
    pub fn failures_total(&self, kind: AnalysisKind) -> u64 {
        self.failures_total[kind.index()].load(Ordering::Relaxed)
    }

    /// Generate a summary and reset the window
    pub fn report(&self) -> MetricsSummary {
        let window = self.window_latency.drain();
        let max_latency = self.window_max_us.swap(0, Ordering::Relaxed);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        self.summarize(window, max_latency, elapsed.as_secs_f64())
    }

    /// Current window without resetting it (for scrapes between reports)
    pub fn snapshot(&self) -> MetricsSummary {
        let elapsed = self.last_report_time.lock().elapsed();
        self.summarize(
            self.window_latency.read(),
            self.window_max_us.load(Ordering::Relaxed),
            elapsed.as_secs_f64(),
        )
    }

    fn summarize(
        &self,
        (lat_buckets, window_sum_us): ([u64; NUM_BUCKETS], u64),
        max_latency: u64,
        elapsed_secs: f64,
    ) -> MetricsSummary {
        let analyses_count: u64 = lat_buckets.iter().sum();
        let analyses_per_sec =
            if elapsed_secs > 0.0 { analyses_count as f64 / elapsed_secs } else { 0.0 };
        let avg_latency = if analyses_count > 0 { window_sum_us / analyses_count } else { 0 };
        let (lifetime_buckets, lifetime_sum_us) = self.lifetime_latency.read();

        MetricsSummary {
            analyses_total: load_counters(&self.analyses_total),
            failures_total: load_counters(&self.failures_total),
            rows_total: self.rows_total.load(Ordering::Relaxed),
            results_written_total: self.results_written_total.load(Ordering::Relaxed),
            results_failed_total: self.results_failed_total.load(Ordering::Relaxed),
            analyses_in_window: analyses_count,
            analyses_per_sec,
            avg_latency_us: avg_latency,
            max_latency_us: max_latency,
            lat_p50_us: quantile_upper_edge(&lat_buckets, 0.50),
            lat_p99_us: quantile_upper_edge(&lat_buckets, 0.99),
            lat_buckets,
            lifetime_lat_buckets: lifetime_buckets,
            lifetime_latency_sum_us: lifetime_sum_us,
        }
    }
}

/// Bucket boundaries exposed for Prometheus histogram rendering
pub const METRICS_NUM_BUCKETS: usize = NUM_BUCKETS;
pub const METRICS_BUCKET_BOUNDS: [u64; 10] = BUCKET_BOUNDS;

/// Snapshot produced by [`Metrics::report`]
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    /// Indexed by [`AnalysisKind::index`]
    pub analyses_total: [u64; NUM_KINDS],
    pub failures_total: [u64; NUM_KINDS],
    pub rows_total: u64,
    pub results_written_total: u64,
    pub results_failed_total: u64,
    pub analyses_in_window: u64,
    pub analyses_per_sec: f64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
    pub lat_p50_us: u64,
    pub lat_p99_us: u64,
    /// Window bucket counts (reset on report)
    pub lat_buckets: [u64; NUM_BUCKETS],
    /// Bucket counts since startup (never reset)
    pub lifetime_lat_buckets: [u64; NUM_BUCKETS],
    /// Exact latency sum since startup
    pub lifetime_latency_sum_us: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            tail_total = %self.analyses_total[AnalysisKind::Tail.index()],
            space_total = %self.analyses_total[AnalysisKind::Space.index()],
            heatmap_total = %self.analyses_total[AnalysisKind::Heatmap.index()],
            failures = %self.failures_total.iter().sum::<u64>(),
            rows_total = %self.rows_total,
            analyses_per_sec = format!("{:.2}", self.analyses_per_sec),
            avg_latency_us = %self.avg_latency_us,
            max_latency_us = %self.max_latency_us,
            p50_us = %self.lat_p50_us,
            p99_us = %self.lat_p99_us,
            results_written = %self.results_written_total,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        for kind in AnalysisKind::ALL {
            assert_eq!(metrics.analyses_total(kind), 0);
            assert_eq!(metrics.failures_total(kind), 0);
        }
    }

    #[test]
    fn test_record_analysis_per_kind() {
        let metrics = Metrics::new();

        metrics.record_analysis(AnalysisKind::Tail, 10, 100);
        metrics.record_analysis(AnalysisKind::Tail, 5, 200);
        metrics.record_analysis(AnalysisKind::Heatmap, 3, 50);

        assert_eq!(metrics.analyses_total(AnalysisKind::Tail), 2);
        assert_eq!(metrics.analyses_total(AnalysisKind::Space), 0);
        assert_eq!(metrics.analyses_total(AnalysisKind::Heatmap), 1);
        assert_eq!(metrics.rows_total.load(Ordering::Relaxed), 18);
        assert_eq!(metrics.window_latency.read().1, 350);
    }

    #[test]
    fn test_report() {
        let metrics = Metrics::new();

        metrics.record_analysis(AnalysisKind::Space, 1, 100);
        metrics.record_analysis(AnalysisKind::Space, 1, 200);
        metrics.record_analysis(AnalysisKind::Tail, 1, 300);
        metrics.record_failure(AnalysisKind::Heatmap);
        metrics.record_result_write(true);
        metrics.record_result_write(false);

        let summary = metrics.report();

        assert_eq!(summary.analyses_in_window, 3);
        assert_eq!(summary.analyses_total[AnalysisKind::Space.index()], 2);
        assert_eq!(summary.failures_total[AnalysisKind::Heatmap.index()], 1);
        assert_eq!(summary.avg_latency_us, 200);
        assert_eq!(summary.max_latency_us, 300);
        assert_eq!(summary.results_written_total, 1);
        assert_eq!(summary.results_failed_total, 1);

        // Window counters reset, monotonic ones do not
        let (window_counts, window_sum) = metrics.window_latency.read();
        assert_eq!(window_counts.iter().sum::<u64>(), 0);
        assert_eq!(window_sum, 0);
        assert_eq!(metrics.window_max_us.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.analyses_total(AnalysisKind::Space), 2);
    }

    #[test]
    fn test_lifetime_histogram_survives_report() {
        let metrics = Metrics::new();
        metrics.record_analysis(AnalysisKind::Tail, 1, 90);
        metrics.record_analysis(AnalysisKind::Space, 1, 700);

        let first = metrics.report();
        assert_eq!(first.lifetime_lat_buckets.iter().sum::<u64>(), 2);
        assert_eq!(first.lifetime_latency_sum_us, 790);

        metrics.record_analysis(AnalysisKind::Heatmap, 1, 60_000);
        let second = metrics.report();

        // Window only sees the latest analysis; lifetime keeps growing
        assert_eq!(second.analyses_in_window, 1);
        assert_eq!(second.lat_buckets[NUM_BUCKETS - 1], 1);
        assert_eq!(second.lifetime_lat_buckets[0], 1);
        assert_eq!(second.lifetime_lat_buckets[3], 1);
        assert_eq!(second.lifetime_lat_buckets[NUM_BUCKETS - 1], 1);
        assert_eq!(second.lifetime_latency_sum_us, 60_790);
    }

    #[test]
    fn test_snapshot_does_not_reset() {
        let metrics = Metrics::new();
        metrics.record_analysis(AnalysisKind::Tail, 2, 120);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.analyses_in_window, 1);
        assert_eq!(snapshot.lat_buckets[1], 1);

        let report = metrics.report();
        assert_eq!(report.analyses_in_window, 1);
        assert_eq!(report.max_latency_us, 120);
    }

    #[test]
    fn test_report_empty() {
        let summary = Metrics::new().report();
        assert_eq!(summary.analyses_in_window, 0);
        assert_eq!(summary.avg_latency_us, 0);
        assert_eq!(summary.lat_p99_us, 0);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(Metrics::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let m = metrics.clone();
            handles.push(thread::spawn(move || {
                for i in 0..500 {
                    m.record_analysis(AnalysisKind::Tail, 1, i as u64);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(metrics.analyses_total(AnalysisKind::Tail), 4_000);
        assert_eq!(metrics.window_max_us.load(Ordering::Relaxed), 499);
        assert_eq!(metrics.lifetime_latency.read().0.iter().sum::<u64>(), 4_000);
    }

    #[test]
    fn test_bucket_slot() {
        assert_eq!(bucket_slot(0), 0);
        assert_eq!(bucket_slot(100), 0);
        assert_eq!(bucket_slot(101), 1);
        assert_eq!(bucket_slot(51200), 9);
        assert_eq!(bucket_slot(51201), 10);
        assert_eq!(slot_upper_edge(10), 102_400);
    }

    #[test]
    fn test_quantile_edges() {
        let metrics = Metrics::new();
        for _ in 0..100 {
            metrics.record_analysis(AnalysisKind::Heatmap, 0, 150);
        }

        let summary = metrics.report();
        assert_eq!(summary.lat_buckets[1], 100);
        assert_eq!(summary.lat_p50_us, 200);
        assert_eq!(summary.lat_p99_us, 200);
    }

    #[test]
    fn test_single_sample_quantile_skips_empty_buckets() {
        let mut counts = [0u64; NUM_BUCKETS];
        counts[4] = 1;
        assert_eq!(quantile_upper_edge(&counts, 0.50), 1600);
        assert_eq!(quantile_upper_edge(&counts, 0.99), 1600);
    }
}
