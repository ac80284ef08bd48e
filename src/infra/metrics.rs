//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//! Counter updates never lock; `report()` swaps the per-interval counters.
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only. Do NOT use them for coordination or logic decisions.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Prometheus-style exponential bucket boundaries (microseconds)
/// Buckets: ≤10, ≤20, ≤40, ≤80, ≤160, ≤320, ≤640, ≤1280, ≤2560, ≤5120, >5120
const BUCKET_BOUNDS: [u64; 10] = [10, 20, 40, 80, 160, 320, 640, 1280, 2560, 5120];
const NUM_BUCKETS: usize = 11;

/// Exported for the Prometheus formatter
pub const METRICS_BUCKET_BOUNDS: [u64; 10] = BUCKET_BOUNDS;
pub const METRICS_NUM_BUCKETS: usize = NUM_BUCKETS;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Load all bucket values without resetting
#[inline]
fn load_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    std::array::from_fn(|i| buckets[i].load(Ordering::Relaxed))
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = ((total as f64 * percentile).ceil() as u64).max(1);
    let mut cumulative = 0u64;

    // Last bucket uses 2x the previous bound
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [10, 20, 40, 80, 160, 320, 640, 1280, 2560, 5120, 10240];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
pub struct Metrics {
    /// Location updates applied (monotonic)
    updates_total: AtomicU64,
    /// Updates since last report (reset on report)
    updates_since_report: AtomicU64,
    /// Updates rejected for invalid coordinates (monotonic)
    rejected_total: AtomicU64,
    /// Enter events emitted (monotonic)
    enter_events_total: AtomicU64,
    /// Exit events emitted (monotonic)
    exit_events_total: AtomicU64,
    /// Status lookups for unknown vehicles (monotonic)
    unknown_vehicle_total: AtomicU64,
    /// Update processing latency histogram (cumulative, for Prometheus)
    latency_buckets: [AtomicU64; NUM_BUCKETS],
    /// Sum of all latencies in microseconds (cumulative)
    latency_sum_us: AtomicU64,
    /// Max latency since last report (reset on report)
    latency_max_us: AtomicU64,
    /// Last report time (only accessed from reporter)
    last_report_time: Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            updates_total: AtomicU64::new(0),
            updates_since_report: AtomicU64::new(0),
            rejected_total: AtomicU64::new(0),
            enter_events_total: AtomicU64::new(0),
            exit_events_total: AtomicU64::new(0),
            unknown_vehicle_total: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            last_report_time: Mutex::new(Instant::now()),
        }
    }

    /// Record an applied location update with its processing latency
    #[inline]
    pub fn record_update(&self, latency_us: u64, enters: u64, exits: u64) {
        self.updates_total.fetch_add(1, Ordering::Relaxed);
        self.updates_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_us, latency_us);

        if enters > 0 {
            self.enter_events_total.fetch_add(enters, Ordering::Relaxed);
        }
        if exits > 0 {
            self.exit_events_total.fetch_add(exits, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_rejected(&self) {
        self.rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unknown_vehicle(&self) {
        self.unknown_vehicle_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn updates_total(&self) -> u64 {
        self.updates_total.load(Ordering::Relaxed)
    }

    pub fn rejected_total(&self) -> u64 {
        self.rejected_total.load(Ordering::Relaxed)
    }

    /// Interval report for the periodic log line. Resets the per-interval
    /// rate and max counters; totals and the histogram stay cumulative.
    pub fn report(&self, gauges: StoreGauges) -> MetricsSummary {
        let now = Instant::now();
        let elapsed_secs = {
            let mut last = self.last_report_time.lock();
            let elapsed = now.duration_since(*last).as_secs_f64();
            *last = now;
            elapsed
        };

        let interval_updates = self.updates_since_report.swap(0, Ordering::Relaxed);
        let mut summary = self.snapshot(gauges);
        summary.updates_per_sec =
            if elapsed_secs > 0.0 { interval_updates as f64 / elapsed_secs } else { 0.0 };
        summary.max_latency_us = self.latency_max_us.swap(0, Ordering::Relaxed);
        summary
    }

    /// Read-only snapshot for Prometheus scrapes. Nothing is reset.
    pub fn snapshot(&self, gauges: StoreGauges) -> MetricsSummary {
        let lat_buckets = load_buckets(&self.latency_buckets);
        let updates_total = self.updates_total.load(Ordering::Relaxed);
        let latency_sum_us = self.latency_sum_us.load(Ordering::Relaxed);

        MetricsSummary {
            updates_total,
            updates_per_sec: 0.0,
            rejected_total: self.rejected_total.load(Ordering::Relaxed),
            enter_events_total: self.enter_events_total.load(Ordering::Relaxed),
            exit_events_total: self.exit_events_total.load(Ordering::Relaxed),
            unknown_vehicle_total: self.unknown_vehicle_total.load(Ordering::Relaxed),
            lat_sum_us: latency_sum_us,
            avg_latency_us: if updates_total > 0 { latency_sum_us / updates_total } else { 0 },
            max_latency_us: self.latency_max_us.load(Ordering::Relaxed),
            lat_p50_us: percentile_from_buckets(&lat_buckets, 0.50),
            lat_p95_us: percentile_from_buckets(&lat_buckets, 0.95),
            lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
            lat_buckets,
            gauges,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time sizes read from the store at report time
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreGauges {
    pub tracked_vehicles: usize,
    pub retained_events: usize,
    pub evicted_events: u64,
    pub zones: usize,
}

/// Metrics snapshot
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub updates_total: u64,
    pub updates_per_sec: f64,
    pub rejected_total: u64,
    pub enter_events_total: u64,
    pub exit_events_total: u64,
    pub unknown_vehicle_total: u64,
    pub lat_sum_us: u64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
    pub lat_p50_us: u64,
    pub lat_p95_us: u64,
    pub lat_p99_us: u64,
    pub lat_buckets: [u64; NUM_BUCKETS],
    pub gauges: StoreGauges,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            updates_total = %self.updates_total,
            updates_per_sec = %format!("{:.1}", self.updates_per_sec),
            rejected_total = %self.rejected_total,
            enter_total = %self.enter_events_total,
            exit_total = %self.exit_events_total,
            avg_latency_us = %self.avg_latency_us,
            max_latency_us = %self.max_latency_us,
            lat_p99_us = %self.lat_p99_us,
            vehicles = %self.gauges.tracked_vehicles,
            events_retained = %self.gauges.retained_events,
            events_evicted = %self.gauges.evicted_events,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(10), 0);
        assert_eq!(bucket_index(11), 1);
        assert_eq!(bucket_index(5120), 9);
        assert_eq!(bucket_index(5121), 10);
    }

    #[test]
    fn test_record_update_counts_events() {
        let metrics = Metrics::new();
        metrics.record_update(15, 1, 0);
        metrics.record_update(30, 1, 1);
        metrics.record_update(5, 0, 0);
        metrics.record_rejected();

        let summary = metrics.report(StoreGauges::default());
        assert_eq!(summary.updates_total, 3);
        assert_eq!(summary.enter_events_total, 2);
        assert_eq!(summary.exit_events_total, 1);
        assert_eq!(summary.rejected_total, 1);
        assert_eq!(summary.max_latency_us, 30);
        assert_eq!(summary.avg_latency_us, 16);
        assert_eq!(summary.lat_buckets.iter().sum::<u64>(), 3);
    }

    #[test]
    fn test_report_resets_interval_max_only() {
        let metrics = Metrics::new();
        metrics.record_update(100, 0, 0);

        let first = metrics.report(StoreGauges::default());
        assert_eq!(first.max_latency_us, 100);

        metrics.record_update(40, 0, 0);
        assert_eq!(metrics.snapshot(StoreGauges::default()).max_latency_us, 40);
        assert_eq!(metrics.snapshot(StoreGauges::default()).max_latency_us, 40);

        let second = metrics.report(StoreGauges::default());
        assert_eq!(second.max_latency_us, 40);
        let third = metrics.report(StoreGauges::default());
        assert_eq!(third.max_latency_us, 0);
        assert_eq!(third.updates_total, 2);
        assert_eq!(third.lat_buckets.iter().sum::<u64>(), 2);
    }

    #[test]
    fn test_percentiles() {
        let mut buckets = [0u64; NUM_BUCKETS];
        assert_eq!(percentile_from_buckets(&buckets, 0.99), 0);

        buckets[0] = 90;
        buckets[5] = 10;
        assert_eq!(percentile_from_buckets(&buckets, 0.50), 10);
        assert_eq!(percentile_from_buckets(&buckets, 0.99), 320);
    }
}
