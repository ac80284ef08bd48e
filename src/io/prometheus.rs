//! Prometheus text exposition for geofence metrics
//!
//! Served at /metrics by the HTTP server.

use crate::infra::metrics::{MetricsSummary, METRICS_BUCKET_BOUNDS, METRICS_NUM_BUCKETS};
use std::fmt::Write;

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write a simple metric (counter or gauge) with site label
fn write_metric(
    output: &mut String,
    name: &str,
    help: &str,
    typ: MetricType,
    site: &str,
    val: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name}{{site=\"{site}\"}} {val}");
}

/// Write a histogram metric with buckets, sum, and count
fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    site: &str,
    buckets: &[u64; METRICS_NUM_BUCKETS],
    bounds: &[u64; 10],
    sum: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, &bound) in bounds.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[METRICS_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"+Inf\"}} {cumulative}");

    let _ = writeln!(output, "{name}_sum{{site=\"{site}\"}} {sum}");
    let _ = writeln!(output, "{name}_count{{site=\"{site}\"}} {cumulative}");
}

/// Format a metrics snapshot in Prometheus text exposition format
pub fn format_prometheus_metrics(summary: &MetricsSummary, site_id: &str) -> String {
    let mut output = String::with_capacity(4096);

    write_update_metrics(&mut output, site_id, summary);
    write_latency_metrics(&mut output, site_id, summary);
    write_store_metrics(&mut output, site_id, summary);

    output
}

fn write_update_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_metric(
        output,
        "geofence_location_updates_total",
        "Location updates applied",
        MetricType::Counter,
        site,
        summary.updates_total,
    );
    write_metric(
        output,
        "geofence_location_updates_rejected_total",
        "Location updates rejected for invalid coordinates",
        MetricType::Counter,
        site,
        summary.rejected_total,
    );
    write_metric(
        output,
        "geofence_enter_events_total",
        "Zone enter events emitted",
        MetricType::Counter,
        site,
        summary.enter_events_total,
    );
    write_metric(
        output,
        "geofence_exit_events_total",
        "Zone exit events emitted",
        MetricType::Counter,
        site,
        summary.exit_events_total,
    );
    write_metric(
        output,
        "geofence_unknown_vehicle_total",
        "Status lookups for vehicles never seen",
        MetricType::Counter,
        site,
        summary.unknown_vehicle_total,
    );
}

fn write_latency_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_histogram(
        output,
        "geofence_update_latency_us",
        "Location update processing latency in microseconds",
        site,
        &summary.lat_buckets,
        &METRICS_BUCKET_BOUNDS,
        summary.lat_sum_us,
    );
    write_metric(
        output,
        "geofence_update_latency_p99_us",
        "99th percentile location update latency",
        MetricType::Gauge,
        site,
        summary.lat_p99_us,
    );
}

fn write_store_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    let gauges = &summary.gauges;
    write_metric(
        output,
        "geofence_tracked_vehicles",
        "Vehicles with known state",
        MetricType::Gauge,
        site,
        gauges.tracked_vehicles as u64,
    );
    write_metric(
        output,
        "geofence_events_retained",
        "Events currently held in the event log",
        MetricType::Gauge,
        site,
        gauges.retained_events as u64,
    );
    write_metric(
        output,
        "geofence_events_evicted_total",
        "Events evicted from the event log ring buffer",
        MetricType::Counter,
        site,
        gauges.evicted_events,
    );
    write_metric(
        output,
        "geofence_zones",
        "Zones in the catalog",
        MetricType::Gauge,
        site,
        gauges.zones as u64,
    );
}
