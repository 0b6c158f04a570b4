//! Prometheus metrics for the event fabric.
//!
//! All metrics follow the naming convention: `fabric_<component>_<metric>_<unit>`

// Metric options are constant; construction cannot fail.
#![allow(clippy::expect_used)]

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // BUS METRICS
    // =========================================================================

    /// Events handed to `publish`
    pub static ref EVENTS_PUBLISHED: IntCounter = IntCounter::new(
        "fabric_bus_events_published_total",
        "Total number of events published"
    ).expect("metric creation failed");

    /// Events handed to subscription handlers
    pub static ref EVENTS_DELIVERED: IntCounter = IntCounter::new(
        "fabric_bus_events_delivered_total",
        "Total number of events delivered to subscriptions"
    ).expect("metric creation failed");

    /// Events dropped because a delivery channel was full
    pub static ref EVENTS_DROPPED: IntCounter = IntCounter::new(
        "fabric_bus_events_dropped_total",
        "Total number of events dropped by full delivery channels"
    ).expect("metric creation failed");

    /// Registered subscriptions across all buses
    pub static ref SUBSCRIPTIONS_ACTIVE: IntGauge = IntGauge::new(
        "fabric_bus_subscriptions_active",
        "Number of active subscriptions"
    ).expect("metric creation failed");

    /// Events retained by in-memory history stores
    pub static ref HISTORY_RETAINED: IntGauge = IntGauge::new(
        "fabric_history_events_retained",
        "Number of events retained in memory history"
    ).expect("metric creation failed");

    /// History fetch duration
    pub static ref HISTORY_FETCH_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "fabric_history_fetch_duration_seconds",
            "Time spent fetching event history"
        ).buckets(exponential_buckets(0.0001, 2.0, 14).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // GATEWAY METRICS
    // =========================================================================

    /// Open event streams
    pub static ref STREAMS_ACTIVE: IntGauge = IntGauge::new(
        "fabric_gateway_streams_active",
        "Number of open event streams"
    ).expect("metric creation failed");

    /// Events withheld from a stream because the caller could not see them
    pub static ref EVENTS_INVISIBLE: IntCounter = IntCounter::new(
        "fabric_gateway_events_invisible_total",
        "Total number of events filtered out by visibility"
    ).expect("metric creation failed");

    /// Related events returned in redacted form
    pub static ref EVENTS_REDACTED: IntCounter = IntCounter::new(
        "fabric_gateway_events_redacted_total",
        "Total number of events returned redacted"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Bus
        Box::new(EVENTS_PUBLISHED.clone()),
        Box::new(EVENTS_DELIVERED.clone()),
        Box::new(EVENTS_DROPPED.clone()),
        Box::new(SUBSCRIPTIONS_ACTIVE.clone()),
        // History
        Box::new(HISTORY_RETAINED.clone()),
        Box::new(HISTORY_FETCH_DURATION.clone()),
        // Gateway
        Box::new(STREAMS_ACTIVE.clone()),
        Box::new(EVENTS_INVISIBLE.clone()),
        Box::new(EVENTS_REDACTED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
