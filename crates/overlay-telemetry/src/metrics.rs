//! Prometheus metrics for the overlay engine.
//!
//! All metrics follow the naming convention: `overlay_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., outputs_admitted_total)
//! - **Histogram**: Distribution of values (e.g., submit_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Submissions by mode and outcome
    pub static ref SUBMISSIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("overlay_engine_submissions_total", "Transaction submissions processed"),
        &["mode", "outcome"]  // mode: current/historical, outcome: ok or error kind
    ).expect("metric creation failed");

    /// Outputs admitted into a topic
    pub static ref OUTPUTS_ADMITTED: CounterVec = CounterVec::new(
        Opts::new("overlay_engine_outputs_admitted_total", "Outputs admitted per topic"),
        &["topic"]
    ).expect("metric creation failed");

    /// Outputs deleted by cascading garbage collection
    pub static ref OUTPUTS_PRUNED: CounterVec = CounterVec::new(
        Opts::new("overlay_engine_outputs_pruned_total", "Outputs pruned per topic"),
        &["topic"]
    ).expect("metric creation failed");

    /// Topic commits skipped because the transaction was already applied
    pub static ref APPLIED_SKIPS: CounterVec = CounterVec::new(
        Opts::new("overlay_engine_applied_skips_total", "Already-applied topic commits skipped"),
        &["topic"]
    ).expect("metric creation failed");

    /// End-to-end submission latency
    pub static ref SUBMIT_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "overlay_engine_submit_duration_seconds",
            "Time spent processing a submission"
        ).buckets(exponential_buckets(0.0001, 2.0, 16).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SUBMISSIONS_TOTAL.clone()),
        Box::new(OUTPUTS_ADMITTED.clone()),
        Box::new(OUTPUTS_PRUNED.clone()),
        Box::new(APPLIED_SKIPS.clone()),
        Box::new(SUBMIT_DURATION.clone()),
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
pub fn gather_metrics() -> Result<String, TelemetryError> {
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
