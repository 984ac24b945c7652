//! Prometheus metrics for the conversion pipeline.
//!
//! Registered into the server's registry via [`all_metrics`].

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

/// Finished conversions by result and, for failures, the failing stage.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "driveconv_conversions_total",
            "Total conversion requests processed",
        ),
        &["result", "stage"], // result: "success", "failure"; stage: "done" on success
    )
    .unwrap()
});

/// Time spent in each pipeline stage.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "driveconv_stage_duration_seconds",
            "Duration of each conversion stage",
        )
        .buckets(vec![
            0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0, 3600.0,
        ]),
        &["stage"],
    )
    .unwrap()
});

/// Bytes moved to and from remote storage.
pub static BYTES_TRANSFERRED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "driveconv_bytes_transferred_total",
            "Total bytes downloaded from or uploaded to storage",
        ),
        &["direction"], // "download", "upload"
    )
    .unwrap()
});

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(STAGE_DURATION.clone()),
        Box::new(BYTES_TRANSFERRED.clone()),
    ]
}
