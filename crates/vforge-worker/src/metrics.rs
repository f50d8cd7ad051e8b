//! Prometheus metrics for generation and rendering.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{WorkerError, WorkerResult};

/// Install the Prometheus recorder with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("failed to install metrics exporter: {}", e)))
}

/// Metric names as constants for consistency.
pub mod names {
    // Fan-out
    pub const FANOUT_SLOTS_TOTAL: &str = "vforge_fanout_slots_total";
    pub const DROPPED_SCENES_TOTAL: &str = "vforge_dropped_scenes_total";

    // Rendering
    pub const CLIPS_RENDERED_TOTAL: &str = "vforge_clips_rendered_total";
    pub const CLIPS_SKIPPED_TOTAL: &str = "vforge_clips_skipped_total";
    pub const STAGE_DURATION_SECONDS: &str = "vforge_stage_duration_seconds";

    // Jobs
    pub const JOBS_COMPLETED_TOTAL: &str = "vforge_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vforge_jobs_failed_total";
    pub const DISPATCH_FAILURES_TOTAL: &str = "vforge_dispatch_failures_total";
}

/// Record a settled fan-out slot. `outcome` is `primary`, `fallback` or `failed`.
pub fn record_slot(role: &str, outcome: &str) {
    let labels = [("role", role.to_string()), ("outcome", outcome.to_string())];
    counter!(names::FANOUT_SLOTS_TOTAL, &labels).increment(1);
}

pub fn record_dropped_scenes(count: usize) {
    counter!(names::DROPPED_SCENES_TOTAL).increment(count as u64);
}

pub fn record_clip_rendered() {
    counter!(names::CLIPS_RENDERED_TOTAL).increment(1);
}

pub fn record_clip_skipped(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::CLIPS_SKIPPED_TOTAL, &labels).increment(1);
}

pub fn record_stage_duration(stage: &str, duration_secs: f64) {
    let labels = [("stage", stage.to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_job_completed(operation: &str) {
    let labels = [("operation", operation.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
}

pub fn record_job_failed(operation: &str) {
    let labels = [("operation", operation.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

pub fn record_dispatch_failure(dispatcher: &str) {
    let labels = [("dispatcher", dispatcher.to_string())];
    counter!(names::DISPATCH_FAILURES_TOTAL, &labels).increment(1);
}
