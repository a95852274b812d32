//! Observability infrastructure for the app service
//!
//! Provides:
//! - Prometheus metrics (launch latency, session operation outcomes, catalog size)
//! - Structured JSON logging with tracing

use crate::models::LaunchSpec;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec,
    IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for launch latency (seconds); a launch waits for container start-up
const LAUNCH_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 55.0];

/// Session operation labels
pub mod ops {
    pub const RUN: &str = "run";
    pub const PAUSE: &str = "pause";
    pub const RESUME: &str = "resume";
    pub const STOP: &str = "stop";
}

/// Session operation outcome labels
pub mod outcomes {
    pub const OK: &str = "ok";
    pub const ALREADY_STOPPED: &str = "already_stopped";
    pub const NOT_FOUND: &str = "not_found";
    pub const OPERATIONAL_ERROR: &str = "operational_error";
    pub const CONFIGURATION_DEFECT: &str = "configuration_defect";
    pub const ERROR: &str = "error";
}

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AppMetricsInner> = OnceLock::new();

struct AppMetricsInner {
    launch_latency_seconds: Histogram,
    session_ops: IntCounterVec,
    catalog_releases: IntGauge,
}

impl AppMetricsInner {
    fn new() -> Self {
        Self {
            launch_latency_seconds: register_histogram!(
                "appsvc_launch_latency_seconds",
                "Time spent assembling and dispatching a session launch",
                LAUNCH_BUCKETS.to_vec()
            )
            .expect("Failed to register launch_latency_seconds"),

            session_ops: register_int_counter_vec!(
                "appsvc_session_operations_total",
                "Session operations by operation and outcome",
                &["op", "outcome"]
            )
            .expect("Failed to register session_operations_total"),

            catalog_releases: register_int_gauge!(
                "appsvc_catalog_releases",
                "Number of releases loaded into the catalog"
            )
            .expect("Failed to register catalog_releases"),
        }
    }
}

/// App service metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct AppMetrics {
    _private: (),
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AppMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AppMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AppMetricsInner {
        GLOBAL_METRICS.get_or_init(AppMetricsInner::new)
    }

    pub fn observe_launch_latency(&self, duration_secs: f64) {
        self.inner().launch_latency_seconds.observe(duration_secs);
    }

    /// Count one session operation outcome
    pub fn inc_session_op(&self, op: &str, outcome: &str) {
        self.inner()
            .session_ops
            .with_label_values(&[op, outcome])
            .inc();
    }

    pub fn session_op_count(&self, op: &str, outcome: &str) -> u64 {
        self.inner()
            .session_ops
            .with_label_values(&[op, outcome])
            .get()
    }

    pub fn set_catalog_releases(&self, count: i64) {
        self.inner().catalog_releases.set(count);
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Log a dispatched launch
    pub fn log_launch(&self, spec: &LaunchSpec, container_id: &str, region: &str) {
        info!(
            event = "session_launched",
            node = %self.node_name,
            user_id = spec.user_id,
            release_uuid = %spec.app_descr.release_uuid,
            runner = %spec.reqs.container.runner.name,
            video_enc = spec.reqs.container.video_enc.as_str(),
            preferred_dcs = ?spec.preferred_dcs,
            memory_bytes = spec.reqs.hw.memory,
            nanocpus = spec.reqs.hw.nanocpus,
            container_id = %container_id,
            region = %region,
            "Session launched"
        );
    }

    /// Log a stop request for a container that no longer exists
    pub fn log_already_stopped(&self, container_id: &str, node_id: &str) {
        warn!(
            event = "session_already_stopped",
            node = %self.node_name,
            container_id = %container_id,
            node_id = %node_id,
            "Container was already stopped"
        );
    }

    pub fn log_startup(&self, version: &str, known_dcs: &[String], runners: usize) {
        info!(
            event = "service_started",
            node = %self.node_name,
            version = %version,
            known_dcs = ?known_dcs,
            runners = runners,
            "App service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            node = %self.node_name,
            reason = %reason,
            "App service shutting down"
        );
    }
}
