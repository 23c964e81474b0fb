//! # Finality Metrics
//!
//! Prometheus metrics for monitoring finality queries.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! fg-finality = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `finality_block_queries_total` - Counter of single-block queries (by outcome)
//! - `finality_range_queries_total` - Counter of range queries
//! - `finality_collaborator_failures_total` - Counter of failed collaborator calls (by call)
//! - `finality_last_finalized_height` - Gauge of the last finalized height a range scan reported

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Single-block queries, labeled by outcome
    pub static ref BLOCK_QUERIES: IntCounterVec = register_int_counter_vec!(
        "finality_block_queries_total",
        "Total number of single-block finality queries",
        &["outcome"]
    )
    .expect("Failed to create BLOCK_QUERIES metric");

    /// Range queries answered
    pub static ref RANGE_QUERIES: IntCounter = register_int_counter!(
        "finality_range_queries_total",
        "Total number of range finality queries"
    )
    .expect("Failed to create RANGE_QUERIES metric");

    /// Failed collaborator calls, labeled by call
    pub static ref COLLABORATOR_FAILURES: IntCounterVec = register_int_counter_vec!(
        "finality_collaborator_failures_total",
        "Total number of failed collaborator calls",
        &["call"]
    )
    .expect("Failed to create COLLABORATOR_FAILURES metric");

    /// Last finalized height reported by a range scan
    pub static ref LAST_FINALIZED_HEIGHT: IntGauge = register_int_gauge!(
        "finality_last_finalized_height",
        "Last finalized L2 height reported by a range query"
    )
    .expect("Failed to create LAST_FINALIZED_HEIGHT metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record the outcome of a single-block query
#[cfg(feature = "metrics")]
pub fn record_block_outcome(outcome: &str) {
    BLOCK_QUERIES.with_label_values(&[outcome]).inc();
}

/// Record a range query and the height it reported
#[cfg(feature = "metrics")]
pub fn record_range_query(latest: Option<u64>) {
    RANGE_QUERIES.inc();
    if let Some(height) = latest {
        LAST_FINALIZED_HEIGHT.set(i64::try_from(height).unwrap_or(i64::MAX));
    }
}

/// Record a failed collaborator call
#[cfg(feature = "metrics")]
pub fn record_collaborator_failure(call: &str) {
    COLLABORATOR_FAILURES.with_label_values(&[call]).inc();
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_block_outcome(_outcome: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_range_query(_latest: Option<u64>) {}

#[cfg(not(feature = "metrics"))]
pub fn record_collaborator_failure(_call: &str) {}
