// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for comment-query.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding application is responsible for choosing the exporter
//! (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `comment_query_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `dimension`: the filter parameter that activated a clause
//! - `collaborator`: meta, date

use metrics::{counter, histogram};
use std::time::{Duration, Instant};

/// Record a completed compilation
pub fn record_compile() {
    counter!("comment_query_compiled_total").increment(1);
}

/// Record compilation latency
pub fn record_compile_latency(duration: Duration) {
    histogram!("comment_query_compile_seconds").record(duration.as_secs_f64());
}

/// Record how many filter clauses a compilation activated
pub fn record_active_dimensions(count: usize) {
    histogram!("comment_query_active_dimensions").record(count as f64);
}

/// Record a single activated filter dimension
pub fn record_dimension(dimension: &'static str) {
    counter!(
        "comment_query_dimension_activations_total",
        "dimension" => dimension
    )
    .increment(1);
}

/// Record a collaborator invocation and whether it produced a subtree
pub fn record_collaborator(collaborator: &'static str, produced: bool) {
    let outcome = if produced { "subtree" } else { "empty" };
    counter!(
        "comment_query_collaborator_calls_total",
        "collaborator" => collaborator,
        "outcome" => outcome
    )
    .increment(1);
}

/// A timing guard that records compile latency on drop
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_compile_latency(self.start.elapsed());
    }
}
