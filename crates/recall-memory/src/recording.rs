// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is a
//! no-op.

use metrics::describe_counter;

/// Register all Recall metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("recall_retrievals_total", "Total memory retrievals");
    describe_counter!(
        "recall_embedding_degraded_total",
        "Embedding calls that failed or timed out"
    );
    describe_counter!(
        "recall_interactions_recorded_total",
        "Interactions persisted to memory"
    );
    describe_counter!(
        "recall_memory_write_failures_total",
        "Memory writes lost to store failures"
    );
}

/// Record a retrieval. `channels` names the channels that produced scores
/// (`vector`, `keyword`, `both` or `none`).
pub fn record_retrieval(channels: &'static str) {
    metrics::counter!("recall_retrievals_total", "channels" => channels).increment(1);
}

/// Record an embedding call that yielded no vector.
pub fn record_embedding_degraded(reason: &'static str) {
    metrics::counter!("recall_embedding_degraded_total", "reason" => reason).increment(1);
}

/// Record a persisted interaction.
pub fn record_interaction(embedded: bool) {
    let embedded = if embedded { "true" } else { "false" };
    metrics::counter!("recall_interactions_recorded_total", "embedded" => embedded).increment(1);
}

/// Record a memory write lost to a store failure.
pub fn record_write_failure() {
    metrics::counter!("recall_memory_write_failures_total").increment(1);
}
