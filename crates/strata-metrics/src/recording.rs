// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-level metric emission through the `metrics` facade.
//!
//! The facade is backend-agnostic: deployments install whatever recorder
//! they expose (Prometheus, statsd, a test recorder), and without one
//! every call here is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram};

pub const DECISIONS_TOTAL: &str = "strata_decisions_total";
pub const OUTCOMES_TOTAL: &str = "strata_outcomes_total";
pub const FALLBACKS_TOTAL: &str = "strata_fallbacks_total";
pub const CANARY_ROLLBACKS_TOTAL: &str = "strata_canary_rollbacks_total";
pub const DECISION_LATENCY_MS: &str = "strata_decision_latency_ms";

/// Register metric descriptions with the installed recorder. Call once
/// at startup.
pub fn describe_metrics() {
    describe_counter!(DECISIONS_TOTAL, "Routing decisions made, by tier and path");
    describe_counter!(OUTCOMES_TOTAL, "Request outcomes reported, by tier and result");
    describe_counter!(FALLBACKS_TOTAL, "Decisions that fell back to the default tier");
    describe_counter!(CANARY_ROLLBACKS_TOTAL, "Canary auto-rollbacks triggered");
    describe_histogram!(DECISION_LATENCY_MS, "Decision path latency in milliseconds");
}

pub fn record_decision(tier: &str, path: &str, latency_ms: f64) {
    counter!(DECISIONS_TOTAL, "tier" => tier.to_string(), "path" => path.to_string())
        .increment(1);
    histogram!(DECISION_LATENCY_MS).record(latency_ms);
}

pub fn record_outcome(tier: &str, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!(OUTCOMES_TOTAL, "tier" => tier.to_string(), "result" => result).increment(1);
}

pub fn record_fallback() {
    counter!(FALLBACKS_TOTAL).increment(1);
}

pub fn record_canary_rollback(tenant: &str) {
    counter!(CANARY_ROLLBACKS_TOTAL, "tenant" => tenant.to_string()).increment(1);
}
