// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key schema for per-tenant state.
//!
//! Every key embeds the tenant id. Components only ever build keys through
//! these constructors, which is how tenant isolation is enforced: there is
//! no code path that reads or writes another tenant's partition.

use strata_core::Tier;

/// Cached feature vector for one request content hash.
pub fn feature_cache(tenant: &str, content_hash: &str) -> String {
    format!("strata:{tenant}:features:{content_hash}")
}

/// Bounded list of recent request texts, for novelty scoring.
pub fn recent_requests(tenant: &str) -> String {
    format!("strata:{tenant}:recent_requests")
}

/// Per-user historical failure rate.
pub fn user_failure_rate(tenant: &str, user: &str) -> String {
    format!("strata:{tenant}:failure_rate:{user}")
}

/// Tenant-level failure rate, the per-user fallback.
pub fn tenant_failure_rate(tenant: &str) -> String {
    format!("strata:{tenant}:failure_rate")
}

/// Per-user service tier from the identity source.
pub fn user_tier(tenant: &str, user: &str) -> String {
    format!("strata:{tenant}:user_tier:{user}")
}

/// Decision-time state (confidence, escalation reason) replayed when the
/// outcome for that user is reported.
pub fn last_decision(tenant: &str, user: &str) -> String {
    format!("strata:{tenant}:last_decision:{user}")
}

/// Bandit arm state hash for one tier.
pub fn bandit_arm(tenant: &str, tier: Tier) -> String {
    format!("strata:{tenant}:bandit:arm:{tier}")
}

/// Per-tenant calibration state (temperature).
pub fn calibration(tenant: &str) -> String {
    format!("strata:{tenant}:calibration")
}

/// Window of (predicted confidence, outcome) pairs feeding recalibration.
pub fn calibration_window(tenant: &str) -> String {
    format!("strata:{tenant}:calibration:window")
}

/// Canary configuration hash.
pub fn canary_config(tenant: &str) -> String {
    format!("strata:{tenant}:canary:config")
}

/// Canary rolling metrics hash.
pub fn canary_metrics(tenant: &str) -> String {
    format!("strata:{tenant}:canary:metrics")
}

/// Canary lifecycle status value.
pub fn canary_status(tenant: &str) -> String {
    format!("strata:{tenant}:canary:status")
}

/// Per-reason escalation outcome counters.
pub fn escalation_stats(tenant: &str) -> String {
    format!("strata:{tenant}:escalation:stats")
}

/// Aggregated decision/outcome counters.
pub fn decision_metrics(tenant: &str) -> String {
    format!("strata:{tenant}:metrics")
}

/// Bounded decision latency sample set.
pub fn latency_samples(tenant: &str) -> String {
    format!("strata:{tenant}:metrics:latency")
}
