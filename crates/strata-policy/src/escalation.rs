// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation rules: force routing one step up per violated risk signal.
//!
//! Escalation is monotonic (A to B to C, capped at C). The first
//! violated rule is reported as the primary reason; all violated rules
//! are retained for analytics.

use std::collections::HashMap;

use strata_config::model::EscalationConfig;
use strata_core::{EscalationReason, RouterFeatures, StrataError, Tier};
use strata_store::{RouterStore, STATE_TTL, keys};

/// Looser JSON-structure check thresholds: structure-free but complex
/// payloads are risky enough to escalate.
const LOOSE_MAX_STRICTNESS: f64 = 0.4;
const LOOSE_MIN_COMPLEXITY: f64 = 0.6;

/// Evaluate every escalation rule against one request.
///
/// Returns the violated reasons in rule order and the target tier after
/// one escalation step per violation.
pub fn evaluate(
    features: &RouterFeatures,
    predicted_tier: Tier,
    confidence: f64,
    tenant: &str,
    config: &EscalationConfig,
) -> (Vec<EscalationReason>, Tier) {
    let overrides = config.tenants.get(tenant);
    let confidence_threshold = overrides
        .and_then(|o| o.confidence_threshold)
        .unwrap_or(config.confidence_threshold);
    let schema_minimum = overrides
        .and_then(|o| o.schema_minimum)
        .unwrap_or(config.schema_minimum);

    let mut reasons = Vec::new();
    if confidence < confidence_threshold {
        reasons.push(EscalationReason::LowConfidence);
    }
    if features.historical_failure_rate > config.failure_rate_threshold {
        reasons.push(EscalationReason::HighRisk);
    }
    if features.novelty_score > config.novelty_threshold {
        reasons.push(EscalationReason::NovelRequest);
    }
    if features.user_tier == "enterprise" && features.request_complexity > config.enterprise_complexity
    {
        reasons.push(EscalationReason::EnterpriseComplex);
    }
    if features.schema_strictness < schema_minimum {
        reasons.push(EscalationReason::SchemaValidationFailed);
    }
    if features.schema_strictness < LOOSE_MAX_STRICTNESS
        && features.request_complexity > LOOSE_MIN_COMPLEXITY
    {
        reasons.push(EscalationReason::JsonValidationFailed);
    }

    let mut target = predicted_tier;
    for _ in &reasons {
        target = target.escalate();
    }
    (reasons, target)
}

/// Per-reason outcome statistics for escalated requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReasonStats {
    pub total: u64,
    pub successes: u64,
    pub cumulative_latency_ms: f64,
}

impl ReasonStats {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successes as f64 / self.total as f64
        }
    }
}

/// Record the outcome of an escalated request for later success-rate
/// analysis.
pub async fn record_outcome(
    store: &dyn RouterStore,
    tenant: &str,
    reason: EscalationReason,
    success: bool,
    latency_ms: f64,
) -> Result<(), StrataError> {
    let key = keys::escalation_stats(tenant);
    store.hash_incr(&key, &format!("{reason}:total"), 1).await?;
    if success {
        store
            .hash_incr(&key, &format!("{reason}:success"), 1)
            .await?;
    }
    store
        .hash_incr_f64(&key, &format!("{reason}:latency_ms"), latency_ms)
        .await?;
    store.expire(&key, STATE_TTL).await?;
    Ok(())
}

/// Read back per-reason escalation statistics.
pub async fn statistics(
    store: &dyn RouterStore,
    tenant: &str,
) -> Result<HashMap<EscalationReason, ReasonStats>, StrataError> {
    let hash = store.hash_get_all(&keys::escalation_stats(tenant)).await?;
    let mut stats: HashMap<EscalationReason, ReasonStats> = HashMap::new();
    for (field, value) in hash {
        let Some((reason_str, metric)) = field.rsplit_once(':') else {
            continue;
        };
        let Ok(reason) = reason_str.parse::<EscalationReason>() else {
            continue;
        };
        let entry = stats.entry(reason).or_default();
        match metric {
            "total" => entry.total = value.parse().unwrap_or(0),
            "success" => entry.successes = value.parse().unwrap_or(0),
            "latency_ms" => entry.cumulative_latency_ms = value.parse().unwrap_or(0.0),
            _ => {}
        }
    }
    Ok(stats)
}
