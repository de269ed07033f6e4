// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Value objects exchanged between the routing pipeline stages.
//!
//! Diagnostic payloads are explicit structs per component rather than
//! untyped maps, so the contract between stages holds at compile time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::tier::Tier;

/// Engineered features for one request, produced once by the extractor
/// and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterFeatures {
    /// Rough token estimate (text length / 4).
    pub token_count: u32,
    /// Presence of structured-data/validation markers, in [0, 1].
    pub schema_strictness: f64,
    /// Keyword-matched domain flags (customer_support, sales, technical, billing).
    pub domain_flags: HashMap<String, bool>,
    /// 1 minus max Jaccard similarity against the tenant's recent requests.
    pub novelty_score: f64,
    /// Historical failure rate for this user (tenant-level fallback).
    pub historical_failure_rate: f64,
    /// User tier from the identity source ("standard", "premium", "enterprise").
    pub user_tier: String,
    /// Hour of day in UTC, 0-23.
    pub time_of_day: u8,
    /// Day of week, 0 = Monday.
    pub day_of_week: u8,
    /// Weighted length/field/nesting heuristic, in [0, 1].
    pub request_complexity: f64,
}

impl RouterFeatures {
    /// Neutral defaults substituted when a sub-computation fails.
    pub fn neutral() -> Self {
        Self {
            token_count: 100,
            schema_strictness: 0.5,
            domain_flags: HashMap::new(),
            novelty_score: 0.5,
            historical_failure_rate: 0.1,
            user_tier: "standard".to_string(),
            time_of_day: 0,
            day_of_week: 0,
            request_complexity: 0.5,
        }
    }

    /// Whether a domain flag is set.
    pub fn has_domain(&self, domain: &str) -> bool {
        self.domain_flags.get(domain).copied().unwrap_or(false)
    }
}

/// Why routing was forced to a more expensive tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    LowConfidence,
    HighRisk,
    NovelRequest,
    EnterpriseComplex,
    SchemaValidationFailed,
    JsonValidationFailed,
}

/// Combined result of the early-exit and escalation evaluations.
///
/// `should_escalate` and `early_exit` are mutually exclusive outcomes of
/// the same evaluation pass; the orchestrator applies precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationDecision {
    /// Whether routing must move to a more expensive tier.
    pub should_escalate: bool,
    /// Primary (first violated) escalation reason.
    pub reason: Option<EscalationReason>,
    /// Every violated reason, retained for analytics.
    pub all_reasons: Vec<EscalationReason>,
    /// Tier to route to when escalating.
    pub target_tier: Tier,
    /// Confidence attached to the escalation verdict.
    pub confidence: f64,
    /// Early-exit fast path, when granted.
    pub early_exit: Option<EarlyExitOutcome>,
}

/// A granted or evaluated early exit to the cheapest tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarlyExitOutcome {
    /// Whether the exit was granted.
    pub granted: bool,
    /// Compounded confidence after multiplicative gate penalties.
    ///
    /// Surfaced even when the exit is denied, so partial violations
    /// remain observable.
    pub confidence: f64,
    /// Target tier of the fast path (always the cheapest).
    pub tier: Tier,
}

/// Classifier diagnostics attached to a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierInfo {
    pub predicted_tier: Tier,
    /// Calibrated probability of the arg-max tier.
    pub confidence: f64,
    /// Calibrated probability per tier, in `Tier::ALL` order.
    pub probabilities: [f64; 3],
    /// Top-two margin was within the review threshold.
    pub needs_review: bool,
    /// Tenant temperature applied during calibration.
    pub temperature: f64,
}

/// Bandit diagnostics attached to a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanditInfo {
    pub chosen_tier: Tier,
    /// UCB-style value of the chosen arm.
    pub value: f64,
    /// Value per arm, in `Tier::ALL` order.
    pub arm_values: [f64; 3],
    /// The chosen arm had never been pulled.
    pub untried: bool,
}

/// Canary diagnostics attached to a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanaryInfo {
    /// The user fell inside the canary population.
    pub in_canary: bool,
    /// Stable hash bucket of (tenant, user) in [0, 1).
    pub bucket: f64,
    /// Trial tier assigned, when in the canary.
    pub canary_tier: Option<Tier>,
}

/// Which pipeline path produced the final tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DecisionPath {
    Canary,
    EarlyExit,
    Bandit,
    Escalated,
    Fallback,
}

/// The output of one routing call. Transient; persisted only as metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterDecision {
    pub tier: Tier,
    pub confidence: f64,
    pub decision_time_ms: f64,
    pub path: DecisionPath,
    pub features: RouterFeatures,
    pub escalation: Option<EscalationDecision>,
    pub classifier: Option<ClassifierInfo>,
    pub bandit: Option<BanditInfo>,
    pub canary: Option<CanaryInfo>,
    /// Error text when the fallback path was taken.
    pub fallback_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn neutral_features_match_documented_defaults() {
        let f = RouterFeatures::neutral();
        assert_eq!(f.token_count, 100);
        assert!((f.schema_strictness - 0.5).abs() < f64::EPSILON);
        assert!((f.novelty_score - 0.5).abs() < f64::EPSILON);
        assert!((f.historical_failure_rate - 0.1).abs() < f64::EPSILON);
        assert!((f.request_complexity - 0.5).abs() < f64::EPSILON);
        assert_eq!(f.user_tier, "standard");
    }

    #[test]
    fn escalation_reason_snake_case_round_trip() {
        let reasons = [
            EscalationReason::LowConfidence,
            EscalationReason::HighRisk,
            EscalationReason::NovelRequest,
            EscalationReason::EnterpriseComplex,
            EscalationReason::SchemaValidationFailed,
            EscalationReason::JsonValidationFailed,
        ];
        for reason in reasons {
            let s = reason.to_string();
            assert_eq!(s, s.to_lowercase(), "display must be snake_case: {s}");
            assert_eq!(EscalationReason::from_str(&s).unwrap(), reason);
        }
        assert_eq!(
            EscalationReason::LowConfidence.to_string(),
            "low_confidence"
        );
    }

    #[test]
    fn has_domain_defaults_to_false() {
        let mut f = RouterFeatures::neutral();
        assert!(!f.has_domain("billing"));
        f.domain_flags.insert("billing".to_string(), true);
        assert!(f.has_domain("billing"));
    }

    #[test]
    fn decision_serializes_with_nested_info() {
        let decision = RouterDecision {
            tier: Tier::B,
            confidence: 0.5,
            decision_time_ms: 1.2,
            path: DecisionPath::Fallback,
            features: RouterFeatures::neutral(),
            escalation: None,
            classifier: None,
            bandit: None,
            canary: Some(CanaryInfo {
                in_canary: false,
                bucket: 0.42,
                canary_tier: None,
            }),
            fallback_error: Some("store unreachable".to_string()),
        };
        let json = serde_json::to_string(&decision).expect("should serialize");
        assert!(json.contains("\"path\":\"fallback\""));
        assert!(json.contains("store unreachable"));
    }
}
