// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Strata routing core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. Defaults match the documented routing
//! thresholds, so an empty config file yields a fully working router.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level Strata configuration.
///
/// Loaded from TOML with environment variable overrides. All sections are
/// optional and default to the documented threshold values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StrataConfig {
    /// Orchestrator-level settings.
    #[serde(default)]
    pub router: RouterConfig,

    /// Calibrated classifier settings.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Bandit policy settings.
    #[serde(default)]
    pub bandit: BanditConfig,

    /// Early-exit gate settings and per-tenant overrides.
    #[serde(default)]
    pub early_exit: EarlyExitConfig,

    /// Escalation rule settings and per-tenant overrides.
    #[serde(default)]
    pub escalation: EscalationConfig,

    /// Defaults materialized for tenants without a stored canary config.
    #[serde(default)]
    pub canary: CanaryDefaultsConfig,
}

/// Orchestrator-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Deadline for individual store calls made on the decision path, in
    /// milliseconds. A timeout is a recoverable failure, never a retry loop.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: default_store_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

fn default_store_timeout_ms() -> u64 {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Calibrated classifier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Top-two probability margin below which a prediction needs review.
    #[serde(default = "default_review_margin")]
    pub review_margin: f64,

    /// Number of recent (confidence, success) pairs kept for recalibration.
    #[serde(default = "default_calibration_window")]
    pub calibration_window: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            review_margin: default_review_margin(),
            calibration_window: default_calibration_window(),
        }
    }
}

fn default_review_margin() -> f64 {
    0.15
}

fn default_calibration_window() -> usize {
    200
}

/// Bandit policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BanditConfig {
    /// UCB exploration constant k in `mean + k*sqrt(ln(total+1)/(pulls+1))`.
    #[serde(default = "default_exploration_constant")]
    pub exploration_constant: f64,

    /// Weight of the mean-cost penalty subtracted from the arm value.
    #[serde(default = "default_cost_weight")]
    pub cost_weight: f64,
}

impl Default for BanditConfig {
    fn default() -> Self {
        Self {
            exploration_constant: default_exploration_constant(),
            cost_weight: default_cost_weight(),
        }
    }
}

fn default_exploration_constant() -> f64 {
    std::f64::consts::SQRT_2
}

fn default_cost_weight() -> f64 {
    0.3
}

/// Early-exit gate configuration.
///
/// Hard bounds that must all hold for an exit, plus per-tenant overrides
/// for the strict structural-validation sub-check.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EarlyExitConfig {
    /// Minimum schema strictness for any exit.
    #[serde(default = "default_min_strictness")]
    pub min_strictness: f64,

    /// Strict structural check: minimum strictness.
    #[serde(default = "default_strict_strictness")]
    pub strict_strictness: f64,

    /// Strict structural check: maximum complexity.
    #[serde(default = "default_strict_max_complexity")]
    pub strict_max_complexity: f64,

    /// Maximum token estimate for an exit.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Maximum request complexity for an exit.
    #[serde(default = "default_max_complexity")]
    pub max_complexity: f64,

    /// Maximum novelty score for an exit.
    #[serde(default = "default_max_novelty")]
    pub max_novelty: f64,

    /// Maximum historical failure rate for an exit.
    #[serde(default = "default_max_failure_rate")]
    pub max_failure_rate: f64,

    /// Compounded confidence below which the exit is denied.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Per-tenant overrides for the strict structural check.
    #[serde(default)]
    pub tenants: HashMap<String, EarlyExitOverrides>,
}

impl Default for EarlyExitConfig {
    fn default() -> Self {
        Self {
            min_strictness: default_min_strictness(),
            strict_strictness: default_strict_strictness(),
            strict_max_complexity: default_strict_max_complexity(),
            max_tokens: default_max_tokens(),
            max_complexity: default_max_complexity(),
            max_novelty: default_max_novelty(),
            max_failure_rate: default_max_failure_rate(),
            min_confidence: default_min_confidence(),
            tenants: HashMap::new(),
        }
    }
}

fn default_min_strictness() -> f64 {
    0.9
}

fn default_strict_strictness() -> f64 {
    0.8
}

fn default_strict_max_complexity() -> f64 {
    0.3
}

fn default_max_tokens() -> u32 {
    150
}

fn default_max_complexity() -> f64 {
    0.2
}

fn default_max_novelty() -> f64 {
    0.3
}

fn default_max_failure_rate() -> f64 {
    0.1
}

fn default_min_confidence() -> f64 {
    0.9
}

/// Tenant-specific tightenings of the strict structural check.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EarlyExitOverrides {
    /// Minimum strictness override.
    #[serde(default)]
    pub min_strictness: Option<f64>,

    /// Maximum complexity override.
    #[serde(default)]
    pub max_complexity: Option<f64>,

    /// Maximum token estimate override.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Escalation rule configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EscalationConfig {
    /// Classifier confidence below this escalates (low_confidence).
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Failure rate above this escalates (high_risk).
    #[serde(default = "default_failure_rate_threshold")]
    pub failure_rate_threshold: f64,

    /// Novelty above this escalates (novel_request).
    #[serde(default = "default_novelty_threshold")]
    pub novelty_threshold: f64,

    /// Complexity above this escalates enterprise users (enterprise_complex).
    #[serde(default = "default_enterprise_complexity")]
    pub enterprise_complexity: f64,

    /// Schema strictness below this escalates (schema_validation_failed).
    #[serde(default = "default_schema_minimum")]
    pub schema_minimum: f64,

    /// Per-tenant overrides for the confidence and schema thresholds.
    #[serde(default)]
    pub tenants: HashMap<String, EscalationOverrides>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            failure_rate_threshold: default_failure_rate_threshold(),
            novelty_threshold: default_novelty_threshold(),
            enterprise_complexity: default_enterprise_complexity(),
            schema_minimum: default_schema_minimum(),
            tenants: HashMap::new(),
        }
    }
}

fn default_confidence_threshold() -> f64 {
    0.8
}

fn default_failure_rate_threshold() -> f64 {
    0.5
}

fn default_novelty_threshold() -> f64 {
    0.8
}

fn default_enterprise_complexity() -> f64 {
    0.7
}

fn default_schema_minimum() -> f64 {
    0.7
}

/// Tenant-specific escalation thresholds.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EscalationOverrides {
    /// Confidence threshold override.
    #[serde(default)]
    pub confidence_threshold: Option<f64>,

    /// Schema minimum override.
    #[serde(default)]
    pub schema_minimum: Option<f64>,
}

/// Defaults materialized (and persisted) the first time a tenant's canary
/// configuration is read from the store.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CanaryDefaultsConfig {
    /// Fraction of users in the canary population, in [0, 1].
    #[serde(default = "default_canary_percentage")]
    pub percentage: f64,

    /// Quality score below which rollback triggers.
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,

    /// Minimum recorded outcomes before rollback decisions.
    #[serde(default = "default_min_requests")]
    pub min_requests: u64,

    /// Rollback evaluation window in seconds.
    #[serde(default = "default_evaluation_window_seconds")]
    pub evaluation_window_seconds: u64,

    /// Maximum tolerated drop below the baseline quality.
    #[serde(default = "default_rollback_threshold")]
    pub rollback_threshold: f64,

    /// Requests under this token estimate trial Tier A; others Tier B.
    #[serde(default = "default_tier_token_threshold")]
    pub tier_token_threshold: u32,
}

impl Default for CanaryDefaultsConfig {
    fn default() -> Self {
        Self {
            percentage: default_canary_percentage(),
            quality_threshold: default_quality_threshold(),
            min_requests: default_min_requests(),
            evaluation_window_seconds: default_evaluation_window_seconds(),
            rollback_threshold: default_rollback_threshold(),
            tier_token_threshold: default_tier_token_threshold(),
        }
    }
}

fn default_canary_percentage() -> f64 {
    0.1
}

fn default_quality_threshold() -> f64 {
    0.85
}

fn default_min_requests() -> u64 {
    100
}

fn default_evaluation_window_seconds() -> u64 {
    3600
}

fn default_rollback_threshold() -> f64 {
    0.1
}

fn default_tier_token_threshold() -> u32 {
    500
}
