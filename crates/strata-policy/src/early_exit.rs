// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The early-exit gate: bypass classification and the bandit and answer
//! on the cheapest tier, but only when strict safety conditions hold.
//!
//! This is a conjunctive gate with multiplicative penalties, not a plain
//! boolean AND: every violated condition multiplies the running
//! confidence by its factor, and the exit is granted only when the
//! compounded confidence stays at or above the configured minimum.
//! Partial violations therefore still surface as a reduced confidence
//! for observability even when the exit is denied.

use strata_config::model::EarlyExitConfig;
use strata_core::{EarlyExitOutcome, RouterFeatures, Tier};

/// Penalty factors per violated condition.
const PENALTY_STRICTNESS: f64 = 0.2;
const PENALTY_STRUCTURAL: f64 = 0.1;
const PENALTY_TOKENS: f64 = 0.5;
const PENALTY_COMPLEXITY: f64 = 0.3;
const PENALTY_NOVELTY: f64 = 0.5;
const PENALTY_FAILURE_RATE: f64 = 0.4;
const PENALTY_DOMAIN: f64 = 0.6;

/// Domain sub-thresholds: customer_support and sales allow the exit
/// under tighter bounds than the global gate; technical and billing
/// domains always deny.
const SUPPORT_MAX_TOKENS: u32 = 120;
const SUPPORT_MAX_NOVELTY: f64 = 0.25;
const SALES_MAX_TOKENS: u32 = 100;
const SALES_MAX_COMPLEXITY: f64 = 0.15;

/// Evaluate the early-exit gate for one request.
pub fn evaluate(features: &RouterFeatures, tenant: &str, config: &EarlyExitConfig) -> EarlyExitOutcome {
    let overrides = config.tenants.get(tenant);
    let mut confidence = 1.0_f64;

    if features.schema_strictness < config.min_strictness {
        confidence *= PENALTY_STRICTNESS;
    }
    if !structural_check(features, tenant, config) {
        confidence *= PENALTY_STRUCTURAL;
    }

    let max_tokens = overrides
        .and_then(|o| o.max_tokens)
        .unwrap_or(config.max_tokens);
    if features.token_count > max_tokens {
        confidence *= PENALTY_TOKENS;
    }
    if features.request_complexity > config.max_complexity {
        confidence *= PENALTY_COMPLEXITY;
    }
    if features.novelty_score > config.max_novelty {
        confidence *= PENALTY_NOVELTY;
    }
    if features.historical_failure_rate > config.max_failure_rate {
        confidence *= PENALTY_FAILURE_RATE;
    }
    if !domain_allows(features) {
        confidence *= PENALTY_DOMAIN;
    }

    EarlyExitOutcome {
        granted: confidence >= config.min_confidence,
        confidence,
        tier: Tier::cheapest(),
    }
}

/// Strict structural/JSON validation: high strictness and low complexity,
/// with tenant-specific tightenings.
pub fn structural_check(
    features: &RouterFeatures,
    tenant: &str,
    config: &EarlyExitConfig,
) -> bool {
    let overrides = config.tenants.get(tenant);
    let min_strictness = overrides
        .and_then(|o| o.min_strictness)
        .unwrap_or(config.strict_strictness);
    let max_complexity = overrides
        .and_then(|o| o.max_complexity)
        .unwrap_or(config.strict_max_complexity);
    let max_tokens = overrides.and_then(|o| o.max_tokens);

    features.schema_strictness > min_strictness
        && features.request_complexity < max_complexity
        && max_tokens.is_none_or(|cap| features.token_count <= cap)
}

/// Domain allow rule: customer_support/sales under tighter sub-bounds;
/// technical/billing always deny; unrecognized traffic denies.
fn domain_allows(features: &RouterFeatures) -> bool {
    if features.has_domain("technical") || features.has_domain("billing") {
        return false;
    }
    if features.has_domain("customer_support") {
        return features.token_count <= SUPPORT_MAX_TOKENS
            && features.novelty_score <= SUPPORT_MAX_NOVELTY;
    }
    if features.has_domain("sales") {
        return features.token_count <= SALES_MAX_TOKENS
            && features.request_complexity <= SALES_MAX_COMPLEXITY;
    }
    false
}
