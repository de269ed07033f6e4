// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: fractions in [0, 1], positive windows, ordered thresholds.
//! Collects all errors instead of failing fast.

use thiserror::Error;

use crate::model::StrataConfig;

/// A configuration validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {message}")]
    Validation { message: String },
}

fn check_fraction(errors: &mut Vec<ConfigError>, name: &str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ConfigError::Validation {
            message: format!("{name} must be in [0, 1], got {value}"),
        });
    }
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` or all collected validation errors.
pub fn validate_config(config: &StrataConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.router.store_timeout_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "router.store_timeout_ms must be positive".to_string(),
        });
    }

    check_fraction(&mut errors, "classifier.review_margin", config.classifier.review_margin);
    if config.classifier.calibration_window == 0 {
        errors.push(ConfigError::Validation {
            message: "classifier.calibration_window must be positive".to_string(),
        });
    }

    if config.bandit.exploration_constant < 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "bandit.exploration_constant must be non-negative, got {}",
                config.bandit.exploration_constant
            ),
        });
    }
    if config.bandit.cost_weight < 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "bandit.cost_weight must be non-negative, got {}",
                config.bandit.cost_weight
            ),
        });
    }

    let ee = &config.early_exit;
    check_fraction(&mut errors, "early_exit.min_strictness", ee.min_strictness);
    check_fraction(&mut errors, "early_exit.strict_strictness", ee.strict_strictness);
    check_fraction(&mut errors, "early_exit.strict_max_complexity", ee.strict_max_complexity);
    check_fraction(&mut errors, "early_exit.max_complexity", ee.max_complexity);
    check_fraction(&mut errors, "early_exit.max_novelty", ee.max_novelty);
    check_fraction(&mut errors, "early_exit.max_failure_rate", ee.max_failure_rate);
    check_fraction(&mut errors, "early_exit.min_confidence", ee.min_confidence);
    for (tenant, overrides) in &ee.tenants {
        if let Some(v) = overrides.min_strictness {
            check_fraction(&mut errors, &format!("early_exit.tenants.{tenant}.min_strictness"), v);
        }
        if let Some(v) = overrides.max_complexity {
            check_fraction(&mut errors, &format!("early_exit.tenants.{tenant}.max_complexity"), v);
        }
    }

    let esc = &config.escalation;
    check_fraction(&mut errors, "escalation.confidence_threshold", esc.confidence_threshold);
    check_fraction(&mut errors, "escalation.failure_rate_threshold", esc.failure_rate_threshold);
    check_fraction(&mut errors, "escalation.novelty_threshold", esc.novelty_threshold);
    check_fraction(&mut errors, "escalation.enterprise_complexity", esc.enterprise_complexity);
    check_fraction(&mut errors, "escalation.schema_minimum", esc.schema_minimum);
    for (tenant, overrides) in &esc.tenants {
        if let Some(v) = overrides.confidence_threshold {
            check_fraction(
                &mut errors,
                &format!("escalation.tenants.{tenant}.confidence_threshold"),
                v,
            );
        }
        if let Some(v) = overrides.schema_minimum {
            check_fraction(&mut errors, &format!("escalation.tenants.{tenant}.schema_minimum"), v);
        }
    }

    let canary = &config.canary;
    check_fraction(&mut errors, "canary.percentage", canary.percentage);
    check_fraction(&mut errors, "canary.quality_threshold", canary.quality_threshold);
    check_fraction(&mut errors, "canary.rollback_threshold", canary.rollback_threshold);
    if canary.min_requests == 0 {
        errors.push(ConfigError::Validation {
            message: "canary.min_requests must be positive".to_string(),
        });
    }
    if canary.evaluation_window_seconds == 0 {
        errors.push(ConfigError::Validation {
            message: "canary.evaluation_window_seconds must be positive".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
