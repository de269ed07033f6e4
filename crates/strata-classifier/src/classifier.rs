// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Calibrated tier classification.
//!
//! A linear scoring function maps the feature vector to a raw per-tier
//! likelihood, which is softmaxed under the tenant's temperature before
//! taking the arg-max. The temperature is the calibration knob: values
//! above 1 soften overconfident scores, values below 1 sharpen them.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use strata_config::model::ClassifierConfig;
use strata_core::{ClassifierInfo, RouterFeatures, StrataError, Tier};
use strata_store::{RouterStore, keys};

use crate::calibration;

/// Maps `RouterFeatures` to a predicted tier with calibrated confidence.
pub struct CalibratedClassifier {
    store: Arc<dyn RouterStore>,
    config: ClassifierConfig,
    store_timeout: Duration,
}

impl CalibratedClassifier {
    pub fn new(
        store: Arc<dyn RouterStore>,
        config: ClassifierConfig,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            config,
            store_timeout,
        }
    }

    /// Classify a feature vector under the tenant's calibration state.
    ///
    /// Never fails: a missing or unreadable temperature falls back to 1.0
    /// (identity scaling).
    pub async fn classify(&self, features: &RouterFeatures, tenant: &str) -> ClassifierInfo {
        let temperature = self.temperature(tenant).await;
        let raw = raw_scores(features);
        let probabilities = softmax(raw, temperature);

        // Arg-max over the calibrated distribution.
        let (best_idx, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((1, 0.0));
        let predicted_tier = Tier::ALL[best_idx];

        let mut sorted = probabilities;
        sorted.sort_by(|a, b| b.total_cmp(a));
        let needs_review = (sorted[0] - sorted[1]) < self.config.review_margin;

        ClassifierInfo {
            predicted_tier,
            confidence,
            probabilities,
            needs_review,
            temperature,
        }
    }

    async fn temperature(&self, tenant: &str) -> f64 {
        let lookup = tokio::time::timeout(
            self.store_timeout,
            self.store.hash_get(&keys::calibration(tenant), "temperature"),
        )
        .await;
        match lookup {
            Ok(Ok(Some(raw))) => raw
                .parse()
                .unwrap_or(calibration::DEFAULT_TEMPERATURE),
            Ok(Ok(None)) => calibration::DEFAULT_TEMPERATURE,
            Ok(Err(error)) => {
                warn!(tenant, %error, "calibration lookup failed; using default temperature");
                calibration::DEFAULT_TEMPERATURE
            }
            Err(_) => {
                warn!(tenant, "calibration lookup timed out; using default temperature");
                calibration::DEFAULT_TEMPERATURE
            }
        }
    }

    /// Record one (confidence, success) observation into the tenant's
    /// calibration window. Called from outcome recording, not the hot path.
    pub async fn record_outcome(
        &self,
        tenant: &str,
        confidence: f64,
        success: bool,
    ) -> Result<(), StrataError> {
        calibration::record_observation(
            self.store.as_ref(),
            tenant,
            confidence,
            success,
            self.config.calibration_window,
        )
        .await
    }

    /// Refit the tenant's temperature from the recent outcome window.
    /// Runs as a background/periodic pass, never inline with `classify`.
    pub async fn calibrate(&self, tenant: &str) -> Result<f64, StrataError> {
        calibration::calibrate(self.store.as_ref(), tenant).await
    }
}

/// Raw tier-likelihood vector in `Tier::ALL` order.
///
/// A single demand scalar summarizes how much capability the request
/// needs; tier A peaks at low demand, B at mid, C at high.
pub fn raw_scores(features: &RouterFeatures) -> [f64; 3] {
    let token_factor = (features.token_count as f64 / 1000.0).min(1.0);
    let demand = (0.35 * features.request_complexity
        + 0.25 * token_factor
        + 0.20 * features.novelty_score
        + 0.10 * features.historical_failure_rate
        + 0.10 * (1.0 - features.schema_strictness))
        .clamp(0.0, 1.0);

    [
        1.0 - demand,
        1.0 - (demand - 0.5).abs() * 2.0,
        demand,
    ]
}

/// Temperature-scaled softmax.
fn softmax(scores: [f64; 3], temperature: f64) -> [f64; 3] {
    let t = temperature.max(1e-3);
    let max = scores.iter().copied().fold(f64::MIN, f64::max);
    let exps = scores.map(|s| ((s - max) / t).exp());
    let sum: f64 = exps.iter().sum();
    exps.map(|e| e / sum)
}
