// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temperature refitting from recent outcomes.
//!
//! Reported confidence is only useful if it tracks empirical accuracy.
//! The calibration pass compares mean confidence against mean success
//! over the recent window and nudges the temperature toward agreement:
//! overconfident tenants get a higher temperature (flatter
//! distributions), underconfident ones a lower temperature.

use chrono::Utc;
use tracing::info;

use strata_core::StrataError;
use strata_store::{RouterStore, STATE_TTL, keys};

/// Identity scaling; applied until a tenant has calibration history.
pub const DEFAULT_TEMPERATURE: f64 = 1.0;

/// Temperature clamp bounds.
const MIN_TEMPERATURE: f64 = 0.25;
const MAX_TEMPERATURE: f64 = 4.0;

/// Multiplicative adjustment per calibration pass.
const ADJUST_STEP: f64 = 1.1;

/// Calibration gap below which the temperature is left alone.
const GAP_TOLERANCE: f64 = 0.05;

/// Observations required before any refit.
const MIN_OBSERVATIONS: usize = 10;

/// Append one (confidence, success) pair to the tenant's window.
pub async fn record_observation(
    store: &dyn RouterStore,
    tenant: &str,
    confidence: f64,
    success: bool,
    window: usize,
) -> Result<(), StrataError> {
    let entry = format!("{confidence:.6}:{}", u8::from(success));
    store
        .list_push_capped(&keys::calibration_window(tenant), &entry, window)
        .await
}

/// Refit the tenant's temperature from the observation window.
///
/// Returns the (possibly unchanged) temperature now in effect.
pub async fn calibrate(store: &dyn RouterStore, tenant: &str) -> Result<f64, StrataError> {
    let current: f64 = store
        .hash_get(&keys::calibration(tenant), "temperature")
        .await?
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_TEMPERATURE);

    let raw_window = store.list_range(&keys::calibration_window(tenant)).await?;
    let observations: Vec<(f64, bool)> = raw_window.iter().filter_map(|e| parse_entry(e)).collect();
    if observations.len() < MIN_OBSERVATIONS {
        return Ok(current);
    }

    let n = observations.len() as f64;
    let mean_confidence: f64 = observations.iter().map(|(c, _)| c).sum::<f64>() / n;
    let accuracy: f64 =
        observations.iter().filter(|(_, ok)| *ok).count() as f64 / n;
    let gap = mean_confidence - accuracy;

    let next = if gap > GAP_TOLERANCE {
        // Overconfident: soften.
        (current * ADJUST_STEP).min(MAX_TEMPERATURE)
    } else if gap < -GAP_TOLERANCE {
        // Underconfident: sharpen.
        (current / ADJUST_STEP).max(MIN_TEMPERATURE)
    } else {
        current
    };

    if (next - current).abs() > f64::EPSILON {
        let key = keys::calibration(tenant);
        store
            .hash_set(&key, "temperature", &format!("{next:.6}"))
            .await?;
        store
            .hash_set(&key, "updated_at", &Utc::now().to_rfc3339())
            .await?;
        store.expire(&key, STATE_TTL).await?;
        info!(
            tenant,
            mean_confidence,
            accuracy,
            old_temperature = current,
            new_temperature = next,
            "recalibrated classifier temperature"
        );
    }

    Ok(next)
}

fn parse_entry(entry: &str) -> Option<(f64, bool)> {
    let (confidence, success) = entry.rsplit_once(':')?;
    Some((confidence.parse().ok()?, success == "1"))
}
