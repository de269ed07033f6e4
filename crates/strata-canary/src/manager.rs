// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canary traffic assignment and quality-based auto-rollback.
//!
//! Membership is a stable hash of (tenant, user): the same user lands in
//! the same bucket on every request, so canary exposure is per-user, not
//! per-request. Outcome metrics are kept as atomic cumulative sums and
//! averaged on read, which keeps concurrent recording lossless.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use strata_config::model::CanaryDefaultsConfig;
use strata_core::{CanaryInfo, StrataError, Tier};
use strata_store::{RouterStore, STATE_TTL, keys};

use crate::status::CanaryStatus;

/// Assumed baseline quality when no baseline has been recorded.
const DEFAULT_BASELINE_QUALITY: f64 = 0.9;

/// A tenant's effective canary configuration, materialized from the
/// deployment defaults on first access and persisted thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct CanaryConfig {
    pub percentage: f64,
    pub quality_threshold: f64,
    pub min_requests: u64,
    pub evaluation_window_seconds: u64,
    pub rollback_threshold: f64,
    pub tier_token_threshold: u32,
}

impl From<&CanaryDefaultsConfig> for CanaryConfig {
    fn from(defaults: &CanaryDefaultsConfig) -> Self {
        Self {
            percentage: defaults.percentage,
            quality_threshold: defaults.quality_threshold,
            min_requests: defaults.min_requests,
            evaluation_window_seconds: defaults.evaluation_window_seconds,
            rollback_threshold: defaults.rollback_threshold,
            tier_token_threshold: defaults.tier_token_threshold,
        }
    }
}

/// Rolling canary quality metrics, averaged from the stored sums.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanaryMetrics {
    pub total_requests: u64,
    pub successes: u64,
    pub average_quality: f64,
    pub average_latency_ms: f64,
    pub baseline_quality: f64,
}

/// Per-tenant canary deployment manager.
pub struct CanaryManager {
    store: Arc<dyn RouterStore>,
    defaults: CanaryDefaultsConfig,
    store_timeout: Duration,
}

impl CanaryManager {
    pub fn new(
        store: Arc<dyn RouterStore>,
        defaults: CanaryDefaultsConfig,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            defaults,
            store_timeout,
        }
    }

    /// The tenant's canary configuration. Materializes and persists the
    /// deployment defaults when no configuration is stored yet.
    pub async fn config(&self, tenant: &str) -> Result<CanaryConfig, StrataError> {
        let key = keys::canary_config(tenant);
        let hash = self.bounded(self.store.hash_get_all(&key)).await?;
        if hash.is_empty() {
            let config = CanaryConfig::from(&self.defaults);
            self.persist_config(tenant, &config).await?;
            return Ok(config);
        }
        let field = |name: &str| hash.get(name).map(String::as_str);
        let defaults = CanaryConfig::from(&self.defaults);
        Ok(CanaryConfig {
            percentage: parse_or(field("percentage"), defaults.percentage),
            quality_threshold: parse_or(field("quality_threshold"), defaults.quality_threshold),
            min_requests: parse_or(field("min_requests"), defaults.min_requests),
            evaluation_window_seconds: parse_or(
                field("evaluation_window_seconds"),
                defaults.evaluation_window_seconds,
            ),
            rollback_threshold: parse_or(field("rollback_threshold"), defaults.rollback_threshold),
            tier_token_threshold: parse_or(
                field("tier_token_threshold"),
                defaults.tier_token_threshold,
            ),
        })
    }

    /// Persist an operator-supplied configuration and activate the canary.
    pub async fn configure(&self, tenant: &str, config: &CanaryConfig) -> Result<(), StrataError> {
        if !(0.0..=1.0).contains(&config.percentage) {
            return Err(StrataError::Config(format!(
                "canary percentage must be in [0, 1], got {}",
                config.percentage
            )));
        }
        self.persist_config(tenant, config).await?;
        self.transition(tenant, CanaryStatus::Active).await?;
        info!(tenant, percentage = config.percentage, "canary activated");
        Ok(())
    }

    /// Current lifecycle status. Absent state reads as inactive.
    pub async fn status(&self, tenant: &str) -> Result<CanaryStatus, StrataError> {
        let raw = self.bounded(self.store.get(&keys::canary_status(tenant))).await?;
        Ok(raw
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(CanaryStatus::Inactive))
    }

    /// Decide canary membership and trial tier for one request.
    ///
    /// Outside an active canary every user reports `in_canary: false`,
    /// but the bucket is still computed for diagnostics.
    pub async fn should_use_canary(
        &self,
        tenant: &str,
        user: &str,
        token_count: u32,
    ) -> Result<CanaryInfo, StrataError> {
        let bucket = stable_bucket(tenant, user);
        let status = self.status(tenant).await?;
        if !status.is_serving() {
            return Ok(CanaryInfo {
                in_canary: false,
                bucket,
                canary_tier: None,
            });
        }
        let config = self.config(tenant).await?;
        if bucket >= config.percentage {
            return Ok(CanaryInfo {
                in_canary: false,
                bucket,
                canary_tier: None,
            });
        }
        // Short requests trial the cheap tier; long ones the balanced tier.
        let tier = if token_count < config.tier_token_threshold {
            Tier::A
        } else {
            Tier::B
        };
        Ok(CanaryInfo {
            in_canary: true,
            bucket,
            canary_tier: Some(tier),
        })
    }

    /// Whether the user belongs to the active canary population.
    ///
    /// Outcome recording uses this so callers never have to echo the
    /// original assignment back.
    pub async fn is_canary_member(&self, tenant: &str, user: &str) -> Result<bool, StrataError> {
        let status = self.status(tenant).await?;
        if !status.is_serving() {
            return Ok(false);
        }
        let config = self.config(tenant).await?;
        Ok(stable_bucket(tenant, user) < config.percentage)
    }

    /// Record one canary request outcome and run the rollback check.
    ///
    /// Returns `true` when this outcome triggered a rollback.
    pub async fn record_outcome(
        &self,
        tenant: &str,
        quality_score: f64,
        success: bool,
        latency_ms: f64,
    ) -> Result<bool, StrataError> {
        let key = keys::canary_metrics(tenant);
        let total = self.bounded(self.store.hash_incr(&key, "total", 1)).await?;
        if success {
            self.bounded(self.store.hash_incr(&key, "successes", 1)).await?;
        }
        let quality_sum = self
            .bounded(self.store.hash_incr_f64(&key, "quality_sum", quality_score))
            .await?;
        self.bounded(self.store.hash_incr_f64(&key, "latency_sum_ms", latency_ms))
            .await?;
        self.bounded(self.store.expire(&key, STATE_TTL)).await?;

        let config = self.config(tenant).await?;
        if (total as u64) < config.min_requests {
            return Ok(false);
        }
        let average_quality = quality_sum / total as f64;
        let baseline = self.baseline_quality(tenant).await?;
        let degraded = average_quality < config.quality_threshold
            || baseline - average_quality > config.rollback_threshold;
        if !degraded {
            return Ok(false);
        }

        let status = self.status(tenant).await?;
        if !status.can_transition_to(CanaryStatus::RollingBack) {
            return Ok(false);
        }
        warn!(
            tenant,
            average_quality,
            baseline,
            threshold = config.quality_threshold,
            "canary quality degraded, rolling back"
        );
        self.transition(tenant, CanaryStatus::RollingBack).await?;
        Ok(true)
    }

    /// Complete a rollback: stop canary traffic and discard trial metrics.
    pub async fn finish_rollback(&self, tenant: &str) -> Result<(), StrataError> {
        let status = self.status(tenant).await?;
        if !status.can_transition_to(CanaryStatus::RolledBack) {
            return Err(StrataError::Internal(format!(
                "cannot finish rollback from status {status}"
            )));
        }
        self.bounded(self.store.delete(&keys::canary_metrics(tenant)))
            .await?;
        self.transition(tenant, CanaryStatus::RolledBack).await?;
        info!(tenant, "canary rollback complete");
        Ok(())
    }

    /// Operator promotion of a healthy canary.
    pub async fn promote(&self, tenant: &str) -> Result<(), StrataError> {
        let status = self.status(tenant).await?;
        if !status.can_transition_to(CanaryStatus::Promoted) {
            return Err(StrataError::Internal(format!(
                "cannot promote canary from status {status}"
            )));
        }
        self.transition(tenant, CanaryStatus::Promoted).await?;
        info!(tenant, "canary promoted");
        Ok(())
    }

    /// Operator reset: clear all canary state back to inactive.
    pub async fn reset(&self, tenant: &str) -> Result<(), StrataError> {
        self.bounded(self.store.delete(&keys::canary_metrics(tenant)))
            .await?;
        self.bounded(self.store.delete(&keys::canary_config(tenant)))
            .await?;
        self.bounded(self.store.delete(&keys::canary_status(tenant)))
            .await?;
        info!(tenant, "canary state reset");
        Ok(())
    }

    /// Record the stable-path quality baseline the canary is judged against.
    pub async fn set_baseline_quality(
        &self,
        tenant: &str,
        baseline: f64,
    ) -> Result<(), StrataError> {
        let key = keys::canary_metrics(tenant);
        self.bounded(
            self.store
                .hash_set(&key, "baseline_quality", &baseline.to_string()),
        )
        .await?;
        self.bounded(self.store.expire(&key, STATE_TTL)).await?;
        Ok(())
    }

    /// Current rolling metrics, averaged from the stored sums.
    pub async fn metrics(&self, tenant: &str) -> Result<CanaryMetrics, StrataError> {
        let hash = self
            .bounded(self.store.hash_get_all(&keys::canary_metrics(tenant)))
            .await?;
        let field = |name: &str| hash.get(name).map(String::as_str);
        let total: u64 = parse_or(field("total"), 0);
        let quality_sum: f64 = parse_or(field("quality_sum"), 0.0);
        let latency_sum: f64 = parse_or(field("latency_sum_ms"), 0.0);
        Ok(CanaryMetrics {
            total_requests: total,
            successes: parse_or(field("successes"), 0),
            average_quality: if total == 0 {
                0.0
            } else {
                quality_sum / total as f64
            },
            average_latency_ms: if total == 0 {
                0.0
            } else {
                latency_sum / total as f64
            },
            baseline_quality: parse_or(field("baseline_quality"), DEFAULT_BASELINE_QUALITY),
        })
    }

    async fn baseline_quality(&self, tenant: &str) -> Result<f64, StrataError> {
        let raw = self
            .bounded(
                self.store
                    .hash_get(&keys::canary_metrics(tenant), "baseline_quality"),
            )
            .await?;
        Ok(raw
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_BASELINE_QUALITY))
    }

    async fn persist_config(&self, tenant: &str, config: &CanaryConfig) -> Result<(), StrataError> {
        let key = keys::canary_config(tenant);
        let fields: [(&str, String); 6] = [
            ("percentage", config.percentage.to_string()),
            ("quality_threshold", config.quality_threshold.to_string()),
            ("min_requests", config.min_requests.to_string()),
            (
                "evaluation_window_seconds",
                config.evaluation_window_seconds.to_string(),
            ),
            ("rollback_threshold", config.rollback_threshold.to_string()),
            (
                "tier_token_threshold",
                config.tier_token_threshold.to_string(),
            ),
        ];
        for (field, value) in &fields {
            self.bounded(self.store.hash_set(&key, field, value)).await?;
        }
        self.bounded(self.store.expire(&key, STATE_TTL)).await?;
        Ok(())
    }

    async fn transition(&self, tenant: &str, next: CanaryStatus) -> Result<(), StrataError> {
        self.bounded(self.store.set_ex(
            &keys::canary_status(tenant),
            &next.to_string(),
            STATE_TTL,
        ))
        .await
    }

    /// Wrap a store call in the decision-path deadline.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, StrataError>>,
    ) -> Result<T, StrataError> {
        tokio::time::timeout(self.store_timeout, fut)
            .await
            .map_err(|_| StrataError::Timeout {
                duration: self.store_timeout,
            })?
    }
}

/// Stable (tenant, user) hash bucket in [0, 1).
fn stable_bucket(tenant: &str, user: &str) -> f64 {
    let mut hasher = Sha256::new();
    hasher.update(tenant.as_bytes());
    hasher.update(b"\0");
    hasher.update(user.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes) as f64 / (u64::MAX as f64 + 1.0)
}

fn parse_or<T: std::str::FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|s| s.parse().ok()).unwrap_or(default)
}
