// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant decision metrics persisted in the shared store.
//!
//! Counters are atomic increments; latency is a bounded sample set. The
//! aggregated view is recomputed on read, so concurrent recording from
//! many requests never serializes on a lock.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use strata_core::{DecisionPath, RouterDecision, StrataError, Tier};
use strata_store::{LATENCY_SAMPLES_CAP, RouterStore, STATE_TTL, keys};

use crate::recording;

/// Aggregated per-tenant routing metrics.
///
/// All rates are zero when no history exists yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouterMetrics {
    pub total_decisions: u64,
    pub total_outcomes: u64,
    /// Fraction of decisions per tier, in `Tier::ALL` order.
    pub tier_distribution: [f64; 3],
    /// Fraction of decisions that used the early-exit fast path.
    pub early_exit_rate: f64,
    /// Fraction of decisions that fell back to the default tier.
    pub fallback_rate: f64,
    /// Median decision latency over the retained samples.
    pub p50_latency_ms: f64,
    /// Fraction of reported outcomes that failed.
    pub misroute_rate: f64,
    /// Actual spend divided by the spend the decisions predicted.
    pub cost_ratio: f64,
}

/// Records decisions and outcomes and serves the aggregated view.
pub struct MetricsCollector {
    store: Arc<dyn RouterStore>,
    store_timeout: Duration,
}

impl MetricsCollector {
    pub fn new(store: Arc<dyn RouterStore>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// Record one routing decision.
    pub async fn record_decision(
        &self,
        tenant: &str,
        decision: &RouterDecision,
    ) -> Result<(), StrataError> {
        let key = keys::decision_metrics(tenant);
        self.bounded(self.store.hash_incr(&key, "decisions", 1)).await?;
        self.bounded(
            self.store
                .hash_incr(&key, &format!("tier:{}", decision.tier), 1),
        )
        .await?;
        self.bounded(
            self.store
                .hash_incr(&key, &format!("path:{}", decision.path), 1),
        )
        .await?;
        self.bounded(
            self.store
                .hash_incr_f64(&key, "expected_cost", decision.tier.unit_cost()),
        )
        .await?;
        self.bounded(self.store.sample_push_capped(
            &keys::latency_samples(tenant),
            decision.decision_time_ms,
            LATENCY_SAMPLES_CAP,
        ))
        .await?;
        self.bounded(self.store.expire(&key, STATE_TTL)).await?;
        self.bounded(self.store.expire(&keys::latency_samples(tenant), STATE_TTL))
            .await?;

        recording::record_decision(
            &decision.tier.to_string(),
            &decision.path.to_string(),
            decision.decision_time_ms,
        );
        if decision.path == DecisionPath::Fallback {
            recording::record_fallback();
        }
        Ok(())
    }

    /// Record one reported request outcome.
    pub async fn record_outcome(
        &self,
        tenant: &str,
        tier: Tier,
        success: bool,
        actual_cost: f64,
    ) -> Result<(), StrataError> {
        let key = keys::decision_metrics(tenant);
        self.bounded(self.store.hash_incr(&key, "outcomes", 1)).await?;
        if !success {
            self.bounded(self.store.hash_incr(&key, "outcomes_failed", 1))
                .await?;
        }
        self.bounded(self.store.hash_incr_f64(&key, "actual_cost", actual_cost))
            .await?;
        self.bounded(self.store.expire(&key, STATE_TTL)).await?;

        recording::record_outcome(&tier.to_string(), success);
        Ok(())
    }

    /// The aggregated per-tenant view, recomputed from the raw counters.
    pub async fn get_metrics(&self, tenant: &str) -> Result<RouterMetrics, StrataError> {
        let hash = self
            .bounded(self.store.hash_get_all(&keys::decision_metrics(tenant)))
            .await?;
        let int = |name: &str| -> u64 {
            hash.get(name).and_then(|v| v.parse().ok()).unwrap_or(0)
        };
        let float = |name: &str| -> f64 {
            hash.get(name).and_then(|v| v.parse().ok()).unwrap_or(0.0)
        };

        let decisions = int("decisions");
        let outcomes = int("outcomes");

        let mut tier_distribution = [0.0; 3];
        if decisions > 0 {
            for (i, tier) in Tier::ALL.into_iter().enumerate() {
                tier_distribution[i] = int(&format!("tier:{tier}")) as f64 / decisions as f64;
            }
        }

        let rate_of = |path: DecisionPath| -> f64 {
            if decisions == 0 {
                0.0
            } else {
                int(&format!("path:{path}")) as f64 / decisions as f64
            }
        };

        let expected_cost = float("expected_cost");
        let actual_cost = float("actual_cost");

        Ok(RouterMetrics {
            total_decisions: decisions,
            total_outcomes: outcomes,
            tier_distribution,
            early_exit_rate: rate_of(DecisionPath::EarlyExit),
            fallback_rate: rate_of(DecisionPath::Fallback),
            p50_latency_ms: self.p50_latency(tenant).await?,
            misroute_rate: if outcomes == 0 {
                0.0
            } else {
                int("outcomes_failed") as f64 / outcomes as f64
            },
            cost_ratio: if expected_cost > 0.0 {
                actual_cost / expected_cost
            } else {
                0.0
            },
        })
    }

    /// Clear a tenant's aggregated metrics and latency samples.
    pub async fn reset(&self, tenant: &str) -> Result<(), StrataError> {
        self.bounded(self.store.delete(&keys::decision_metrics(tenant)))
            .await?;
        self.bounded(self.store.delete(&keys::latency_samples(tenant)))
            .await?;
        Ok(())
    }

    async fn p50_latency(&self, tenant: &str) -> Result<f64, StrataError> {
        let mut samples = self
            .bounded(self.store.samples(&keys::latency_samples(tenant)))
            .await?;
        if samples.is_empty() {
            return Ok(0.0);
        }
        samples.sort_by(f64::total_cmp);
        Ok(samples[samples.len() / 2])
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

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::RouterFeatures;
    use strata_store::MemoryStore;

    fn collector() -> MetricsCollector {
        MetricsCollector::new(Arc::new(MemoryStore::new()), Duration::from_millis(50))
    }

    fn decision(tier: Tier, path: DecisionPath, latency_ms: f64) -> RouterDecision {
        RouterDecision {
            tier,
            confidence: 0.9,
            decision_time_ms: latency_ms,
            path,
            features: RouterFeatures::neutral(),
            escalation: None,
            classifier: None,
            bandit: None,
            canary: None,
            fallback_error: None,
        }
    }

    #[tokio::test]
    async fn empty_history_reports_all_zeros() {
        let m = collector().get_metrics("t1").await.unwrap();
        assert_eq!(m, RouterMetrics::default());
    }

    #[tokio::test]
    async fn tier_distribution_sums_to_one() {
        let c = collector();
        for _ in 0..6 {
            c.record_decision("t1", &decision(Tier::A, DecisionPath::Bandit, 1.0))
                .await
                .unwrap();
        }
        for _ in 0..3 {
            c.record_decision("t1", &decision(Tier::B, DecisionPath::Bandit, 1.0))
                .await
                .unwrap();
        }
        c.record_decision("t1", &decision(Tier::C, DecisionPath::Escalated, 1.0))
            .await
            .unwrap();

        let m = c.get_metrics("t1").await.unwrap();
        assert_eq!(m.total_decisions, 10);
        assert!((m.tier_distribution.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!((m.tier_distribution[0] - 0.6).abs() < 1e-9);
        assert!((m.tier_distribution[2] - 0.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn misroute_rate_counts_failed_outcomes() {
        let c = collector();
        for i in 0..10 {
            c.record_outcome("t1", Tier::B, i < 8, 0.5).await.unwrap();
        }
        let m = c.get_metrics("t1").await.unwrap();
        assert_eq!(m.total_outcomes, 10);
        assert!((m.misroute_rate - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn cost_ratio_compares_actual_to_expected() {
        let c = collector();
        // Two Tier B decisions predict 1.0 total spend.
        for _ in 0..2 {
            c.record_decision("t1", &decision(Tier::B, DecisionPath::Bandit, 1.0))
                .await
                .unwrap();
            c.record_outcome("t1", Tier::B, true, 0.75).await.unwrap();
        }
        let m = c.get_metrics("t1").await.unwrap();
        assert!((m.cost_ratio - 1.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn p50_latency_is_the_median_sample() {
        let c = collector();
        for latency in [1.0, 2.0, 3.0, 4.0, 100.0] {
            c.record_decision("t1", &decision(Tier::A, DecisionPath::Bandit, latency))
                .await
                .unwrap();
        }
        let m = c.get_metrics("t1").await.unwrap();
        assert!((m.p50_latency_ms - 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn path_rates_track_fast_and_fallback_paths() {
        let c = collector();
        c.record_decision("t1", &decision(Tier::A, DecisionPath::EarlyExit, 1.0))
            .await
            .unwrap();
        c.record_decision("t1", &decision(Tier::B, DecisionPath::Fallback, 1.0))
            .await
            .unwrap();
        c.record_decision("t1", &decision(Tier::B, DecisionPath::Bandit, 1.0))
            .await
            .unwrap();
        c.record_decision("t1", &decision(Tier::C, DecisionPath::Escalated, 1.0))
            .await
            .unwrap();

        let m = c.get_metrics("t1").await.unwrap();
        assert!((m.early_exit_rate - 0.25).abs() < 1e-9);
        assert!((m.fallback_rate - 0.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn reset_clears_history() {
        let c = collector();
        c.record_decision("t1", &decision(Tier::A, DecisionPath::Bandit, 1.0))
            .await
            .unwrap();
        c.reset("t1").await.unwrap();
        assert_eq!(c.get_metrics("t1").await.unwrap(), RouterMetrics::default());
    }

    #[tokio::test]
    async fn tenants_do_not_share_metrics() {
        let c = collector();
        c.record_decision("t1", &decision(Tier::A, DecisionPath::Bandit, 1.0))
            .await
            .unwrap();
        assert_eq!(c.get_metrics("t2").await.unwrap().total_decisions, 0);
    }
}
