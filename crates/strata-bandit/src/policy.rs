// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant three-armed bandit over the service tiers.
//!
//! Arm value is a UCB-style score: empirical mean reward plus an
//! exploration bonus, minus a cost penalty so cheaper tiers win at equal
//! quality. Untried arms are always explored first. All counter updates
//! are atomic store increments, safe under concurrent outcome recording.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use strata_config::model::BanditConfig;
use strata_core::{BanditInfo, StrataError, Tier};
use strata_store::{RouterStore, STATE_TTL, keys};

/// One arm's learned statistics, as persisted in the store hash.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArmState {
    pub pulls: u64,
    pub cumulative_reward: f64,
    pub cumulative_cost: f64,
    pub error_count: u64,
}

impl ArmState {
    fn from_hash(hash: &std::collections::HashMap<String, String>) -> Self {
        fn field<T: FromStr>(
            hash: &std::collections::HashMap<String, String>,
            name: &str,
        ) -> Option<T> {
            hash.get(name).and_then(|v| v.parse().ok())
        }
        Self {
            pulls: field(hash, "pulls").unwrap_or(0),
            cumulative_reward: field(hash, "reward").unwrap_or(0.0),
            cumulative_cost: field(hash, "cost").unwrap_or(0.0),
            error_count: field(hash, "errors").unwrap_or(0),
        }
    }

    pub fn mean_reward(&self) -> f64 {
        if self.pulls == 0 {
            0.0
        } else {
            self.cumulative_reward / self.pulls as f64
        }
    }

    pub fn mean_cost(&self) -> f64 {
        if self.pulls == 0 {
            0.0
        } else {
            self.cumulative_cost / self.pulls as f64
        }
    }
}

/// UCB-style cost-penalized arm value.
///
/// `mean_reward + k * sqrt(ln(total_pulls + 1) / (pulls + 1)) - w * mean_cost`
pub fn arm_value(arm: &ArmState, total_pulls: u64, config: &BanditConfig) -> f64 {
    let bonus = config.exploration_constant
        * (((total_pulls + 1) as f64).ln() / (arm.pulls + 1) as f64).sqrt();
    arm.mean_reward() + bonus - config.cost_weight * arm.mean_cost()
}

/// Online per-tenant bandit over the three tiers.
pub struct BanditPolicy {
    store: Arc<dyn RouterStore>,
    config: BanditConfig,
    store_timeout: Duration,
}

impl BanditPolicy {
    pub fn new(store: Arc<dyn RouterStore>, config: BanditConfig, store_timeout: Duration) -> Self {
        Self {
            store,
            config,
            store_timeout,
        }
    }

    /// Pick a tier for the tenant. Untried arms are explored first, in
    /// cost order; otherwise the highest-value arm wins.
    pub async fn select_arm(&self, tenant: &str) -> Result<BanditInfo, StrataError> {
        let arms = self.load_arms(tenant).await?;
        let total_pulls: u64 = arms.iter().map(|a| a.pulls).sum();

        let mut values = [0.0_f64; 3];
        for (i, arm) in arms.iter().enumerate() {
            values[i] = arm_value(arm, total_pulls, &self.config);
        }

        // Explore untried arms before trusting any value estimate.
        if let Some(untried_idx) = arms.iter().position(|a| a.pulls == 0) {
            let tier = Tier::ALL[untried_idx];
            debug!(tenant, %tier, "bandit exploring untried arm");
            return Ok(BanditInfo {
                chosen_tier: tier,
                value: values[untried_idx],
                arm_values: values,
                untried: true,
            });
        }

        let (best_idx, best_value) = values
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((1, 0.0));

        Ok(BanditInfo {
            chosen_tier: Tier::ALL[best_idx],
            value: best_value,
            arm_values: values,
            untried: false,
        })
    }

    /// Record one observed outcome against an arm.
    ///
    /// All increments are atomic; concurrent calls for the same
    /// tenant/tier never lose updates.
    pub async fn update_arm(
        &self,
        tenant: &str,
        tier: Tier,
        reward: f64,
        cost: f64,
        was_error: bool,
    ) -> Result<(), StrataError> {
        let key = keys::bandit_arm(tenant, tier);
        self.bounded(self.store.hash_incr(&key, "pulls", 1)).await?;
        self.bounded(self.store.hash_incr_f64(&key, "reward", reward))
            .await?;
        self.bounded(self.store.hash_incr_f64(&key, "cost", cost))
            .await?;
        if was_error {
            self.bounded(self.store.hash_incr(&key, "errors", 1)).await?;
        }
        self.bounded(self.store.expire(&key, STATE_TTL)).await?;
        Ok(())
    }

    /// All arms' statistics, in `Tier::ALL` order, for observability.
    pub async fn arm_statistics(&self, tenant: &str) -> Result<[ArmState; 3], StrataError> {
        self.load_arms(tenant).await
    }

    /// Clear all arm state for a fresh learning cycle. Operator-triggered.
    pub async fn reset_arms(&self, tenant: &str) -> Result<(), StrataError> {
        for tier in Tier::ALL {
            self.bounded(self.store.delete(&keys::bandit_arm(tenant, tier)))
                .await?;
        }
        Ok(())
    }

    async fn load_arms(&self, tenant: &str) -> Result<[ArmState; 3], StrataError> {
        let mut arms: [ArmState; 3] = Default::default();
        for (i, tier) in Tier::ALL.into_iter().enumerate() {
            let hash = self
                .bounded(self.store.hash_get_all(&keys::bandit_arm(tenant, tier)))
                .await?;
            arms[i] = ArmState::from_hash(&hash);
        }
        Ok(arms)
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
    use proptest::prelude::*;
    use strata_store::MemoryStore;

    fn policy(store: Arc<dyn RouterStore>) -> BanditPolicy {
        BanditPolicy::new(store, BanditConfig::default(), Duration::from_millis(50))
    }

    #[test]
    fn arm_state_parses_integer_and_float_fields() {
        let hash: std::collections::HashMap<String, String> = [
            ("pulls", "7"),
            ("reward", "3.5"),
            ("cost", "0.7"),
            ("errors", "2"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let arm = ArmState::from_hash(&hash);
        assert_eq!(arm.pulls, 7);
        assert!((arm.cumulative_reward - 3.5).abs() < 1e-9);
        assert!((arm.cumulative_cost - 0.7).abs() < 1e-9);
        assert_eq!(arm.error_count, 2);
    }

    async fn seed_arm(policy: &BanditPolicy, tenant: &str, tier: Tier, pulls: u64, rewards: u64) {
        for i in 0..pulls {
            let reward = if i < rewards { 1.0 } else { 0.0 };
            policy
                .update_arm(tenant, tier, reward, tier.unit_cost(), reward == 0.0)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn untried_arm_is_always_explored_first() {
        let p = policy(Arc::new(MemoryStore::new()));
        seed_arm(&p, "t1", Tier::A, 100, 95).await;
        seed_arm(&p, "t1", Tier::B, 10, 9).await;
        // Tier C never pulled.
        let info = p.select_arm("t1").await.unwrap();
        assert_eq!(info.chosen_tier, Tier::C);
        assert!(info.untried);
    }

    #[tokio::test]
    async fn fresh_tenant_explores_cheapest_arm_first() {
        let p = policy(Arc::new(MemoryStore::new()));
        let info = p.select_arm("fresh").await.unwrap();
        assert_eq!(info.chosen_tier, Tier::A);
        assert!(info.untried);
    }

    #[tokio::test]
    async fn high_reward_cheap_arm_wins_once_all_tried() {
        let p = policy(Arc::new(MemoryStore::new()));
        seed_arm(&p, "t1", Tier::A, 50, 48).await;
        seed_arm(&p, "t1", Tier::B, 50, 25).await;
        seed_arm(&p, "t1", Tier::C, 50, 25).await;
        let info = p.select_arm("t1").await.unwrap();
        assert_eq!(info.chosen_tier, Tier::A);
        assert!(!info.untried);
    }

    #[tokio::test]
    async fn update_arm_round_trips_through_statistics() {
        let p = policy(Arc::new(MemoryStore::new()));
        for i in 0..20 {
            let reward = if i % 2 == 0 { 1.0 } else { 0.0 };
            p.update_arm("t1", Tier::B, reward, 0.5, reward == 0.0)
                .await
                .unwrap();
        }
        let arms = p.arm_statistics("t1").await.unwrap();
        let b = &arms[1];
        assert_eq!(b.pulls, 20);
        assert!((b.cumulative_reward - 10.0).abs() < 1e-9);
        assert!((b.cumulative_cost - 10.0).abs() < 1e-9);
        assert_eq!(b.error_count, 10);
    }

    #[tokio::test]
    async fn reset_arms_clears_state() {
        let p = policy(Arc::new(MemoryStore::new()));
        seed_arm(&p, "t1", Tier::A, 5, 5).await;
        p.reset_arms("t1").await.unwrap();
        let arms = p.arm_statistics("t1").await.unwrap();
        assert!(arms.iter().all(|a| a.pulls == 0));
    }

    #[tokio::test]
    async fn tenants_learn_independently() {
        let p = policy(Arc::new(MemoryStore::new()));
        seed_arm(&p, "t1", Tier::A, 10, 10).await;
        let other = p.arm_statistics("t2").await.unwrap();
        assert!(other.iter().all(|a| a.pulls == 0));
    }

    proptest! {
        /// Arm value is monotonically non-decreasing in mean reward,
        /// holding pulls and cost fixed.
        #[test]
        fn value_non_decreasing_in_reward(
            pulls in 1u64..1000,
            total in 1u64..10_000,
            reward_lo in 0.0f64..0.5,
            reward_delta in 0.0f64..0.5,
            cost in 0.0f64..1.0,
        ) {
            let config = BanditConfig::default();
            let lo = ArmState {
                pulls,
                cumulative_reward: reward_lo * pulls as f64,
                cumulative_cost: cost * pulls as f64,
                error_count: 0,
            };
            let hi = ArmState {
                cumulative_reward: (reward_lo + reward_delta) * pulls as f64,
                ..lo.clone()
            };
            prop_assert!(arm_value(&hi, total, &config) >= arm_value(&lo, total, &config));
        }

        /// Arm value is monotonically non-increasing in mean cost,
        /// holding pulls and reward fixed.
        #[test]
        fn value_non_increasing_in_cost(
            pulls in 1u64..1000,
            total in 1u64..10_000,
            reward in 0.0f64..1.0,
            cost_lo in 0.0f64..0.5,
            cost_delta in 0.0f64..0.5,
        ) {
            let config = BanditConfig::default();
            let cheap = ArmState {
                pulls,
                cumulative_reward: reward * pulls as f64,
                cumulative_cost: cost_lo * pulls as f64,
                error_count: 0,
            };
            let pricey = ArmState {
                cumulative_cost: (cost_lo + cost_delta) * pulls as f64,
                ..cheap.clone()
            };
            prop_assert!(arm_value(&pricey, total, &config) <= arm_value(&cheap, total, &config));
        }
    }
}
