// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The routing orchestrator.
//!
//! `route_request` runs the full decision pipeline and never fails: any
//! pipeline error collapses to the balanced-tier fallback with the error
//! preserved in the decision diagnostics. Path precedence is canary, then
//! early exit, then the escalation-adjusted bandit choice.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uuid::Uuid;

use strata_bandit::{ArmState, BanditPolicy};
use strata_canary::{CanaryManager, CanaryMetrics, CanaryStatus};
use strata_classifier::CalibratedClassifier;
use strata_config::model::StrataConfig;
use strata_core::{
    CanaryInfo, DecisionPath, EscalationReason, RouterDecision, RouterFeatures, StrataError, Tier,
};
use strata_features::FeatureExtractor;
use strata_metrics::{MetricsCollector, RouterMetrics, recording};
use strata_policy::{PolicyEngine, ReasonStats};
use strata_store::{RouterStore, STATE_TTL, keys};

/// Confidence attached to canary-path decisions.
const CANARY_CONFIDENCE: f64 = 0.9;

/// Confidence cap applied when escalation overrides the bandit.
const ESCALATION_CONFIDENCE_CAP: f64 = 0.7;

/// Fallback decision when the pipeline errors out.
const FALLBACK_TIER: Tier = Tier::B;
const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Smoothing factor for the per-user failure-rate running estimate.
const FAILURE_RATE_ALPHA: f64 = 0.1;
const DEFAULT_FAILURE_RATE: f64 = 0.1;

/// One reported request outcome, fed back into every learning component.
///
/// Callers report only what they observed. Everything else the feedback
/// loop needs (tier cost, decision confidence, escalation reason, canary
/// membership) is recovered from state the router recorded at decision
/// time.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub tenant: String,
    pub user: String,
    /// Tier the request was actually served on, as reported by the caller.
    pub tier: String,
    pub success: bool,
    /// Quality score of the response, in [0, 1].
    pub quality_score: f64,
    pub latency_ms: f64,
}

/// Aggregated learning state for one tenant.
#[derive(Debug, Clone)]
pub struct RouterStatistics {
    pub metrics: RouterMetrics,
    pub bandit_arms: [ArmState; 3],
    pub canary_status: CanaryStatus,
    pub canary_metrics: CanaryMetrics,
    pub escalation: HashMap<EscalationReason, ReasonStats>,
    pub temperature: f64,
}

/// The tier routing decision core.
pub struct TierRouter {
    store: Arc<dyn RouterStore>,
    extractor: FeatureExtractor,
    classifier: CalibratedClassifier,
    policy: PolicyEngine,
    bandit: BanditPolicy,
    canary: CanaryManager,
    metrics: MetricsCollector,
    store_timeout: Duration,
}

impl TierRouter {
    pub fn new(store: Arc<dyn RouterStore>, config: StrataConfig) -> Self {
        let store_timeout = Duration::from_millis(config.router.store_timeout_ms);
        Self {
            extractor: FeatureExtractor::new(store.clone(), store_timeout),
            classifier: CalibratedClassifier::new(
                store.clone(),
                config.classifier,
                store_timeout,
            ),
            policy: PolicyEngine::new(store.clone(), config.early_exit, config.escalation),
            bandit: BanditPolicy::new(store.clone(), config.bandit, store_timeout),
            canary: CanaryManager::new(store.clone(), config.canary, store_timeout),
            metrics: MetricsCollector::new(store.clone(), store_timeout),
            store,
            store_timeout,
        }
    }

    /// Route one request to a tier. Never fails.
    pub async fn route_request(&self, request: &str, tenant: &str, user: &str) -> RouterDecision {
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        let mut decision = match self.decide(request, tenant, user).await {
            Ok(decision) => decision,
            Err(error) => {
                warn!(tenant, user, %request_id, %error, "routing pipeline failed; using fallback");
                fallback_decision(error)
            }
        };
        decision.decision_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        // Outcome recording replays this state later; losing it only costs
        // one feedback observation, never the decision.
        if let Err(error) = self.persist_decision_state(tenant, user, &decision).await {
            warn!(tenant, user, %request_id, %error, "failed to persist decision state");
        }
        if let Err(error) = self.metrics.record_decision(tenant, &decision).await {
            warn!(tenant, %request_id, %error, "failed to record decision metrics");
        }
        debug!(
            tenant,
            user,
            %request_id,
            tier = %decision.tier,
            path = %decision.path,
            confidence = decision.confidence,
            "routed request"
        );
        decision
    }

    async fn decide(
        &self,
        request: &str,
        tenant: &str,
        user: &str,
    ) -> Result<RouterDecision, StrataError> {
        let features = self.extractor.extract(request, tenant, user).await;

        // Canary assignment wins over everything else, but a canary store
        // failure must not take down routing.
        let canary = match self
            .canary
            .should_use_canary(tenant, user, features.token_count)
            .await
        {
            Ok(info) => info,
            Err(error) => {
                warn!(tenant, user, %error, "canary check failed; treating as not in canary");
                CanaryInfo {
                    in_canary: false,
                    bucket: 0.0,
                    canary_tier: None,
                }
            }
        };
        if let Some(tier) = canary.canary_tier.filter(|_| canary.in_canary) {
            return Ok(RouterDecision {
                tier,
                confidence: CANARY_CONFIDENCE,
                decision_time_ms: 0.0,
                path: DecisionPath::Canary,
                features,
                escalation: None,
                classifier: None,
                bandit: None,
                canary: Some(canary),
                fallback_error: None,
            });
        }

        let classifier = self.classifier.classify(&features, tenant).await;
        let escalation = self.policy.evaluate(
            &features,
            classifier.predicted_tier,
            classifier.confidence,
            tenant,
        );

        if let Some(exit) = escalation.early_exit.as_ref().filter(|e| e.granted) {
            let (tier, confidence) = (exit.tier, exit.confidence);
            return Ok(RouterDecision {
                tier,
                confidence,
                decision_time_ms: 0.0,
                path: DecisionPath::EarlyExit,
                features,
                escalation: Some(escalation),
                classifier: Some(classifier),
                bandit: None,
                canary: Some(canary),
                fallback_error: None,
            });
        }

        let bandit = self.bandit.select_arm(tenant).await?;
        let (tier, confidence, path) = if escalation.should_escalate {
            // Escalation overrides the bandit outright; the arm choice is
            // kept in the diagnostics only.
            (
                escalation.target_tier,
                classifier.confidence.min(ESCALATION_CONFIDENCE_CAP),
                DecisionPath::Escalated,
            )
        } else {
            (bandit.chosen_tier, classifier.confidence, DecisionPath::Bandit)
        };

        Ok(RouterDecision {
            tier,
            confidence,
            decision_time_ms: 0.0,
            path,
            features,
            escalation: Some(escalation),
            classifier: Some(classifier),
            bandit: Some(bandit),
            canary: Some(canary),
            fallback_error: None,
        })
    }

    /// Feed one request outcome back into every learning component.
    ///
    /// A caller reporting an unparseable tier gets an error instead of
    /// silent data loss. Everything past that check is best-effort: a
    /// transient store failure in one component must not discard the
    /// observation for the others.
    pub async fn record_outcome(&self, outcome: &RequestOutcome) -> Result<(), StrataError> {
        let tier = Tier::from_str(&outcome.tier).map_err(|_| StrataError::UnknownTier {
            value: outcome.tier.clone(),
        })?;
        let tenant = outcome.tenant.as_str();
        let reward = if outcome.success { 1.0 } else { 0.0 };

        if let Err(error) = self
            .bandit
            .update_arm(tenant, tier, reward, tier.unit_cost(), !outcome.success)
            .await
        {
            warn!(tenant, %tier, %error, "failed to update bandit arm");
        }
        if let Err(error) = self
            .metrics
            .record_outcome(tenant, tier, outcome.success, tier.unit_cost())
            .await
        {
            warn!(tenant, %error, "failed to record outcome metrics");
        }

        let state = match self
            .bounded(
                self.store
                    .hash_get_all(&keys::last_decision(tenant, &outcome.user)),
            )
            .await
        {
            Ok(state) => state,
            Err(error) => {
                warn!(tenant, user = %outcome.user, %error, "failed to read decision state");
                HashMap::new()
            }
        };
        if let Some(confidence) = state.get("confidence").and_then(|raw| raw.parse().ok()) {
            if let Err(error) = self
                .classifier
                .record_outcome(tenant, confidence, outcome.success)
                .await
            {
                warn!(tenant, %error, "failed to record calibration observation");
            }
        }
        if let Some(reason) = state
            .get("reason")
            .and_then(|raw| EscalationReason::from_str(raw).ok())
        {
            if let Err(error) = self
                .policy
                .record_escalation_outcome(tenant, reason, outcome.success, outcome.latency_ms)
                .await
            {
                warn!(tenant, %reason, %error, "failed to record escalation outcome");
            }
        }

        match self.canary.is_canary_member(tenant, &outcome.user).await {
            Ok(true) => {
                match self
                    .canary
                    .record_outcome(
                        tenant,
                        outcome.quality_score,
                        outcome.success,
                        outcome.latency_ms,
                    )
                    .await
                {
                    Ok(true) => {
                        recording::record_canary_rollback(tenant);
                        if let Err(error) = self.canary.finish_rollback(tenant).await {
                            warn!(tenant, %error, "failed to finish canary rollback");
                        }
                    }
                    Ok(false) => {}
                    Err(error) => warn!(tenant, %error, "failed to record canary outcome"),
                }
            }
            Ok(false) => {}
            Err(error) => warn!(tenant, user = %outcome.user, %error, "canary membership check failed"),
        }

        if let Err(error) = self
            .update_failure_rates(tenant, &outcome.user, outcome.success)
            .await
        {
            warn!(tenant, user = %outcome.user, %error, "failed to update failure rates");
        }
        Ok(())
    }

    /// Aggregated learning state for one tenant.
    pub async fn get_statistics(&self, tenant: &str) -> Result<RouterStatistics, StrataError> {
        let temperature = self
            .bounded(self.store.hash_get(&keys::calibration(tenant), "temperature"))
            .await?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(1.0);
        Ok(RouterStatistics {
            metrics: self.metrics.get_metrics(tenant).await?,
            bandit_arms: self.bandit.arm_statistics(tenant).await?,
            canary_status: self.canary.status(tenant).await?,
            canary_metrics: self.canary.metrics(tenant).await?,
            escalation: self.policy.escalation_statistics(tenant).await?,
            temperature,
        })
    }

    /// Refit the tenant's classifier temperature from recent outcomes.
    /// Intended for a periodic background task, not the decision path.
    pub async fn calibrate(&self, tenant: &str) -> Result<f64, StrataError> {
        self.classifier.calibrate(tenant).await
    }

    /// Discard a tenant's learned state (bandit arms, calibration,
    /// aggregated metrics). Operator-triggered; canary state is untouched.
    pub async fn reset_learning(&self, tenant: &str) -> Result<(), StrataError> {
        self.bandit.reset_arms(tenant).await?;
        self.metrics.reset(tenant).await?;
        self.bounded(self.store.delete(&keys::calibration(tenant)))
            .await?;
        self.bounded(self.store.delete(&keys::calibration_window(tenant)))
            .await?;
        info!(tenant, "learned routing state reset");
        Ok(())
    }

    /// Canary lifecycle operations (configure, promote, reset).
    pub fn canary(&self) -> &CanaryManager {
        &self.canary
    }

    /// Persist the decision-time state outcome recording replays later:
    /// the calibrated confidence and the primary escalation reason.
    async fn persist_decision_state(
        &self,
        tenant: &str,
        user: &str,
        decision: &RouterDecision,
    ) -> Result<(), StrataError> {
        let key = keys::last_decision(tenant, user);
        let reason = decision
            .escalation
            .as_ref()
            .filter(|e| e.should_escalate)
            .and_then(|e| e.reason)
            .map(|r| r.to_string())
            .unwrap_or_default();
        self.bounded(self.store.hash_set(
            &key,
            "confidence",
            &format!("{:.6}", decision.confidence),
        ))
        .await?;
        self.bounded(self.store.hash_set(&key, "reason", &reason))
            .await?;
        self.bounded(self.store.expire(&key, STATE_TTL)).await?;
        Ok(())
    }

    /// Update the running per-user and tenant-level failure-rate
    /// estimates consumed by feature extraction.
    async fn update_failure_rates(
        &self,
        tenant: &str,
        user: &str,
        success: bool,
    ) -> Result<(), StrataError> {
        let observed = if success { 0.0 } else { 1.0 };
        for key in [
            keys::user_failure_rate(tenant, user),
            keys::tenant_failure_rate(tenant),
        ] {
            let prior: f64 = self
                .bounded(self.store.get(&key))
                .await?
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(DEFAULT_FAILURE_RATE);
            let updated = (1.0 - FAILURE_RATE_ALPHA) * prior + FAILURE_RATE_ALPHA * observed;
            self.bounded(self.store.set_ex(&key, &format!("{updated:.6}"), STATE_TTL))
                .await?;
        }
        Ok(())
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

fn fallback_decision(error: StrataError) -> RouterDecision {
    RouterDecision {
        tier: FALLBACK_TIER,
        confidence: FALLBACK_CONFIDENCE,
        decision_time_ms: 0.0,
        path: DecisionPath::Fallback,
        features: RouterFeatures::neutral(),
        escalation: None,
        classifier: None,
        bandit: None,
        canary: None,
        fallback_error: Some(error.to_string()),
    }
}
