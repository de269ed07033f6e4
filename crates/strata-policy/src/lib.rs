// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Early-exit and escalation rule engine for the Strata routing core.
//!
//! One evaluation pass produces a combined [`EscalationDecision`]: either
//! a granted early exit to the cheapest tier, a forced escalation with
//! its reasons, or neither. Precedence between the two is applied by the
//! orchestrator, not here.

pub mod early_exit;
pub mod escalation;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use strata_config::model::{EarlyExitConfig, EscalationConfig};
use strata_core::{EscalationDecision, EscalationReason, RouterFeatures, StrataError, Tier};
use strata_store::RouterStore;

pub use escalation::ReasonStats;

/// Combined early-exit and escalation evaluator.
pub struct PolicyEngine {
    store: Arc<dyn RouterStore>,
    early_exit: EarlyExitConfig,
    escalation: EscalationConfig,
}

impl PolicyEngine {
    pub fn new(
        store: Arc<dyn RouterStore>,
        early_exit: EarlyExitConfig,
        escalation: EscalationConfig,
    ) -> Self {
        Self {
            store,
            early_exit,
            escalation,
        }
    }

    /// Evaluate both rule sets against one classified request.
    pub fn evaluate(
        &self,
        features: &RouterFeatures,
        predicted_tier: Tier,
        confidence: f64,
        tenant: &str,
    ) -> EscalationDecision {
        let exit = early_exit::evaluate(features, tenant, &self.early_exit);
        let (reasons, target_tier) =
            escalation::evaluate(features, predicted_tier, confidence, tenant, &self.escalation);

        let should_escalate = !reasons.is_empty() && !exit.granted;
        if should_escalate {
            debug!(
                tenant,
                from = %predicted_tier,
                to = %target_tier,
                reason = %reasons[0],
                "escalation triggered"
            );
        }

        EscalationDecision {
            should_escalate,
            reason: reasons.first().copied(),
            all_reasons: reasons,
            target_tier: if should_escalate {
                target_tier
            } else {
                predicted_tier
            },
            confidence: exit.confidence,
            early_exit: Some(exit),
        }
    }

    /// Record the outcome of an escalated request.
    pub async fn record_escalation_outcome(
        &self,
        tenant: &str,
        reason: EscalationReason,
        success: bool,
        latency_ms: f64,
    ) -> Result<(), StrataError> {
        escalation::record_outcome(self.store.as_ref(), tenant, reason, success, latency_ms).await
    }

    /// Per-reason escalation outcome statistics for a tenant.
    pub async fn escalation_statistics(
        &self,
        tenant: &str,
    ) -> Result<HashMap<EscalationReason, ReasonStats>, StrataError> {
        escalation::statistics(self.store.as_ref(), tenant).await
    }
}
