// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strata's routing orchestrator: wires feature extraction, calibrated
//! classification, the early-exit/escalation policy, the cost-aware
//! bandit, and canary management into a single decision pipeline.

pub mod router;

pub use router::{RequestOutcome, RouterStatistics, TierRouter};
