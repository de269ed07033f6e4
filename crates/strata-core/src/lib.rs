// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Strata routing core.
//!
//! This crate provides the tier model, the feature and decision value
//! objects, and the error type shared by every crate in the workspace.
//! It has no I/O and no store dependency; everything here is plain data.

pub mod error;
pub mod tier;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::StrataError;
pub use tier::Tier;
pub use types::{
    BanditInfo, CanaryInfo, ClassifierInfo, DecisionPath, EarlyExitOutcome, EscalationDecision,
    EscalationReason, RouterDecision, RouterFeatures,
};
