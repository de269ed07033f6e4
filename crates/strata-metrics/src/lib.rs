// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decision metrics for the Strata routing core: per-tenant aggregation
//! in the shared store plus process-level emission through the `metrics`
//! facade.

pub mod collector;
pub mod recording;

pub use collector::{MetricsCollector, RouterMetrics};
