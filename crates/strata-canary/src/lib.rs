// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canary deployments for the Strata routing core: stable per-user
//! traffic assignment, rolling quality metrics, and auto-rollback.

pub mod manager;
pub mod status;

pub use manager::{CanaryConfig, CanaryManager, CanaryMetrics};
pub use status::CanaryStatus;
