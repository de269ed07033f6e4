// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cost-aware multi-armed bandit for the Strata routing core.

pub mod policy;

pub use policy::{ArmState, BanditPolicy, arm_value};
