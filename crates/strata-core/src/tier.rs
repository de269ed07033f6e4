// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The three-level service tier model.
//!
//! Tiers have a fixed cost ordering (A < B < C) and a monotonic
//! escalation successor. The cost model is tenant-independent.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One of three cost/latency/quality service levels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
pub enum Tier {
    /// Cheap and fast.
    A,
    /// Balanced.
    B,
    /// Expensive and most capable.
    C,
}

impl Tier {
    /// All tiers in cost order, cheapest first.
    pub const ALL: [Tier; 3] = [Tier::A, Tier::B, Tier::C];

    /// The cheapest tier, used as the early-exit target.
    pub const fn cheapest() -> Tier {
        Tier::A
    }

    /// Unit cost of serving one request on this tier.
    pub const fn unit_cost(self) -> f64 {
        match self {
            Tier::A => 0.1,
            Tier::B => 0.5,
            Tier::C => 1.0,
        }
    }

    /// The next more expensive tier. C is terminal and escalates to itself.
    pub const fn escalate(self) -> Tier {
        match self {
            Tier::A => Tier::B,
            Tier::B => Tier::C,
            Tier::C => Tier::C,
        }
    }
}
