// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canary lifecycle state machine.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle status of a tenant's canary deployment.
///
/// Legal transitions: inactive -> active (configure), active -> promoted
/// (operator), active -> rolling_back (auto-rollback), rolling_back ->
/// rolled_back, and any state -> inactive (reset).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CanaryStatus {
    Inactive,
    Active,
    RollingBack,
    RolledBack,
    Promoted,
}

impl CanaryStatus {
    /// Whether a transition to `next` is legal. Reset (to `Inactive`) is
    /// always allowed.
    pub fn can_transition_to(self, next: CanaryStatus) -> bool {
        use CanaryStatus::*;
        matches!(
            (self, next),
            (_, Inactive)
                | (Inactive, Active)
                | (RolledBack, Active)
                | (Promoted, Active)
                | (Active, Promoted)
                | (Active, RollingBack)
                | (RollingBack, RolledBack)
        )
    }

    /// Whether canary traffic is currently being served.
    pub fn is_serving(self) -> bool {
        self == CanaryStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn lifecycle_transitions() {
        use CanaryStatus::*;
        assert!(Inactive.can_transition_to(Active));
        assert!(Active.can_transition_to(RollingBack));
        assert!(RollingBack.can_transition_to(RolledBack));
        assert!(Active.can_transition_to(Promoted));
        assert!(RolledBack.can_transition_to(Active));

        assert!(!Inactive.can_transition_to(RollingBack));
        assert!(!Promoted.can_transition_to(RollingBack));
        assert!(!RolledBack.can_transition_to(Promoted));
    }

    #[test]
    fn reset_is_always_legal() {
        use CanaryStatus::*;
        for s in [Inactive, Active, RollingBack, RolledBack, Promoted] {
            assert!(s.can_transition_to(Inactive));
        }
    }

    #[test]
    fn status_round_trips_as_snake_case() {
        for s in [
            CanaryStatus::Inactive,
            CanaryStatus::Active,
            CanaryStatus::RollingBack,
            CanaryStatus::RolledBack,
            CanaryStatus::Promoted,
        ] {
            assert_eq!(CanaryStatus::from_str(&s.to_string()).unwrap(), s);
        }
        assert_eq!(CanaryStatus::RollingBack.to_string(), "rolling_back");
    }

    #[test]
    fn only_active_serves_traffic() {
        assert!(CanaryStatus::Active.is_serving());
        assert!(!CanaryStatus::RollingBack.is_serving());
        assert!(!CanaryStatus::Inactive.is_serving());
    }
}
