// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Strata routing core.

use thiserror::Error;

/// The primary error type used across all Strata components.
///
/// Internal code returns these explicitly; each component collapses them
/// to its documented default at the public boundary, so a caller's route
/// request never fails on a store outage or a bad sub-computation.
#[derive(Debug, Error)]
pub enum StrataError {
    /// Configuration errors (invalid TOML, out-of-range thresholds).
    #[error("configuration error: {0}")]
    Config(String),

    /// Shared-store errors (connection failure, serialization, bad field).
    #[error("store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An outcome was reported for a tier string that does not parse.
    #[error("unknown tier: {value}")]
    UnknownTier { value: String },

    /// A store call exceeded its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StrataError {
    /// Wrap an arbitrary error as a store error.
    pub fn store<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store {
            source: Box::new(source),
        }
    }
}
