// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order: compiled defaults, then `strata.toml` in the working
//! directory, then `STRATA_`-prefixed environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::StrataConfig;

/// Load configuration from `strata.toml` with env var overrides.
pub fn load_config() -> Result<StrataConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StrataConfig::default()))
        .merge(Toml::file("strata.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no file lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<StrataConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StrataConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<StrataConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StrataConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` because key names contain
/// underscores: `STRATA_EARLY_EXIT_MAX_TOKENS` must map to
/// `early_exit.max_tokens`, not `early.exit.max.tokens`.
fn env_provider() -> Env {
    Env::prefixed("STRATA_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        let key_str = key.as_str();
        // Longest section names first so `early_exit_` wins over shorter
        // accidental matches.
        let mapped = key_str
            .replacen("early_exit_", "early_exit.", 1)
            .replacen("escalation_", "escalation.", 1)
            .replacen("classifier_", "classifier.", 1)
            .replacen("bandit_", "bandit.", 1)
            .replacen("canary_", "canary.", 1)
            .replacen("router_", "router.", 1);
        mapped.into()
    })
}
