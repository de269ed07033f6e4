// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared-store abstraction for the Strata routing core.
//!
//! All per-tenant state (bandit arms, canary config, metrics counters,
//! feature caches) lives behind the [`RouterStore`] trait. The trait is
//! shaped like a small Redis subset: string values with TTL, hashes with
//! atomic increments, bounded lists, and bounded numeric sample sets.
//!
//! [`MemoryStore`] is the reference backend, built on sharded concurrent
//! maps; every mutation is atomic at the key level, which is the only
//! synchronization the routing pipeline relies on.

pub mod keys;
pub mod kv;
pub mod memory;

pub use kv::RouterStore;
pub use memory::MemoryStore;

use std::time::Duration;

/// TTL for cached feature vectors (retried/duplicate requests).
pub const FEATURE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// TTL for learning state: bandit arms, canary hashes, metric counters.
pub const STATE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Cap on the per-tenant recent-request list used for novelty scoring.
pub const RECENT_REQUESTS_CAP: usize = 100;

/// Cap on the per-tenant raw latency sample set.
pub const LATENCY_SAMPLES_CAP: usize = 1_000;
