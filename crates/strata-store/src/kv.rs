// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The [`RouterStore`] trait: the sole synchronization point of the pipeline.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use strata_core::StrataError;

/// Abstract key-value store with hashes, bounded lists, bounded sample
/// sets, atomic counters, and per-key TTL.
///
/// Counters must be incremented atomically (never read-modify-write) so
/// concurrent outcome recording from many simultaneous requests stays
/// correct. Implementations are expected to be cheap to clone behind an
/// `Arc` and safe to call from any task.
#[async_trait]
pub trait RouterStore: Send + Sync {
    /// Read a string value. `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StrataError>;

    /// Write a string value with a TTL.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StrataError>;

    /// Read one hash field.
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StrataError>;

    /// Write one hash field.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StrataError>;

    /// Read an entire hash. Empty map when absent.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StrataError>;

    /// Atomically add `delta` to an integer hash field, returning the new value.
    /// Missing fields start at zero.
    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64, StrataError>;

    /// Atomically add `delta` to a float hash field, returning the new value.
    async fn hash_incr_f64(&self, key: &str, field: &str, delta: f64)
    -> Result<f64, StrataError>;

    /// Append to a list, evicting the oldest entries beyond `cap`.
    async fn list_push_capped(
        &self,
        key: &str,
        value: &str,
        cap: usize,
    ) -> Result<(), StrataError>;

    /// Read a full list, oldest first. Empty when absent.
    async fn list_range(&self, key: &str) -> Result<Vec<String>, StrataError>;

    /// Append a numeric sample, evicting the oldest beyond `cap`.
    async fn sample_push_capped(
        &self,
        key: &str,
        value: f64,
        cap: usize,
    ) -> Result<(), StrataError>;

    /// Read all retained samples. Empty when absent.
    async fn samples(&self, key: &str) -> Result<Vec<f64>, StrataError>;

    /// Set or refresh a key's TTL. No-op when the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StrataError>;

    /// Remove a key entirely.
    async fn delete(&self, key: &str) -> Result<(), StrataError>;
}
