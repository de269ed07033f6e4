// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory reference backend for [`RouterStore`].
//!
//! Entries live in a sharded concurrent map keyed by full key string.
//! Expiry is lazy: each entry carries an optional deadline checked on
//! access. Mutations run inside the map's per-shard lock, so every
//! operation (including increments) is atomic per key.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use thiserror::Error;

use strata_core::StrataError;

use crate::kv::RouterStore;

/// Errors specific to the in-memory backend.
#[derive(Debug, Error)]
pub enum MemoryStoreError {
    /// A key holds a value of a different shape than the operation expects.
    #[error("wrong value type at key `{key}`")]
    WrongType { key: String },

    /// A counter field holds a non-numeric value.
    #[error("field `{field}` at key `{key}` is not numeric")]
    NotNumeric { key: String, field: String },
}

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    List(VecDeque<String>),
    Samples(VecDeque<f64>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Concurrent in-memory store. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    map: std::sync::Arc<DashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the live (non-expired) value at `key`, creating it
    /// from `make` when absent or expired. Runs under the shard lock.
    fn with_value<T>(
        &self,
        key: &str,
        make: impl FnOnce() -> Value,
        f: impl FnOnce(&mut Value) -> Result<T, StrataError>,
    ) -> Result<T, StrataError> {
        match self.map.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.expired() {
                    *entry = Entry {
                        value: make(),
                        expires_at: None,
                    };
                }
                f(&mut entry.value)
            }
            MapEntry::Vacant(vacant) => {
                let mut entry = vacant.insert(Entry {
                    value: make(),
                    expires_at: None,
                });
                f(&mut entry.value)
            }
        }
    }

    /// Read-only access to a live value; `None` when absent or expired.
    fn read_value<T>(&self, key: &str, f: impl FnOnce(&Value) -> Option<T>) -> Option<T> {
        let entry = self.map.get(key)?;
        if entry.expired() {
            return None;
        }
        f(&entry.value)
    }

    fn wrong_type(key: &str) -> StrataError {
        StrataError::store(MemoryStoreError::WrongType {
            key: key.to_string(),
        })
    }
}

#[async_trait]
impl RouterStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StrataError> {
        Ok(self.read_value(key, |v| match v {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StrataError> {
        self.map.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StrataError> {
        Ok(self
            .read_value(key, |v| match v {
                Value::Hash(h) => Some(h.get(field).cloned()),
                _ => None,
            })
            .flatten())
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StrataError> {
        self.with_value(
            key,
            || Value::Hash(HashMap::new()),
            |v| match v {
                Value::Hash(h) => {
                    h.insert(field.to_string(), value.to_string());
                    Ok(())
                }
                _ => Err(Self::wrong_type(key)),
            },
        )
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StrataError> {
        Ok(self
            .read_value(key, |v| match v {
                Value::Hash(h) => Some(h.clone()),
                _ => None,
            })
            .unwrap_or_default())
    }

    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64, StrataError> {
        self.with_value(
            key,
            || Value::Hash(HashMap::new()),
            |v| match v {
                Value::Hash(h) => {
                    let slot = h.entry(field.to_string()).or_insert_with(|| "0".to_string());
                    let current: i64 =
                        slot.parse().map_err(|_| {
                            StrataError::store(MemoryStoreError::NotNumeric {
                                key: key.to_string(),
                                field: field.to_string(),
                            })
                        })?;
                    let next = current + delta;
                    *slot = next.to_string();
                    Ok(next)
                }
                _ => Err(Self::wrong_type(key)),
            },
        )
    }

    async fn hash_incr_f64(
        &self,
        key: &str,
        field: &str,
        delta: f64,
    ) -> Result<f64, StrataError> {
        self.with_value(
            key,
            || Value::Hash(HashMap::new()),
            |v| match v {
                Value::Hash(h) => {
                    let slot = h.entry(field.to_string()).or_insert_with(|| "0".to_string());
                    let current: f64 =
                        slot.parse().map_err(|_| {
                            StrataError::store(MemoryStoreError::NotNumeric {
                                key: key.to_string(),
                                field: field.to_string(),
                            })
                        })?;
                    let next = current + delta;
                    *slot = next.to_string();
                    Ok(next)
                }
                _ => Err(Self::wrong_type(key)),
            },
        )
    }

    async fn list_push_capped(
        &self,
        key: &str,
        value: &str,
        cap: usize,
    ) -> Result<(), StrataError> {
        self.with_value(
            key,
            || Value::List(VecDeque::new()),
            |v| match v {
                Value::List(list) => {
                    list.push_back(value.to_string());
                    while list.len() > cap {
                        list.pop_front();
                    }
                    Ok(())
                }
                _ => Err(Self::wrong_type(key)),
            },
        )
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, StrataError> {
        Ok(self
            .read_value(key, |v| match v {
                Value::List(list) => Some(list.iter().cloned().collect()),
                _ => None,
            })
            .unwrap_or_default())
    }

    async fn sample_push_capped(
        &self,
        key: &str,
        value: f64,
        cap: usize,
    ) -> Result<(), StrataError> {
        self.with_value(
            key,
            || Value::Samples(VecDeque::new()),
            |v| match v {
                Value::Samples(samples) => {
                    samples.push_back(value);
                    while samples.len() > cap {
                        samples.pop_front();
                    }
                    Ok(())
                }
                _ => Err(Self::wrong_type(key)),
            },
        )
    }

    async fn samples(&self, key: &str) -> Result<Vec<f64>, StrataError> {
        Ok(self
            .read_value(key, |v| match v {
                Value::Samples(samples) => Some(samples.iter().copied().collect()),
                _ => None,
            })
            .unwrap_or_default())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StrataError> {
        if let Some(mut entry) = self.map.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StrataError> {
        self.map.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_none_for_missing_key() {
        let store = MemoryStore::new();
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_ex_then_get_round_trips() {
        let store = MemoryStore::new();
        store
            .set_ex("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", Duration::ZERO).await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn hash_incr_starts_at_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.hash_incr("h", "pulls", 1).await.unwrap(), 1);
        assert_eq!(store.hash_incr("h", "pulls", 2).await.unwrap(), 3);
        assert_eq!(
            store.hash_get("h", "pulls").await.unwrap().as_deref(),
            Some("3")
        );
    }

    #[tokio::test]
    async fn hash_incr_f64_accumulates() {
        let store = MemoryStore::new();
        store.hash_incr_f64("h", "reward", 0.5).await.unwrap();
        let total = store.hash_incr_f64("h", "reward", 0.25).await.unwrap();
        assert!((total - 0.75).abs() < 1e-9);
    }

    #[tokio::test]
    async fn concurrent_increments_do_not_lose_updates() {
        let store = MemoryStore::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    store.hash_incr("h", "n", 1).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(
            store.hash_get("h", "n").await.unwrap().as_deref(),
            Some("800")
        );
    }

    #[tokio::test]
    async fn list_push_capped_evicts_oldest() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .list_push_capped("l", &i.to_string(), 3)
                .await
                .unwrap();
        }
        assert_eq!(store.list_range("l").await.unwrap(), vec!["2", "3", "4"]);
    }

    #[tokio::test]
    async fn sample_push_capped_bounds_set() {
        let store = MemoryStore::new();
        for i in 0..1_100 {
            store
                .sample_push_capped("s", i as f64, 1_000)
                .await
                .unwrap();
        }
        let samples = store.samples("s").await.unwrap();
        assert_eq!(samples.len(), 1_000);
        assert!((samples[0] - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn wrong_type_operations_error() {
        let store = MemoryStore::new();
        store.hash_set("h", "f", "v").await.unwrap();
        assert!(store.list_push_capped("h", "x", 10).await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let store = MemoryStore::new();
        store.hash_set("h", "f", "v").await.unwrap();
        store.delete("h").await.unwrap();
        assert!(store.hash_get_all("h").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_entry_is_rebuilt_fresh_on_write() {
        let store = MemoryStore::new();
        assert_eq!(store.hash_incr("h", "n", 5).await.unwrap(), 5);
        store.expire("h", Duration::ZERO).await.unwrap();
        // The expired hash must not leak its old counters into the new one.
        assert_eq!(store.hash_incr("h", "n", 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn hash_incr_on_non_numeric_field_errors() {
        let store = MemoryStore::new();
        store.hash_set("h", "f", "not-a-number").await.unwrap();
        assert!(store.hash_incr("h", "f", 1).await.is_err());
    }
}
