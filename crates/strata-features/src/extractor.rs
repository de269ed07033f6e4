// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feature extraction: raw request + identity in, `RouterFeatures` out.
//!
//! `extract` never fails. Pure text signals cannot fail; the three store
//! lookups (recent requests for novelty, failure rate, user tier) fan out
//! concurrently and any failure is isolated, replaced by the documented
//! neutral default without aborting the others.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Timelike, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use strata_core::{RouterFeatures, StrataError};
use strata_store::{FEATURE_CACHE_TTL, RECENT_REQUESTS_CAP, RouterStore, keys};

use crate::signals;

/// Neutral fallbacks when a store-backed sub-feature fails.
const DEFAULT_FAILURE_RATE: f64 = 0.1;
const DEFAULT_USER_TIER: &str = "standard";

/// Turns a raw request plus tenant/user identity into a feature vector.
pub struct FeatureExtractor {
    store: Arc<dyn RouterStore>,
    store_timeout: Duration,
}

impl FeatureExtractor {
    pub fn new(store: Arc<dyn RouterStore>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// Extract features for one request. Never fails; bad sub-features
    /// degrade to neutral defaults.
    ///
    /// Side effect: appends the request text to the tenant's bounded
    /// recent-request list used for novelty scoring.
    pub async fn extract(&self, request: &str, tenant: &str, user: &str) -> RouterFeatures {
        let content_hash = content_hash(request, tenant, user);
        let cache_key = keys::feature_cache(tenant, &content_hash);

        if let Some(cached) = self.cached(&cache_key).await {
            debug!(tenant, %content_hash, "feature cache hit");
            return cached;
        }

        // Store-backed sub-features fan out concurrently; each failure is
        // isolated and replaced by its default.
        let (recent, failure_rate, user_tier) = tokio::join!(
            self.recent_requests(tenant),
            self.failure_rate(tenant, user),
            self.user_tier(tenant, user),
        );

        let now = Utc::now();
        let features = RouterFeatures {
            token_count: signals::estimate_tokens(request),
            schema_strictness: signals::schema_strictness(request),
            domain_flags: signals::domain_flags(request),
            novelty_score: signals::novelty_score(request, &recent),
            historical_failure_rate: failure_rate,
            user_tier,
            time_of_day: now.hour() as u8,
            day_of_week: now.weekday().num_days_from_monday() as u8,
            request_complexity: signals::request_complexity(request),
        };

        // Feed the novelty window and the cache. Neither write is allowed
        // to fail extraction.
        if let Err(error) = self
            .bounded(self.store.list_push_capped(
                &keys::recent_requests(tenant),
                request,
                RECENT_REQUESTS_CAP,
            ))
            .await
        {
            warn!(tenant, %error, "failed to append recent request");
        }
        if let Ok(serialized) = serde_json::to_string(&features) {
            if let Err(error) = self
                .bounded(self.store.set_ex(&cache_key, &serialized, FEATURE_CACHE_TTL))
                .await
            {
                warn!(tenant, %error, "failed to cache features");
            }
        }

        features
    }

    async fn cached(&self, cache_key: &str) -> Option<RouterFeatures> {
        let raw = self.bounded(self.store.get(cache_key)).await.ok()??;
        serde_json::from_str(&raw).ok()
    }

    async fn recent_requests(&self, tenant: &str) -> Vec<String> {
        match self
            .bounded(self.store.list_range(&keys::recent_requests(tenant)))
            .await
        {
            Ok(recent) => recent,
            Err(error) => {
                warn!(tenant, %error, "recent-request lookup failed; novelty degrades");
                Vec::new()
            }
        }
    }

    async fn failure_rate(&self, tenant: &str, user: &str) -> f64 {
        let user_key = keys::user_failure_rate(tenant, user);
        match self.bounded(self.store.get(&user_key)).await {
            Ok(Some(raw)) => raw.parse().unwrap_or(DEFAULT_FAILURE_RATE),
            Ok(None) => {
                // Tenant-level value as fallback for unseen users.
                match self
                    .bounded(self.store.get(&keys::tenant_failure_rate(tenant)))
                    .await
                {
                    Ok(Some(raw)) => raw.parse().unwrap_or(DEFAULT_FAILURE_RATE),
                    _ => DEFAULT_FAILURE_RATE,
                }
            }
            Err(error) => {
                warn!(tenant, user, %error, "failure-rate lookup failed");
                DEFAULT_FAILURE_RATE
            }
        }
    }

    async fn user_tier(&self, tenant: &str, user: &str) -> String {
        match self.bounded(self.store.get(&keys::user_tier(tenant, user))).await {
            Ok(Some(tier)) => tier,
            Ok(None) => DEFAULT_USER_TIER.to_string(),
            Err(error) => {
                warn!(tenant, user, %error, "user-tier lookup failed");
                DEFAULT_USER_TIER.to_string()
            }
        }
    }

    /// Wrap a store call in the decision-path deadline.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, StrataError>>,
    ) -> Result<T, StrataError> {
        tokio::time::timeout(self.store_timeout, fut)
            .await
            .map_err(|_| StrataError::Timeout {
                duration: self.store_timeout,
            })?
    }
}

/// Stable hash of {request, tenant, user} used as the feature cache key.
pub fn content_hash(request: &str, tenant: &str, user: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.as_bytes());
    hasher.update([0]);
    hasher.update(tenant.as_bytes());
    hasher.update([0]);
    hasher.update(user.as_bytes());
    hex::encode(&hasher.finalize()[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait_shim::FailingStore;
    use strata_store::MemoryStore;

    mod async_trait_shim {
        use std::collections::HashMap;
        use std::time::Duration;

        use strata_core::StrataError;
        use strata_store::RouterStore;

        /// A store where every operation fails, for fallback-path tests.
        pub struct FailingStore;

        fn down() -> StrataError {
            StrataError::store(std::io::Error::other("store down"))
        }

        #[async_trait::async_trait]
        impl RouterStore for FailingStore {
            async fn get(&self, _: &str) -> Result<Option<String>, StrataError> {
                Err(down())
            }
            async fn set_ex(&self, _: &str, _: &str, _: Duration) -> Result<(), StrataError> {
                Err(down())
            }
            async fn hash_get(&self, _: &str, _: &str) -> Result<Option<String>, StrataError> {
                Err(down())
            }
            async fn hash_set(&self, _: &str, _: &str, _: &str) -> Result<(), StrataError> {
                Err(down())
            }
            async fn hash_get_all(
                &self,
                _: &str,
            ) -> Result<HashMap<String, String>, StrataError> {
                Err(down())
            }
            async fn hash_incr(&self, _: &str, _: &str, _: i64) -> Result<i64, StrataError> {
                Err(down())
            }
            async fn hash_incr_f64(&self, _: &str, _: &str, _: f64) -> Result<f64, StrataError> {
                Err(down())
            }
            async fn list_push_capped(
                &self,
                _: &str,
                _: &str,
                _: usize,
            ) -> Result<(), StrataError> {
                Err(down())
            }
            async fn list_range(&self, _: &str) -> Result<Vec<String>, StrataError> {
                Err(down())
            }
            async fn sample_push_capped(
                &self,
                _: &str,
                _: f64,
                _: usize,
            ) -> Result<(), StrataError> {
                Err(down())
            }
            async fn samples(&self, _: &str) -> Result<Vec<f64>, StrataError> {
                Err(down())
            }
            async fn expire(&self, _: &str, _: Duration) -> Result<(), StrataError> {
                Err(down())
            }
            async fn delete(&self, _: &str) -> Result<(), StrataError> {
                Err(down())
            }
        }
    }

    fn extractor(store: Arc<dyn RouterStore>) -> FeatureExtractor {
        FeatureExtractor::new(store, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn extract_populates_text_signals() {
        let store = Arc::new(MemoryStore::new());
        let ex = extractor(store);
        let features = ex
            .extract("please validate this json schema for my api", "t1", "u1")
            .await;
        assert!(features.schema_strictness > 0.0);
        assert_eq!(features.domain_flags.get("technical"), Some(&true));
        assert!(features.token_count > 0);
        assert!(features.time_of_day <= 23);
        assert!(features.day_of_week <= 6);
    }

    #[tokio::test]
    async fn extract_appends_to_recent_request_list() {
        let store = Arc::new(MemoryStore::new());
        let ex = extractor(store.clone());
        ex.extract("first request text", "t1", "u1").await;
        let recent = store
            .list_range(&keys::recent_requests("t1"))
            .await
            .unwrap();
        assert_eq!(recent, vec!["first request text"]);
    }

    #[tokio::test]
    async fn repeated_request_is_not_novel() {
        let store = Arc::new(MemoryStore::new());
        let ex = extractor(store);
        ex.extract("reset my password", "t1", "u1").await;
        // Different user defeats the feature cache; novelty history is
        // tenant-wide.
        let second = ex.extract("reset my password", "t1", "u2").await;
        assert!(
            second.novelty_score < 0.1,
            "expected low novelty, got {}",
            second.novelty_score
        );
    }

    #[tokio::test]
    async fn extract_writes_feature_cache() {
        let store = Arc::new(MemoryStore::new());
        let ex = extractor(store.clone());
        ex.extract("cache me", "t1", "u1").await;
        let key = keys::feature_cache("t1", &content_hash("cache me", "t1", "u1"));
        assert!(store.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failure_rate_falls_back_user_then_tenant_then_default() {
        let store = Arc::new(MemoryStore::new());
        store
            .set_ex(&keys::tenant_failure_rate("t1"), "0.25", Duration::from_secs(60))
            .await
            .unwrap();
        let ex = extractor(store.clone());
        let features = ex.extract("hello there", "t1", "unseen-user").await;
        assert!((features.historical_failure_rate - 0.25).abs() < 1e-9);

        store
            .set_ex(
                &keys::user_failure_rate("t1", "u9"),
                "0.4",
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        let features = ex.extract("hello again", "t1", "u9").await;
        assert!((features.historical_failure_rate - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn store_outage_degrades_to_neutral_defaults() {
        let ex = extractor(Arc::new(FailingStore));
        let features = ex.extract("anything at all", "t1", "u1").await;
        assert!((features.historical_failure_rate - 0.1).abs() < f64::EPSILON);
        assert_eq!(features.user_tier, "standard");
        // Text signals still computed; only store-backed features degrade.
        assert!(features.token_count > 0);
    }

    #[test]
    fn content_hash_is_stable_and_identity_sensitive() {
        let a = content_hash("req", "t1", "u1");
        assert_eq!(a, content_hash("req", "t1", "u1"));
        assert_ne!(a, content_hash("req", "t1", "u2"));
        assert_ne!(a, content_hash("req", "t2", "u1"));
        assert_ne!(a, content_hash("other", "t1", "u1"));
    }
}
