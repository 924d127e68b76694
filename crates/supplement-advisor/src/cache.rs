/// Redis caching layer for the supplement advisor.
///
/// All operations return `Option<T>` / `bool` for graceful degradation; without Redis every
/// lookup is a miss and every write is a no-op.
///
/// Key schema:
/// - `sad:v1:supplement:{version}:{id}`: JSON SupplementDetailResponse (TTL 86400s, keyed by
///   catalog version so a new catalog never serves old records)
/// - `sad:v1:recommend:{sha256(version|symptoms|goals|limit)}`: JSON RecommendResponse (TTL 3600s)
use sha2::{Digest, Sha256};

use funnel_common::mcp_api::{RecommendResponse, SupplementDetailResponse};
use funnel_common::redis::RedisStore;

const KEY_PREFIX: &str = "sad:v1:";
const RECOMMEND_TTL_SECS: u64 = 3600;
const SUPPLEMENT_TTL_SECS: u64 = 86_400;

fn supplement_key(catalog_version: &str, id: &str) -> String {
    format!("{KEY_PREFIX}supplement:{catalog_version}:{id}")
}

pub struct RecommendationCache {
    redis: RedisStore,
}

impl RecommendationCache {
    pub fn new(redis: RedisStore) -> Self {
        Self { redis }
    }

    pub async fn get_supplement(
        &self,
        catalog_version: &str,
        id: &str,
    ) -> Option<SupplementDetailResponse> {
        self.redis.get_json(&supplement_key(catalog_version, id)).await
    }

    pub async fn set_supplement(&self, catalog_version: &str, detail: &SupplementDetailResponse) {
        let key = supplement_key(catalog_version, &detail.id);
        self.redis
            .put_json(&key, detail, Some(SUPPLEMENT_TTL_SECS))
            .await;
    }

    pub async fn get_recommendations(&self, key: &RecommendKey) -> Option<RecommendResponse> {
        self.redis.get_json(&key.0).await
    }

    pub async fn set_recommendations(&self, key: &RecommendKey, response: &RecommendResponse) {
        self.redis
            .put_json(&key.0, response, Some(RECOMMEND_TTL_SECS))
            .await;
    }
}

/// Cache key for one recommendation request.
///
/// Answers are order-insensitive: the same selection in a different order maps to the
/// same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendKey(String);

impl RecommendKey {
    pub fn new(catalog_version: &str, symptoms: &[String], goals: &[String], limit: usize) -> Self {
        let mut symptoms: Vec<&str> = symptoms.iter().map(String::as_str).collect();
        let mut goals: Vec<&str> = goals.iter().map(String::as_str).collect();
        symptoms.sort_unstable();
        symptoms.dedup();
        goals.sort_unstable();
        goals.dedup();

        let mut hasher = Sha256::new();
        hasher.update(catalog_version.as_bytes());
        hasher.update(b"|");
        hasher.update(symptoms.join(",").as_bytes());
        hasher.update(b"|");
        hasher.update(goals.join(",").as_bytes());
        hasher.update(b"|");
        hasher.update(limit.to_string().as_bytes());
        Self(format!("{KEY_PREFIX}recommend:{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn key_ignores_answer_order_and_repeats() {
        let a = RecommendKey::new("v1", &strings(&["stress", "fatigue"]), &[], 5);
        let b = RecommendKey::new("v1", &strings(&["fatigue", "stress", "fatigue"]), &[], 5);
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("sad:v1:recommend:"));
    }

    #[test]
    fn key_separates_symptoms_goals_version_and_limit() {
        let base = RecommendKey::new("v1", &strings(&["stress"]), &[], 5);
        assert_ne!(base, RecommendKey::new("v1", &[], &strings(&["stress"]), 5));
        assert_ne!(base, RecommendKey::new("v2", &strings(&["stress"]), &[], 5));
        assert_ne!(base, RecommendKey::new("v1", &strings(&["stress"]), &[], 3));
    }

    #[test]
    fn supplement_key_carries_catalog_version() {
        assert_eq!(
            supplement_key("2024.06.1", "iron"),
            "sad:v1:supplement:2024.06.1:iron"
        );
        assert_ne!(supplement_key("v1", "iron"), supplement_key("v2", "iron"));
    }

    #[tokio::test]
    async fn cache_without_redis_always_misses() {
        let cache = RecommendationCache::new(RedisStore::disabled());
        let key = RecommendKey::new("v1", &[], &[], 5);
        let response = RecommendResponse {
            catalog_version: "v1".to_string(),
            recommendations: vec![],
            fallback_message: None,
        };
        cache.set_recommendations(&key, &response).await;
        assert!(cache.get_recommendations(&key).await.is_none());
        assert!(cache.get_supplement("v1", "iron").await.is_none());
    }
}
