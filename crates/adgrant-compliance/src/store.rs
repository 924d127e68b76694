/// Persistence for per-session issue logs.
///
/// Key schema:
/// - `agc:v1:issues:{session_id}`: JSON IssueLog (TTL = session TTL, refreshed on every save)
///
/// Without Redis loads miss and saves are no-ops; sessions then live only in memory.
use funnel_common::redis::RedisStore;

use crate::tracker::IssueLog;

const KEY_PREFIX: &str = "agc:v1:";

pub struct IssueStore {
    redis: RedisStore,
    ttl_secs: u64,
}

impl IssueStore {
    pub fn new(redis: RedisStore, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    pub fn is_persistent(&self) -> bool {
        self.redis.is_configured()
    }

    fn key(session_id: &str) -> String {
        format!("{KEY_PREFIX}issues:{session_id}")
    }

    pub async fn load(&self, session_id: &str) -> Option<IssueLog> {
        self.redis.get_json(&Self::key(session_id)).await
    }

    pub async fn save(&self, session_id: &str, log: &IssueLog) -> bool {
        self.redis
            .put_json(&Self::key(session_id), log, Some(self.ttl_secs))
            .await
    }

    pub async fn delete(&self, session_id: &str) -> bool {
        self.redis.delete(&Self::key(session_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_namespaced_per_session() {
        assert_eq!(IssueStore::key("abc"), "agc:v1:issues:abc");
    }

    #[tokio::test]
    async fn store_without_redis_keeps_nothing() {
        let store = IssueStore::new(RedisStore::disabled(), 60);
        assert!(!store.is_persistent());
        assert!(!store.save("abc", &IssueLog::new()).await);
        assert!(store.load("abc").await.is_none());
        assert!(!store.delete("abc").await);
    }
}
