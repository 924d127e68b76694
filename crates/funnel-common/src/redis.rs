/// Redis-backed JSON key/value store with graceful degradation.
///
/// Entries are opaque JSON documents keyed by string. On any Redis failure the operation logs
/// a warning and reports a miss (`None` / `false`), so every service stays fully functional
/// without Redis.
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::CommonError;

#[derive(Clone)]
pub struct RedisStore {
    client: Option<redis::Client>,
}

impl RedisStore {
    /// Build a store from an optional URL. A missing or unparsable URL yields a store that
    /// never touches the network.
    pub fn new(url: Option<&str>) -> Self {
        let client = url.and_then(|u| {
            redis::Client::open(u)
                .inspect_err(|e| warn!(error = %e, url = u, "failed to create redis client, store disabled"))
                .ok()
        });
        Self { client }
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub async fn ping(&self) -> Result<(), CommonError> {
        let client = self.client.as_ref().ok_or(CommonError::RedisUnavailable)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    pub async fn is_available(&self) -> bool {
        self.ping().await.is_ok()
    }

    async fn connection(&self) -> Option<MultiplexedConnection> {
        let client = self.client.as_ref()?;
        client
            .get_multiplexed_async_connection()
            .await
            .inspect_err(|e| warn!(error = %e, "redis connection failed"))
            .ok()
    }

    /// Read and decode a JSON entry. Missing keys, Redis errors and undecodable payloads are
    /// all reported as `None`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(key)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis GET failed"))
            .ok()?;
        serde_json::from_str(&raw?)
            .inspect_err(|e| warn!(error = %e, key, "stored entry failed to decode"))
            .ok()
    }

    /// Encode and write a JSON entry, with an expiry when `ttl_secs` is set.
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: Option<u64>,
    ) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, key, "entry failed to encode");
                return false;
            }
        };
        let written = match ttl_secs {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, raw, ttl).await,
            None => conn.set::<_, _, ()>(key, raw).await,
        };
        written
            .inspect_err(|e| warn!(error = %e, key, "redis SET failed"))
            .is_ok()
    }

    pub async fn delete(&self, key: &str) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        conn.del::<_, ()>(key)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis DEL failed"))
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_store_reports_misses() {
        let store = RedisStore::new(None);
        assert!(!store.is_configured());
        assert!(!store.is_available().await);
        assert!(matches!(store.ping().await, Err(CommonError::RedisUnavailable)));
        assert_eq!(store.get_json::<Vec<String>>("any").await, None);
        assert!(!store.put_json("any", &vec!["a"], Some(10)).await);
        assert!(!store.delete("any").await);
    }

    #[test]
    fn unparsable_url_disables_store() {
        let store = RedisStore::new(Some("definitely not a url"));
        assert!(!store.is_configured());
    }
}
