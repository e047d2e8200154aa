//! Redis cache service
//!
//! The cache is an accelerator, never a source of truth: every failure in
//! here is logged and swallowed so a broken or unreachable Redis can never
//! fail a primary operation. Entries expire independently; mutating services
//! additionally invalidate the keys they know about after a commit.

use std::future::Future;

use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct CacheService {
    client: Client,
}

impl CacheService {
    /// Create a new cache service and verify connectivity
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    async fn connection(&self) -> Option<redis::aio::MultiplexedConnection> {
        match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                tracing::warn!("Failed to get Redis connection: {}", e);
                None
            }
        }
    }

    /// Look up a key and deserialize its value. Any miss, connection failure
    /// or deserialization failure yields `None`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.connection().await?;

        let raw: Option<String> = match conn.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw?) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Cache entry {} failed to deserialize: {}", key, e);
                None
            }
        }
    }

    /// Serialize and store a value with an expiry, best-effort
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) {
        let Some(mut conn) = self.connection().await else {
            return;
        };

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to serialize cache entry {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = conn.set_ex::<_, _, ()>(key, raw, ttl_seconds).await {
            tracing::warn!("Cache write failed for {}: {}", key, e);
        }
    }

    /// Delete a key, best-effort
    pub async fn delete(&self, key: &str) {
        let Some(mut conn) = self.connection().await else {
            return;
        };

        if let Err(e) = conn.del::<_, ()>(key).await {
            tracing::warn!("Cache delete failed for {}: {}", key, e);
        }
    }

    /// Delete every key starting with the given prefix, best-effort
    pub async fn invalidate_prefix(&self, prefix: &str) {
        let Some(mut conn) = self.connection().await else {
            return;
        };

        let pattern = format!("{}*", prefix);
        let keys: Vec<String> = {
            let mut iter = match conn.scan_match::<_, String>(&pattern).await {
                Ok(iter) => iter,
                Err(e) => {
                    tracing::warn!("Cache scan failed for {}: {}", pattern, e);
                    return;
                }
            };

            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        if keys.is_empty() {
            return;
        }

        if let Err(e) = conn.del::<_, ()>(keys).await {
            tracing::warn!("Cache invalidation failed for {}: {}", pattern, e);
        }
    }

    /// Read-through lookup: serve from cache on a hit, otherwise load from
    /// the authoritative store and write the result back with the given TTL.
    ///
    /// A hit skips the store entirely, so it may serve data staler than a
    /// concurrent mutation. Loader errors propagate; cache errors never do.
    pub async fn read_through<T, F, Fut>(
        &self,
        key: &str,
        ttl_seconds: u64,
        loader: F,
    ) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        if let Some(hit) = self.get_json::<T>(key).await {
            tracing::debug!("Cache hit for {}", key);
            return Ok(hit);
        }

        let value = loader().await?;
        self.set_json(key, &value, ttl_seconds).await;
        Ok(value)
    }
}

/// Cache key for a single book
pub fn book_key(id: i32) -> String {
    format!("book:{}", id)
}

/// Cache key for a user profile
pub fn user_key(id: i32) -> String {
    format!("user:{}", id)
}

/// Prefix shared by all paginated book listing keys
pub const BOOK_LISTING_PREFIX: &str = "books:page:";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_keys_are_deterministic() {
        assert_eq!(book_key(42), "book:42");
        assert_eq!(user_key(7), "user:7");
    }

    #[test]
    fn listing_keys_share_the_invalidation_prefix() {
        let key = crate::pagination::PageSpec::new(2, 10).cache_key("books");
        assert!(key.starts_with(BOOK_LISTING_PREFIX));
    }
}
