//! Time-boxed memo of upstream answers.
//!
//! Every entry lives for the same TTL, counted from when it was stored.
//! "데이터 강제 갱신" wipes the whole map; there is no per-key eviction and no
//! size bound, since a dashboard touches at most a few dozen tickers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tokio::sync::RwLock;

/// How long a price or fundamentals answer is reused.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

#[derive(Debug)]
struct Stored {
    value: Value,
    at: Instant,
}

/// Counters reported by `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    #[serde(rename = "ttl_secs", serialize_with = "as_secs")]
    pub ttl: Duration,
}

fn as_secs<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(ttl.as_secs())
}

/// Cloning shares the underlying map.
#[derive(Debug, Clone)]
pub struct CacheStore {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, Stored>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl CacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::default(),
            hits: Arc::default(),
            misses: Arc::default(),
        }
    }

    /// Stores nothing; every lookup misses.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn is_disabled(&self) -> bool {
        self.ttl.is_zero()
    }

    /// A fresh entry decoded as `T`. Stale or undecodable entries count as
    /// misses.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = {
            let entries = self.entries.read().await;
            entries
                .get(key)
                .filter(|stored| stored.at.elapsed() < self.ttl)
                .map(|stored| stored.value.clone())
        };

        let decoded = value.and_then(|value| {
            serde_json::from_value(value)
                .inspect_err(|error| tracing::warn!(key, %error, "ignoring undecodable cache entry"))
                .ok()
        });
        let counter = if decoded.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        decoded
    }

    pub async fn put_json<T: Serialize>(&self, key: String, value: &T) {
        if self.is_disabled() {
            return;
        }
        match serde_json::to_value(value) {
            Ok(value) => {
                let stored = Stored {
                    value,
                    at: Instant::now(),
                };
                self.entries.write().await.insert(key, stored);
            }
            Err(error) => tracing::warn!(key, %error, "not caching unserializable value"),
        }
    }

    /// Drops stale entries and returns how many went.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, stored| stored.at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Includes stale entries not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len().await,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ttl: self.ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hits_until_the_ttl_runs_out() {
        let cache = CacheStore::new(Duration::from_millis(80));
        assert_eq!(cache.get_json::<f64>("close:AAPL").await, None);

        cache.put_json(String::from("close:AAPL"), &187.5_f64).await;
        assert_eq!(cache.get_json::<f64>("close:AAPL").await, Some(187.5));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.get_json::<f64>("close:AAPL").await, None);

        let stats = cache.stats().await;
        assert_eq!((stats.hits, stats.misses), (1, 2));
    }

    #[tokio::test]
    async fn overwrites_restart_the_clock() {
        let cache = CacheStore::new(Duration::from_secs(60));
        cache.put_json(String::from("k"), &1_u8).await;
        cache.put_json(String::from("k"), &2_u8).await;

        assert_eq!(cache.get_json::<u8>("k").await, Some(2));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn purge_and_clear() {
        let cache = CacheStore::new(Duration::from_millis(50));
        cache.put_json(String::from("a"), &"x").await;
        cache.put_json(String::from("b"), &"y").await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.purge_expired().await, 2);
        assert!(cache.is_empty().await);

        cache.put_json(String::from("c"), &"z").await;
        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn disabled_cache_stores_nothing() {
        let cache = CacheStore::disabled();
        cache.put_json(String::from("a"), &1).await;

        assert!(cache.is_disabled());
        assert_eq!(cache.get_json::<i32>("a").await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn wrong_shape_counts_as_a_miss() {
        let cache = CacheStore::default();
        cache.put_json(String::from("bars"), &vec![1.5_f64, 2.5]).await;

        assert_eq!(cache.get_json::<Vec<f64>>("bars").await, Some(vec![1.5, 2.5]));
        assert_eq!(cache.get_json::<String>("bars").await, None);
        assert_eq!(cache.stats().await.misses, 1);
    }
}
