//! Keyed stores with per-entry expiry.
//!
//! The credential cache and the category aggregator take an
//! [`ExpiringStore`] at construction, so tests can hand them a fresh
//! in-memory store and production can share one per concern.

use std::marker::PhantomData;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

/// A shared key/value store whose entries expire after a caller-chosen TTL.
///
/// Writers overwrite unconditionally; values must be re-derivable.
#[async_trait]
pub trait ExpiringStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Value under `key`, if present and not expired.
    async fn get(&self, key: &str) -> Option<V>;

    /// Store `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: V, ttl: Duration);

    /// Drop `key` immediately.
    async fn expire(&self, key: &str);
}

#[derive(Clone)]
struct TimedValue<V> {
    value: V,
    ttl: Duration,
}

/// Reads each entry's own TTL back out of the stored value.
struct PerEntryTtl<V>(PhantomData<fn() -> V>);

impl<V> Expiry<String, TimedValue<V>> for PerEntryTtl<V> {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &TimedValue<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &TimedValue<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// [`ExpiringStore`] backed by a `moka` future cache.
#[derive(Clone)]
pub struct MokaStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<String, TimedValue<V>>,
}

impl<V> MokaStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a store holding at most `max_capacity` entries.
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl(PhantomData))
            .build();

        Self { cache }
    }
}

#[async_trait]
impl<V> ExpiringStore<V> for MokaStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        self.cache.get(key).await.map(|entry| entry.value)
    }

    async fn set(&self, key: &str, value: V, ttl: Duration) {
        self.cache
            .insert(key.to_string(), TimedValue { value, ttl })
            .await;
    }

    async fn expire(&self, key: &str) {
        self.cache.invalidate(key).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MokaStore::<String>::new(10);
        store
            .set("k", "v".to_string(), Duration::from_secs(60))
            .await;
        assert_eq!(store.get("k").await.as_deref(), Some("v"));
        assert_eq!(store.get("other").await, None);
    }

    #[tokio::test]
    async fn test_expire_removes_entry() {
        let store = MokaStore::<u32>::new(10);
        store.set("k", 7, Duration::from_secs(60)).await;
        store.expire("k").await;
        assert_eq!(store.get("k").await, None);
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let store = MokaStore::<u32>::new(10);
        store.set("short", 1, Duration::from_millis(50)).await;
        store.set("long", 2, Duration::from_secs(60)).await;

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(store.get("short").await, None);
        assert_eq!(store.get("long").await, Some(2));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value_and_ttl() {
        let store = MokaStore::<u32>::new(10);
        store.set("k", 1, Duration::from_millis(50)).await;
        store.set("k", 2, Duration::from_secs(60)).await;

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(store.get("k").await, Some(2));
    }
}
