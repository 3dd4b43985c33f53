use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Keyed in-memory cache with a fixed TTL and a size cap. Concurrent reads
/// share the lock; simultaneous misses may both recompute and both insert,
/// which is acceptable for the analytics aggregates it fronts.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    max_size: usize,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(max_size: usize, ttl_seconds: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_size,
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.value.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Expired entry: drop it under the write lock.
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if entry.expires_at <= Instant::now() {
                entries.remove(key);
            }
        }
        None
    }

    pub async fn insert(&self, key: impl Into<String>, value: V) {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        if entries.len() >= self.max_size && self.max_size > 0 {
            // Full of live entries: evict the one expiring soonest.
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone())
            {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_inserted_value() {
        let cache = TtlCache::new(10, 60);
        cache.insert("summary:org", 42u32).await;
        assert_eq!(cache.get("summary:org").await, Some(42));
        assert_eq!(cache.get("funnel:org").await, None);
    }

    #[tokio::test]
    async fn expired_entries_are_dropped() {
        let cache = TtlCache::new(10, 0);
        cache.insert("k", 1u32).await;
        assert_eq!(cache.get("k").await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn size_cap_evicts_an_entry() {
        let cache = TtlCache::new(2, 60);
        cache.insert("a", 1u32).await;
        cache.insert("b", 2u32).await;
        cache.insert("c", 3u32).await;
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("c").await, Some(3));
    }

    #[tokio::test]
    async fn concurrent_reads_share_the_cache() {
        let cache = std::sync::Arc::new(TtlCache::new(10, 60));
        cache.insert("k", 7u32).await;
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get("k").await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(7));
        }
    }
}
