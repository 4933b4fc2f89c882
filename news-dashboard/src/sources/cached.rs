use super::FeedBackend;
use crate::traits::FeedFetcher;
use crate::types::{OutletDescriptor, RawEntry, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Cache entry with expiration
struct CacheEntry {
    entries: Vec<RawEntry>,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(entries: Vec<RawEntry>, ttl: Duration) -> Self {
        Self {
            entries,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Memoizes successful fetches per feed URL for a fixed time-to-live.
/// Failures are never cached.
pub struct CachedFetcher<F> {
    inner: F,
    ttl: Duration,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl<F: FeedFetcher> CachedFetcher<F> {
    pub fn new(inner: F, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop every memoized result so the next fetch goes to the network
    pub async fn invalidate(&self) {
        self.cache.write().await.clear();
        debug!("Cleared feed cache");
    }

    pub async fn cached_feeds(&self) -> usize {
        self.cache.read().await.values().filter(|e| !e.is_expired()).count()
    }
}

#[async_trait]
impl<F: FeedFetcher> FeedFetcher for CachedFetcher<F> {
    fn backend(&self) -> FeedBackend {
        self.inner.backend()
    }

    async fn fetch(&self, outlet: &OutletDescriptor) -> Result<Vec<RawEntry>> {
        if self.ttl.is_zero() {
            return self.inner.fetch(outlet).await;
        }

        // Check cache first
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&outlet.feed_url) {
                if !entry.is_expired() {
                    debug!("Cache hit for {}", outlet.feed_url);
                    return Ok(entry.entries.clone());
                }
            }
        }

        let entries = self.inner.fetch(outlet).await?;

        let mut cache = self.cache.write().await;
        cache.retain(|_, entry| !entry.is_expired());
        cache.insert(outlet.feed_url.clone(), CacheEntry::new(entries.clone(), self.ttl));

        Ok(entries)
    }
}
