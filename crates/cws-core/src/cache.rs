//! Read-through cache of materialized assets.
//!
//! One cache belongs to one report orchestrator and is cleared before each
//! top-level run. Entries never expire on their own; a run's working set is
//! bounded by its subtree.

use crate::asset::Asset;
use crate::child::Child;
use cws_connectors::{AssetOperations, CascadeResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// Hit/miss counters for one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: u64,
    /// hits / (hits + misses), 0.0 before any lookup.
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn new(hits: u64, misses: u64, size: u64) -> Self {
        let hit_rate = if hits + misses > 0 {
            hits as f64 / (hits + misses) as f64
        } else {
            0.0
        };

        Self {
            hits,
            misses,
            size,
            hit_rate,
        }
    }

    pub fn total_lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Memoizes `Child::get_asset` by identifier string.
///
/// A hit returns the very `Arc` stored on the miss, so repeated lookups of
/// one identifier within a run observe the same instance.
#[derive(Debug, Default)]
pub struct AssetCache {
    entries: RwLock<HashMap<String, Arc<Asset>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached asset for `child`, reading it on a miss.
    ///
    /// A failed read is not cached.
    pub async fn retrieve_asset(
        &self,
        client: &dyn AssetOperations,
        child: &Child,
    ) -> CascadeResult<Arc<Asset>> {
        let key = child.key();
        if let Some(asset) = self.entries.read().await.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Cache hit");
            return Ok(Arc::clone(asset));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Cache miss");
        let asset = Arc::new(child.get_asset(client).await?);

        let mut entries = self.entries.write().await;
        Ok(Arc::clone(entries.entry(key).or_insert(asset)))
    }

    /// Drops every entry and resets the counters.
    pub async fn clear_cache(&self) {
        let mut entries = self.entries.write().await;
        debug!(entries = entries.len(), "Clearing asset cache");
        entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn contains(&self, child: &Child) -> bool {
        self.entries.read().await.contains_key(&child.key())
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats::new(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.len().await as u64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cws_connectors::testing::{hex_id, mock_with_sample_tree};
    use cws_connectors::{AssetType, CascadeError};

    fn page_b() -> Child {
        Child::new(hex_id(3), AssetType::Page, "docs/b", Some("www"))
    }

    #[tokio::test]
    async fn test_hit_returns_same_instance() {
        let mock = mock_with_sample_tree();
        let cache = AssetCache::new();

        let first = cache.retrieve_asset(&mock, &page_b()).await.unwrap();
        let second = cache.retrieve_asset(&mock, &page_b()).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(mock.count("read"), 1);

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_clear_forces_reread() {
        let mock = mock_with_sample_tree();
        let cache = AssetCache::new();

        let before = cache.retrieve_asset(&mock, &page_b()).await.unwrap();
        cache.clear_cache().await;
        assert!(cache.is_empty().await);
        assert_eq!(cache.stats().await.total_lookups(), 0);

        let after = cache.retrieve_asset(&mock, &page_b()).await.unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(mock.count("read"), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let mock = mock_with_sample_tree();
        let cache = AssetCache::new();
        let missing = Child::new(hex_id(42), AssetType::Page, "docs/z", Some("www"));

        assert!(matches!(
            cache.retrieve_asset(&mock, &missing).await,
            Err(CascadeError::NullAsset(_))
        ));
        assert!(!cache.contains(&missing).await);
        assert_eq!(cache.len().await, 0);
    }

    #[test]
    fn test_stats_zero_lookups() {
        assert_eq!(CacheStats::new(0, 0, 0).hit_rate, 0.0);
    }
}
