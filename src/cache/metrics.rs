use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tracks performance metrics for model loading and caching
#[derive(Debug, Default)]
pub struct AssetMetrics {
    load_times: RwLock<HashMap<String, Duration>>,
    load_counts: RwLock<HashMap<String, u64>>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    evictions: AtomicU64,
    disposals: AtomicU64,
    failed_loads: AtomicU64,
}

impl AssetMetrics {
    /// Create a new instance of AssetMetrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed fetch/decode for an asset
    pub fn record_load(&self, url: &str, duration: Duration) {
        self.load_times.write().insert(url.to_string(), duration);
        *self.load_counts.write().entry(url.to_string()).or_insert(0) += 1;
    }

    /// Drop per-URL load history once a model has left the cache
    ///
    /// Keeps the history bounded by the cache capacity.
    pub fn forget(&self, url: &str) {
        self.load_times.write().remove(url);
        self.load_counts.write().remove(url);
    }

    pub fn record_failed_load(&self) {
        self.failed_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disposal(&self) {
        self.disposals.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the cache hit rate as a percentage
    pub fn cache_hit_rate(&self) -> f32 {
        let hits = self.cache_hits.load(Ordering::Relaxed) as f32;
        let misses = self.cache_misses.load(Ordering::Relaxed) as f32;

        if hits + misses > 0.0 {
            hits / (hits + misses) * 100.0
        } else {
            0.0
        }
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn disposals(&self) -> u64 {
        self.disposals.load(Ordering::Relaxed)
    }

    pub fn failed_loads(&self) -> u64 {
        self.failed_loads.load(Ordering::Relaxed)
    }

    /// Duration of the most recent load of an asset
    pub fn last_load_time(&self, url: &str) -> Option<Duration> {
        self.load_times.read().get(url).cloned()
    }

    /// How many times an asset was fetched and decoded
    pub fn load_count(&self, url: &str) -> u64 {
        *self.load_counts.read().get(url).unwrap_or(&0)
    }

    /// Get all recorded load times
    pub fn all_load_times(&self) -> HashMap<String, Duration> {
        self.load_times.read().clone()
    }
}

/// A thread-safe wrapper around AssetMetrics
#[derive(Debug, Clone, Default)]
pub struct AssetMetricsHandle(Arc<AssetMetrics>);

impl AssetMetricsHandle {
    /// Create a new metrics handle
    pub fn new() -> Self {
        Self(Arc::new(AssetMetrics::new()))
    }

}

impl std::ops::Deref for AssetMetricsHandle {
    type Target = AssetMetrics;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
