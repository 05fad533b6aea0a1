//! Model caching with LRU eviction policy
//!
//! This module provides a bounded, recency-ordered store of loaded models.
//! Every model that leaves the cache, whether evicted, removed or cleared,
//! has its GPU resources released before the operation returns.

pub mod metrics;

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use parking_lot::Mutex;

use crate::gpu::GpuDevice;
use crate::model::ModelHandle;
use crate::process::dispose_model;
use metrics::AssetMetricsHandle;

/// Default number of models kept before the least recently used is evicted
pub const MAX_CACHE_SIZE: usize = 50;

/// A cached model with metadata
#[derive(Debug)]
struct CacheEntry {
    handle: ModelHandle,
    last_used: Instant,
}

/// Map and recency order live under one lock so they never disagree.
#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// Keys from least to most recently used
    lru: VecDeque<String>,
}

impl CacheState {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.lru.iter().position(|k| k == key) {
            self.lru.remove(pos);
        }
        self.lru.push_back(key.to_string());
    }

    fn take(&mut self, key: &str) -> Option<ModelHandle> {
        let entry = self.entries.remove(key)?;
        if let Some(pos) = self.lru.iter().position(|k| k == key) {
            self.lru.remove(pos);
        }
        Some(entry.handle)
    }
}

/// Manages cached models with LRU eviction policy
///
/// Generic over the GPU device that releases evicted resources.
#[derive(Debug)]
pub struct ModelCache<G: GpuDevice = crate::gpu::mock::MockGpu> {
    state: Mutex<CacheState>,
    capacity: usize,
    gpu: G,
    metrics: AssetMetricsHandle,
}

impl<G: GpuDevice> ModelCache<G> {
    /// Creates a cache holding up to [`MAX_CACHE_SIZE`] models
    pub fn new(gpu: G) -> Self {
        Self::with_capacity(gpu, MAX_CACHE_SIZE)
    }

    /// Creates a cache with a custom bound (at least one entry)
    pub fn with_capacity(gpu: G, capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity: capacity.max(1),
            gpu,
            metrics: AssetMetricsHandle::new(),
        }
    }

    /// Insert a model, evicting the least recently used one if full
    ///
    /// If `key` is already cached only its recency is refreshed; the passed
    /// handle is not stored and stays owned by the caller.
    pub fn put(&self, key: impl Into<String>, handle: ModelHandle) {
        let key = key.into();
        let evicted = {
            let mut state = self.state.lock();

            if let Some(entry) = state.entries.get_mut(&key) {
                entry.last_used = Instant::now();
                state.touch(&key);
                return;
            }

            let mut evicted = None;
            if state.entries.len() >= self.capacity {
                if let Some(oldest) = state.lru.pop_front() {
                    if let Some(entry) = state.entries.remove(&oldest) {
                        evicted = Some((oldest, entry.handle));
                    }
                }
            }

            state.entries.insert(
                key.clone(),
                CacheEntry {
                    handle,
                    last_used: Instant::now(),
                },
            );
            state.lru.push_back(key);
            evicted
        };

        if let Some((oldest, handle)) = evicted {
            log::debug!("Evicting least recently used model {oldest}");
            self.metrics.record_eviction();
            self.metrics.forget(&oldest);
            self.dispose(&handle);
        }
    }

    /// Look up a model, marking it most recently used
    ///
    /// An entry whose handle was disposed outside the cache counts as a miss
    /// and is dropped without releasing anything again.
    pub fn get(&self, key: &str) -> Option<ModelHandle> {
        let mut state = self.state.lock();
        if state
            .entries
            .get(key)
            .is_some_and(|entry| entry.handle.is_retired())
        {
            state.take(key);
            self.metrics.forget(key);
            log::debug!("Dropping disposed model {key} from cache");
        }

        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.last_used = Instant::now();
                let handle = entry.handle.clone();
                state.touch(key);
                self.metrics.record_cache_hit();
                Some(handle)
            }
            None => {
                self.metrics.record_cache_miss();
                None
            }
        }
    }

    /// Remove and dispose a model; no-op if absent
    pub fn remove(&self, key: &str) {
        let removed = self.state.lock().take(key);
        if let Some(handle) = removed {
            self.metrics.forget(key);
            self.dispose(&handle);
        }
    }

    /// Dispose every cached model and empty the cache
    pub fn clear(&self) {
        let drained: Vec<(String, ModelHandle)> = {
            let mut state = self.state.lock();
            state.lru.clear();
            state
                .entries
                .drain()
                .map(|(key, entry)| (key, entry.handle))
                .collect()
        };

        for (key, handle) in &drained {
            self.metrics.forget(key);
            self.dispose(handle);
        }
        if !drained.is_empty() {
            log::debug!("Cleared {} cached models", drained.len());
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of cached models
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached keys from least to most recently used
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.state.lock().lru.iter().cloned().collect()
    }

    /// When a cached model was last inserted or looked up
    pub fn last_used(&self, key: &str) -> Option<Instant> {
        self.state.lock().entries.get(key).map(|entry| entry.last_used)
    }

    /// Get a reference to the GPU device
    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    /// Get a reference to the metrics handle
    pub fn metrics(&self) -> &AssetMetricsHandle {
        &self.metrics
    }

    fn dispose(&self, handle: &ModelHandle) {
        let report = dispose_model(&self.gpu, handle);
        if report.total() > 0 {
            self.metrics.record_disposal();
        }
    }
}
