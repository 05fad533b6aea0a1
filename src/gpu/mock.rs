//! Mock GPU implementation for testing
//!
//! Records every release call in memory so tests can verify that
//! disposal frees each resource exactly once.

use super::{GpuDevice, ResourceId};
use crate::model::{Geometry, Material};
use crate::texture::Texture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Kind of resource released through the mock device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Geometry,
    Material,
    Texture,
}

#[derive(Debug, Default)]
struct ReleaseLog {
    counts: HashMap<ResourceId, u32>,
    per_kind: HashMap<ResourceKind, u64>,
}

/// Mock GPU device for testing
///
/// Clones share the same release log, so a clone handed to a cache can
/// be inspected through the original.
#[derive(Clone, Debug, Default)]
pub struct MockGpu {
    log: Arc<Mutex<ReleaseLog>>,
}

impl MockGpu {
    /// Create a new mock GPU device
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the resource with this id was released
    pub fn release_count(&self, id: ResourceId) -> u32 {
        self.log.lock().counts.get(&id).copied().unwrap_or(0)
    }

    /// Number of release calls of one kind
    pub fn released(&self, kind: ResourceKind) -> u64 {
        self.log.lock().per_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Total number of release calls of any kind
    pub fn total_releases(&self) -> u64 {
        self.log.lock().per_kind.values().sum()
    }

    /// True if some resource was released more than once
    pub fn has_double_release(&self) -> bool {
        self.log.lock().counts.values().any(|&count| count > 1)
    }

    fn record(&self, id: ResourceId, kind: ResourceKind) {
        let mut log = self.log.lock();
        *log.counts.entry(id).or_insert(0) += 1;
        *log.per_kind.entry(kind).or_insert(0) += 1;
    }
}

impl GpuDevice for MockGpu {
    fn release_geometry(&self, geometry: &Geometry) {
        self.record(geometry.id, ResourceKind::Geometry);
    }

    fn release_material(&self, material: &Material) {
        self.record(material.id, ResourceKind::Material);
    }

    fn release_texture(&self, texture: &Texture) {
        self.record(texture.id, ResourceKind::Texture);
    }

    fn backend_name(&self) -> &'static str {
        "Mock"
    }
}
