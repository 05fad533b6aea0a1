//! GPU abstraction layer for backend-agnostic resource teardown
//!
//! The cache never renders anything itself. It only needs the rendering
//! backend to release the GPU-side memory behind geometry, materials and
//! textures once a model is retired.

pub mod mock;

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::{Geometry, Material};
use crate::texture::Texture;

/// Counter for generating unique resource IDs
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a GPU-backed resource
///
/// Geometry, materials and textures each get one on creation. Disposal uses
/// it to recognise resources shared between several mesh leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Allocate a fresh identifier
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Core GPU device trait for backend-agnostic teardown
///
/// Implemented by the rendering backend. Each release call is expected to
/// free the GPU memory behind exactly one resource; callers guarantee a
/// resource is never released twice within a disposal pass.
///
/// # Example
/// ```ignore
/// let gpu = MockGpu::new();
/// let cache = ModelCache::new(gpu.clone());
/// cache.clear();
/// assert_eq!(gpu.total_releases(), 0);
/// ```
pub trait GpuDevice: Send + Sync + Clone + Debug {
    /// Release vertex/index buffers of a geometry
    fn release_geometry(&self, geometry: &Geometry);

    /// Release the shader program and uniforms of a material
    fn release_material(&self, material: &Material);

    /// Release texture memory
    fn release_texture(&self, texture: &Texture);

    /// Get the name of this GPU backend (for debugging)
    fn backend_name(&self) -> &'static str;
}

pub use mock::MockGpu;
