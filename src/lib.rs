//! catfood_models - 3D model lifecycle management for product viewers
//!
//! # Features
//! - Bounded LRU model cache with exactly-once GPU disposal
//! - Async model loading with progress and error callbacks
//! - glTF/GLB decoding with configurable Draco decoder path
//! - Post-load material and texture normalization
//! - Async runtime abstraction (Tokio, or the inline mock)
//!
//! # Quick Start
//!
//! ```ignore
//! use catfood_models::{FileSource, LoadingOptions, ModelCache, ModelManager, MockGpu};
//! use std::sync::Arc;
//!
//! let cache = Arc::new(ModelCache::new(MockGpu::new()));
//! let manager = ModelManager::new(cache, Arc::new(FileSource::new("public")));
//! let model = manager.load_model("/models/bag.glb", &LoadingOptions::new()).await?;
//! ```
//!
//! # Feature Flags
//!
//! - `runtime-tokio`: Enable the Tokio spawner and async file reads

// Core modules
pub mod cache;
pub mod gpu;
pub mod loader;
pub mod process;
pub mod runtime;

// Support modules
pub mod async_loading;
pub mod catalog;
pub mod interaction;
pub mod model;
pub mod texture;

// Error types
mod error;
pub use error::{AssetError, Result};

// Re-export main types from cache
pub use cache::metrics::{AssetMetrics, AssetMetricsHandle};
pub use cache::{ModelCache, MAX_CACHE_SIZE};

// Re-export GPU types
pub use gpu::mock::{MockGpu, ResourceKind};
pub use gpu::{GpuDevice, ResourceId};

// Re-export loader types
pub use loader::{
    encode_glb, AssetSource, DecoderConfig, ErrorCallback, FileSource, GltfDecoder,
    LoadingOptions, MemorySource, ModelManager, ProgressCallback, SceneDecoder, SourceError,
    DEFAULT_DECODER_PATH,
};

// Re-export runtime types
pub use runtime::mock::{MockSpawnBehavior, MockSpawner};
#[cfg(feature = "runtime-tokio")]
pub use runtime::tokio_impl::TokioSpawner;
pub use runtime::AsyncSpawner;

// Re-export model types
pub use model::{
    BoundingSphere, Geometry, GeometryRef, Material, MaterialRef, MaterialSlot, MeshLeaf,
    ModelError, ModelHandle, NodeKind, SceneNode, Transform,
};

// Re-export texture types
pub use texture::{ColorSpace, Texture, TextureError, TextureFormat, TextureLoader, TextureRef};

// Re-export post-processing
pub use process::{dispose_model, dispose_texture, optimize_model, DisposalReport, TEXTURE_ANISOTROPY};

// Re-export async loading types
pub use async_loading::{AsyncAssetError, AsyncModelHandle, LoadState};

// Re-export viewer support types
pub use catalog::{ModelCatalog, ModelEntry};
pub use interaction::{InteractionDispatcher, InteractionHandler, InteractionHandlers, PickHit};

// Version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
