//! Model loading: cache lookup, fetch, decode, optimize, cache insert
//!
//! [`ModelManager`] is the entry point UI components talk to. It resolves a
//! URL against the shared [`ModelCache`] and only goes to the network (an
//! [`AssetSource`]) and the decoder on a miss.

pub mod gltf;
pub mod source;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use crate::async_loading::{AsyncModelHandle, LoadState};
use crate::cache::ModelCache;
use crate::catalog::ModelCatalog;
use crate::error::{AssetError, Result};
use crate::gpu::GpuDevice;
use crate::model::{ModelError, ModelHandle, SceneNode};
use crate::process::{self, DisposalReport};
use crate::runtime::AsyncSpawner;
use crate::texture::{TextureLoader, TextureRef};

pub use self::gltf::{encode_glb, GltfDecoder};
pub use source::{AssetSource, FileSource, MemorySource, ProgressCallback, SourceError};

/// Where the mesh decompression module is served from by default
pub const DEFAULT_DECODER_PATH: &str = "/draco/";

/// Error callback invoked before a failed load resolves
pub type ErrorCallback = Arc<dyn Fn(&AssetError) + Send + Sync>;

/// Decoder pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Location of the compressed-mesh decoder module
    pub decoder_path: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            decoder_path: DEFAULT_DECODER_PATH.to_string(),
        }
    }
}

impl DecoderConfig {
    pub fn new(decoder_path: impl Into<String>) -> Self {
        Self {
            decoder_path: decoder_path.into(),
        }
    }
}

/// Turns fetched bytes into a scene graph
pub trait SceneDecoder: Send + Sync {
    fn decode(
        &self,
        url: &str,
        bytes: &[u8],
        config: &DecoderConfig,
    ) -> std::result::Result<SceneNode, ModelError>;
}

/// Per-call loading options
#[derive(Clone, Default)]
pub struct LoadingOptions {
    /// Decoder location; [`DEFAULT_DECODER_PATH`] when unset
    pub decoder_path: Option<String>,
    pub on_progress: Option<ProgressCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl std::fmt::Debug for LoadingOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingOptions")
            .field("decoder_path", &self.decoder_path)
            .field("on_progress", &self.on_progress.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl LoadingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decoder_path(mut self, path: impl Into<String>) -> Self {
        self.decoder_path = Some(path.into());
        self
    }

    pub fn with_progress(mut self, on_progress: impl Fn(u64, u64) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(on_progress));
        self
    }

    pub fn with_error(mut self, on_error: impl Fn(&AssetError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(on_error));
        self
    }

    /// Decoder configuration derived from these options
    pub fn decoder_config(&self) -> DecoderConfig {
        self.decoder_path
            .as_ref()
            .map(DecoderConfig::new)
            .unwrap_or_default()
    }
}

/// Loads models through a shared cache
///
/// Cheap to clone; clones share the cache, source and decoder.
pub struct ModelManager<G: GpuDevice> {
    cache: Arc<ModelCache<G>>,
    source: Arc<dyn AssetSource>,
    decoder: Arc<dyn SceneDecoder>,
    texture_loader: TextureLoader,
}

impl<G: GpuDevice> Clone for ModelManager<G> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            source: Arc::clone(&self.source),
            decoder: Arc::clone(&self.decoder),
            texture_loader: self.texture_loader.clone(),
        }
    }
}

impl<G: GpuDevice> std::fmt::Debug for ModelManager<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelManager")
            .field("cache", &self.cache)
            .field("source", &"<asset source>")
            .field("decoder", &"<scene decoder>")
            .finish()
    }
}

impl<G: GpuDevice> ModelManager<G> {
    /// Create a manager decoding glTF/GLB documents
    pub fn new(cache: Arc<ModelCache<G>>, source: Arc<dyn AssetSource>) -> Self {
        Self {
            cache,
            source,
            decoder: Arc::new(GltfDecoder::new()),
            texture_loader: TextureLoader::new(),
        }
    }

    /// Replace the scene decoder
    pub fn with_decoder(mut self, decoder: Arc<dyn SceneDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn cache(&self) -> &Arc<ModelCache<G>> {
        &self.cache
    }

    /// Resolve `url` to a loaded model
    ///
    /// A cached model resolves immediately. Otherwise the model is fetched,
    /// decoded, optimized and cached. Concurrent misses for the same URL are
    /// not merged; each fetches on its own and the later insert only
    /// refreshes recency.
    pub async fn load_model(&self, url: &str, options: &LoadingOptions) -> Result<ModelHandle> {
        if let Some(handle) = self.cache.get(url) {
            return Ok(handle);
        }

        let started = Instant::now();
        match self.fetch_and_decode(url, options).await {
            Ok(root) => {
                let handle = ModelHandle::new(url, root);
                process::optimize_model(&handle);
                self.cache.put(url, handle.clone());
                self.cache.metrics().record_load(url, started.elapsed());
                Ok(handle)
            }
            Err(reason) => {
                let error = AssetError::load(url, reason);
                log::error!("{error}");
                self.cache.metrics().record_failed_load();
                if let Some(on_error) = &options.on_error {
                    invoke_error_callback(on_error, &error);
                }
                Err(error)
            }
        }
    }

    async fn fetch_and_decode(&self, url: &str, options: &LoadingOptions) -> Result<SceneNode> {
        let config = options.decoder_config();
        let bytes = self.source.fetch(url, options.on_progress.as_ref()).await?;
        Ok(self.decoder.decode(url, &bytes, &config)?)
    }

    /// Cached model for `url`, refreshing its recency
    pub fn get_cached_model(&self, url: &str) -> Option<ModelHandle> {
        self.cache.get(url)
    }

    /// Drop a model from the cache, releasing its GPU resources
    pub fn remove_model(&self, url: &str) {
        self.cache.remove(url);
    }

    /// Dispose every cached model
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Release a model's GPU resources directly
    ///
    /// For models managed outside the cache. Disposing a handle that is
    /// still cached retires it; a later eviction will not release it again.
    pub fn dispose_model(&self, handle: &ModelHandle) -> DisposalReport {
        process::dispose_model(self.cache.gpu(), handle)
    }

    /// Fetch and decode a PNG/JPEG texture, named after its URL
    pub async fn load_texture(&self, url: &str) -> Result<TextureRef> {
        let bytes = self.source.fetch(url, None).await.map_err(|e| {
            log::error!("Error loading texture: {url}: {e}");
            e
        })?;
        let texture = self.texture_loader.load(&bytes, Some(url.to_string()))?;
        Ok(texture.into_shared())
    }

    /// Release a standalone texture
    pub fn dispose_texture(&self, texture: &TextureRef) {
        process::dispose_texture(self.cache.gpu(), texture);
    }
}

impl<G: GpuDevice + 'static> ModelManager<G> {
    /// Start loading `url` on `spawner` and return an observable handle
    ///
    /// Progress, completion and failure are reflected in the handle's
    /// [`LoadState`]. The handle stays pending until the spawner runs the load.
    pub fn load_in_background<S: AsyncSpawner>(
        &self,
        spawner: &S,
        url: impl Into<String>,
        options: LoadingOptions,
    ) -> AsyncModelHandle {
        let url = url.into();
        let tracker = AsyncModelHandle::new(url.clone());
        let state = tracker.state_arc();

        let progress_state = Arc::clone(&state);
        let caller_progress = options.on_progress.clone();
        let options = LoadingOptions {
            on_progress: Some(Arc::new(move |loaded: u64, total: u64| {
                let fraction = if total > 0 {
                    (loaded as f32 / total as f32).min(1.0)
                } else {
                    0.0
                };
                *progress_state.write() = LoadState::Loading(fraction);
                if let Some(progress) = &caller_progress {
                    progress(loaded, total);
                }
            })),
            ..options
        };

        log::debug!("Scheduling {url} on {} spawner", spawner.runtime_name());
        let manager = self.clone();
        spawner.spawn(async move {
            *state.write() = LoadState::Loading(0.0);
            let next = match manager.load_model(&url, &options).await {
                Ok(handle) => LoadState::Completed(handle),
                Err(error) => LoadState::Failed(error.to_string()),
            };
            *state.write() = next;
        });

        tracker
    }

    /// Load the catalog entry `id`, or report it as not found
    pub fn load_selection<S: AsyncSpawner>(
        &self,
        spawner: &S,
        catalog: &ModelCatalog,
        id: &str,
        options: LoadingOptions,
    ) -> AsyncModelHandle {
        match catalog.find(id) {
            Some(entry) => self.load_in_background(spawner, entry.model_path.clone(), options),
            None => {
                log::warn!("Model {id} not found in catalog");
                let tracker = AsyncModelHandle::new(id);
                tracker.set_state(LoadState::NotFound);
                tracker
            }
        }
    }
}

/// Run the caller's error callback; a panic inside it is logged, not raised
fn invoke_error_callback(on_error: &ErrorCallback, error: &AssetError) {
    if catch_unwind(AssertUnwindSafe(|| on_error(error))).is_err() {
        log::error!("onError callback panicked while handling: {error}");
    }
}
