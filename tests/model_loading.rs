//! Integration tests for the model loading pipeline

mod common;

use catfood_models::{
    optimize_model, AssetError, AssetSource, ColorSpace, FileSource, LoadingOptions, MemorySource,
    MockGpu, ModelCache, ModelManager, NodeKind, ProgressCallback, ResourceKind, SourceError,
    MAX_CACHE_SIZE, TEXTURE_ANISOTROPY,
};
use common::{png_bytes, textured_glb, triangle_glb, Harness};
use futures::executor::block_on;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

#[test]
fn test_cache_hit_skips_fetch() {
    let harness = Harness::new();
    harness.serve(&["/models/bag.glb"]);
    let options = LoadingOptions::new();

    let first = block_on(harness.manager.load_model("/models/bag.glb", &options)).unwrap();
    let second = block_on(harness.manager.load_model("/models/bag.glb", &options)).unwrap();

    assert!(first.ptr_eq(&second));
    assert_eq!(harness.source.fetch_count("/models/bag.glb"), 1);
    assert_eq!(harness.cache.metrics().load_count("/models/bag.glb"), 1);
    assert!(harness.cache.metrics().cache_hits() >= 1);
}

#[test]
fn test_loaded_model_is_optimized() {
    let harness = Harness::new();
    harness.source.insert("/models/bag.glb", textured_glb());

    let model = block_on(
        harness
            .manager
            .load_model("/models/bag.glb", &LoadingOptions::new()),
    )
    .unwrap();

    assert_eq!(model.root().name.as_deref(), Some("Bag"));
    let leaves = model.root().mesh_leaves();
    assert_eq!(leaves.len(), 2);
    for leaf in &leaves {
        let geometry = leaf.geometry.read();
        assert!(geometry.normals.is_some());
        assert!(geometry.bounding_sphere.is_some());

        let material = leaf.material.materials()[0].read();
        assert!(material.double_sided);
        assert!(material.flat_shading);
        let map = material.map.as_ref().expect("label texture").read();
        assert_eq!(map.color_space, ColorSpace::Srgb);
        assert_eq!(map.anisotropy, TEXTURE_ANISOTROPY);
        assert!(map.generate_mipmaps);
    }
}

#[test]
fn test_optimize_is_idempotent() {
    let harness = Harness::new();
    harness.source.insert("/models/bag.glb", textured_glb());
    let model = block_on(
        harness
            .manager
            .load_model("/models/bag.glb", &LoadingOptions::new()),
    )
    .unwrap();

    let snapshot = |model: &catfood_models::ModelHandle| {
        let leaf = model.root().mesh_leaves()[0].clone();
        let material = leaf.material.materials()[0].read();
        let texture_version = material.map.as_ref().map(|map| map.read().version);
        let normals = leaf.geometry.read().normals.clone();
        (material.version, texture_version, normals)
    };

    let before = snapshot(&model);
    optimize_model(&model);
    assert_eq!(snapshot(&model), before);
}

#[test]
fn test_failed_load_is_isolated() {
    let harness = Harness::new();
    harness.serve(&["/models/bowl.glb", "/models/bag.glb"]);
    harness.source.fail("/models/bag.glb");
    let options = LoadingOptions::new();

    let bowl = block_on(harness.manager.load_model("/models/bowl.glb", &options)).unwrap();
    let err = block_on(harness.manager.load_model("/models/bag.glb", &options)).unwrap_err();

    assert!(matches!(err, AssetError::Load { ref url, .. } if url == "/models/bag.glb"));
    assert!(err.to_string().starts_with("Error loading model from /models/bag.glb"));
    assert!(!harness.cache.contains("/models/bag.glb"));
    assert!(harness.cache.get("/models/bowl.glb").unwrap().ptr_eq(&bowl));
    assert!(!bowl.is_retired());
}

#[test]
fn test_failed_load_can_be_retried() {
    let harness = Harness::new();
    harness.serve(&["/models/bag.glb"]);
    harness.source.fail("/models/bag.glb");
    let options = LoadingOptions::new();

    assert!(block_on(harness.manager.load_model("/models/bag.glb", &options)).is_err());
    harness.source.restore("/models/bag.glb");
    assert!(block_on(harness.manager.load_model("/models/bag.glb", &options)).is_ok());

    assert_eq!(harness.source.fetch_count("/models/bag.glb"), 2);
    assert_eq!(harness.cache.metrics().failed_loads(), 1);
}

#[test]
fn test_error_callback_receives_failure() {
    let harness = Harness::new();
    harness.source.insert("/models/broken.glb", b"not a model".to_vec());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let options = LoadingOptions::new().with_error(move |error| sink.lock().push(error.to_string()));

    let result = block_on(harness.manager.load_model("/models/broken.glb", &options));

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], result.unwrap_err().to_string());
}

#[test]
fn test_progress_is_monotonic() {
    let harness = Harness::with_source(MemorySource::new().with_chunk_size(16));
    harness.serve(&["/models/bag.glb"]);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let options = LoadingOptions::new().with_progress(move |loaded, total| sink.lock().push((loaded, total)));

    block_on(harness.manager.load_model("/models/bag.glb", &options)).unwrap();

    let events = events.lock();
    assert!(events.len() > 1);
    assert!(events.windows(2).all(|pair| pair[0].0 <= pair[1].0));
    let (loaded, total) = *events.last().unwrap();
    assert_eq!(loaded, total);
}

#[test]
fn test_cache_hit_reports_no_progress() {
    let harness = Harness::new();
    harness.serve(&["/models/bag.glb"]);
    block_on(harness.manager.load_model("/models/bag.glb", &LoadingOptions::new())).unwrap();

    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    let options = LoadingOptions::new().with_progress(move |_, _| *counter.lock() += 1);
    block_on(harness.manager.load_model("/models/bag.glb", &options)).unwrap();

    assert_eq!(*calls.lock(), 0);
}

#[test]
fn test_loading_past_capacity_evicts_first_model() {
    let harness = Harness::new();
    let urls: Vec<String> = (0..=MAX_CACHE_SIZE)
        .map(|i| format!("/models/m{i}.glb"))
        .collect();
    for url in &urls {
        harness.source.insert(url.clone(), triangle_glb(url));
    }
    let options = LoadingOptions::new();

    let first = block_on(harness.manager.load_model(&urls[0], &options)).unwrap();
    for url in &urls[1..] {
        block_on(harness.manager.load_model(url, &options)).unwrap();
    }

    assert_eq!(harness.cache.len(), MAX_CACHE_SIZE);
    assert!(harness.manager.get_cached_model(&urls[0]).is_none());
    assert!(first.is_retired());
    assert_eq!(harness.gpu.released(ResourceKind::Geometry), 1);
    assert!(!harness.gpu.has_double_release());

    // Loading the evicted url again goes back to the source
    block_on(harness.manager.load_model(&urls[0], &options)).unwrap();
    assert_eq!(harness.source.fetch_count(&urls[0]), 2);
}

#[test]
fn test_remove_and_clear_through_manager() {
    let harness = Harness::new();
    harness.serve(&["/models/a.glb", "/models/b.glb"]);
    let options = LoadingOptions::new();
    let a = block_on(harness.manager.load_model("/models/a.glb", &options)).unwrap();
    let b = block_on(harness.manager.load_model("/models/b.glb", &options)).unwrap();

    harness.manager.remove_model("/models/a.glb");
    assert!(a.is_retired());
    assert!(harness.manager.get_cached_model("/models/a.glb").is_none());

    harness.manager.clear_cache();
    assert!(b.is_retired());
    assert!(harness.cache.is_empty());
    assert!(!harness.gpu.has_double_release());
}

#[test]
fn test_direct_dispose_is_not_repeated_on_eviction() {
    let gpu = MockGpu::new();
    let cache = Arc::new(ModelCache::with_capacity(gpu.clone(), 1));
    let source = Arc::new(MemorySource::new());
    source.insert("/models/a.glb", triangle_glb("a"));
    source.insert("/models/b.glb", triangle_glb("b"));
    let manager = ModelManager::new(cache, source);
    let options = LoadingOptions::new();

    let a = block_on(manager.load_model("/models/a.glb", &options)).unwrap();
    let report = manager.dispose_model(&a);
    assert_eq!(report.geometries, 1);

    block_on(manager.load_model("/models/b.glb", &options)).unwrap();
    assert_eq!(gpu.released(ResourceKind::Geometry), 1);
    assert!(manager.dispose_model(&a).total() == 0);
}

#[test]
fn test_disposed_cached_model_is_reloaded() {
    let harness = Harness::new();
    harness.serve(&["/models/a.glb"]);
    let options = LoadingOptions::new();

    let first = block_on(harness.manager.load_model("/models/a.glb", &options)).unwrap();
    harness.manager.dispose_model(&first);
    assert!(harness.manager.get_cached_model("/models/a.glb").is_none());

    let second = block_on(harness.manager.load_model("/models/a.glb", &options)).unwrap();

    assert!(!second.ptr_eq(&first));
    assert!(!second.is_retired());
    assert_eq!(harness.source.fetch_count("/models/a.glb"), 2);
    assert!(harness.cache.get("/models/a.glb").unwrap().ptr_eq(&second));
    assert!(!harness.gpu.has_double_release());
}

#[test]
fn test_custom_decoder_path_reaches_error() {
    let json = r#"{
        "asset": {"version": "2.0"},
        "extensionsUsed": ["KHR_draco_mesh_compression"],
        "extensionsRequired": ["KHR_draco_mesh_compression"],
        "scenes": [{"nodes": []}]
    }"#;
    let harness = Harness::new();
    harness
        .source
        .insert("/models/draco.glb", catfood_models::encode_glb(json, &[]));
    let options = LoadingOptions::new().with_decoder_path("/static/draco/");

    let err = block_on(harness.manager.load_model("/models/draco.glb", &options)).unwrap_err();
    assert!(err.to_string().contains("/static/draco/"));
}

#[test]
fn test_texture_load_and_dispose() {
    let harness = Harness::new();
    harness.source.insert("/textures/label.png", png_bytes());

    let texture = block_on(harness.manager.load_texture("/textures/label.png")).unwrap();
    {
        let texture = texture.read();
        assert_eq!((texture.width, texture.height), (2, 2));
        assert_eq!(texture.name.as_deref(), Some("/textures/label.png"));
    }

    harness.manager.dispose_texture(&texture);
    assert_eq!(harness.gpu.release_count(texture.read().id), 1);
}

#[test]
fn test_texture_load_rejects_unsupported_bytes() {
    let harness = Harness::new();
    harness.source.insert("/textures/label.gif", b"GIF89a....".to_vec());

    let result = block_on(harness.manager.load_texture("/textures/label.gif"));
    assert!(matches!(result, Err(AssetError::Texture(_))));
    assert!(block_on(harness.manager.load_texture("/textures/missing.png")).is_err());
}

#[tokio::test]
async fn test_load_from_file_source() {
    let dir = std::env::temp_dir().join(format!("catfood-models-{}", std::process::id()));
    tokio::fs::create_dir_all(dir.join("models")).await.unwrap();
    tokio::fs::write(dir.join("models/kibble.glb"), triangle_glb("Kibble"))
        .await
        .unwrap();

    let cache = Arc::new(ModelCache::new(MockGpu::new()));
    let manager = ModelManager::new(cache, Arc::new(FileSource::new(&dir)));
    let model = manager
        .load_model("/models/kibble.glb", &LoadingOptions::new())
        .await
        .unwrap();

    let body = model.root().find("body").unwrap();
    assert!(matches!(body.kind, NodeKind::Mesh(_)));

    let missing = manager
        .load_model("/models/missing.glb", &LoadingOptions::new())
        .await;
    assert!(missing.is_err());

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

/// Completes on the second poll, waking itself in between
struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

/// Memory source whose fetches suspend once, so concurrent loads interleave
struct YieldingSource {
    inner: MemorySource,
}

#[async_trait::async_trait]
impl AssetSource for YieldingSource {
    async fn fetch(
        &self,
        url: &str,
        progress: Option<&ProgressCallback>,
    ) -> Result<Vec<u8>, SourceError> {
        YieldOnce(false).await;
        self.inner.fetch(url, progress).await
    }
}

#[test]
fn test_concurrent_misses_fetch_twice_and_cache_once() {
    let source = Arc::new(YieldingSource {
        inner: MemorySource::new(),
    });
    source.inner.insert("/models/bag.glb", triangle_glb("Bag"));
    let gpu = MockGpu::new();
    let cache = Arc::new(ModelCache::new(gpu.clone()));
    let manager = ModelManager::new(Arc::clone(&cache), source.clone());
    let options = LoadingOptions::new();

    let (first, second) = block_on(futures::future::join(
        manager.load_model("/models/bag.glb", &options),
        manager.load_model("/models/bag.glb", &options),
    ));
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(source.inner.fetch_count("/models/bag.glb"), 2);
    assert_eq!(cache.len(), 1);
    let cached = cache.get("/models/bag.glb").unwrap();
    assert!(cached.ptr_eq(&first));
    assert!(!cached.ptr_eq(&second));
    // The uncached duplicate stays with its caller, untouched
    assert!(!second.is_retired());
    assert_eq!(gpu.total_releases(), 0);
}
