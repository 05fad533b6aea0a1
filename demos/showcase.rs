//! Showcase viewer flow for catfood_models
//!
//! Serves the product catalog from memory, loads a selection in the
//! background, switches between products and tears everything down.

use catfood_models::{
    encode_glb, InteractionDispatcher, InteractionHandlers, LoadingOptions, MemorySource,
    MockGpu, MockSpawner, ModelCache, ModelCatalog, ModelManager, PickHit,
};
use std::sync::Arc;

fn product_glb(name: &str) -> Vec<u8> {
    let json = format!(
        r#"{{
            "asset": {{"version": "2.0"}},
            "scenes": [{{"name": "{name}", "nodes": [0]}}],
            "nodes": [{{"name": "{name}", "mesh": 0}}],
            "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}}}]}}],
            "accessors": [{{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}}],
            "bufferViews": [{{"buffer": 0, "byteLength": 36}}],
            "buffers": [{{"byteLength": 36}}]
        }}"#
    );
    let bin: Vec<u8> = [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
        .iter()
        .flatten()
        .flat_map(|c| c.to_le_bytes())
        .collect();
    encode_glb(&json, &bin)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let catalog = ModelCatalog::showcase();
    let source = Arc::new(MemorySource::new().with_chunk_size(64));
    for entry in catalog.entries() {
        source.insert(entry.model_path.clone(), product_glb(&entry.name));
    }

    let gpu = MockGpu::new();
    let cache = Arc::new(ModelCache::new(gpu.clone()));
    let manager = ModelManager::new(Arc::clone(&cache), source);
    let spawner = MockSpawner::blocking();

    println!("catfood_models v{}", catfood_models::VERSION);

    for id in ["1", "2", "1", "7"] {
        let options = LoadingOptions::new()
            .with_progress(|loaded, total| println!("  {loaded}/{total} bytes"));
        let pending = manager.load_selection(&spawner, &catalog, id, options);

        match pending.status_text() {
            Some(text) => println!("Selection {id}: {text}"),
            None => {
                let model = pending.result()?;
                let description = catalog.find(id).map_or("", |entry| entry.description.as_str());
                println!(
                    "Selection {id}: {} ({} meshes) - {description}",
                    model.source(),
                    model.mesh_count()
                );
            }
        }
    }

    let mut dispatcher = InteractionDispatcher::new(
        InteractionHandlers::default()
            .on_click(|hit| println!("Clicked {:?}", hit.target))
            .on_drag(|hit| println!("Dragging {:?} to {:?}", hit.target, hit.point)),
    );
    let hit = PickHit::new(Some("Bowl".to_string()), [0.0, 0.5, 0.0]);
    dispatcher.click(Some(hit.clone()));
    dispatcher.pointer_down(Some(hit));
    dispatcher.pointer_move(Some(PickHit::new(None, [1.0, 0.5, 0.0])));
    dispatcher.pointer_up();

    println!(
        "Cached {} models, hit rate {:.0}%",
        cache.len(),
        cache.metrics().cache_hit_rate()
    );
    manager.clear_cache();
    println!("Released {} GPU resources", gpu.total_releases());

    Ok(())
}
