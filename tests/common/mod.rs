//! Shared fixtures for integration tests

#![allow(dead_code)]

use catfood_models::{
    encode_glb, Geometry, Material, MaterialSlot, MemorySource, MeshLeaf, MockGpu, ModelCache,
    ModelHandle, ModelManager, SceneNode, Texture,
};
use std::sync::Arc;

/// Triangle positions followed by u16 indices, padded to four bytes
fn triangle_buffer() -> Vec<u8> {
    let mut bin = Vec::new();
    for v in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        for c in v {
            bin.extend_from_slice(&c.to_le_bytes());
        }
    }
    for i in [0u16, 1, 2] {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    bin.extend_from_slice(&[0, 0]);
    bin
}

/// Single-triangle GLB named `scene`
pub fn triangle_glb(scene: &str) -> Vec<u8> {
    let json = format!(
        r#"{{
            "asset": {{"version": "2.0"}},
            "scene": 0,
            "scenes": [{{"name": "{scene}", "nodes": [0]}}],
            "nodes": [{{"name": "body", "mesh": 0}}],
            "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}, "indices": 1, "material": 0}}]}}],
            "materials": [{{"name": "paint", "pbrMetallicRoughness": {{"baseColorFactor": [0.8, 0.1, 0.1, 1.0]}}}}],
            "accessors": [
                {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}},
                {{"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}}
            ],
            "bufferViews": [
                {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
                {{"buffer": 0, "byteOffset": 36, "byteLength": 6}}
            ],
            "buffers": [{{"byteLength": 44}}]
        }}"#
    );
    encode_glb(&json, &triangle_buffer())
}

/// Two triangle meshes sharing one material whose base color map is an
/// embedded PNG
pub fn textured_glb() -> Vec<u8> {
    let png = png_bytes();
    let mut bin = triangle_buffer();
    let image_offset = bin.len();
    bin.extend_from_slice(&png);

    let json = format!(
        r#"{{
            "asset": {{"version": "2.0"}},
            "scene": 0,
            "scenes": [{{"name": "Bag", "nodes": [0, 1]}}],
            "nodes": [
                {{"name": "front", "mesh": 0}},
                {{"name": "back", "mesh": 0, "translation": [0.0, 0.0, -1.0]}}
            ],
            "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}, "indices": 1, "material": 0}}]}}],
            "materials": [{{"name": "label", "pbrMetallicRoughness": {{"baseColorTexture": {{"index": 0}}}}}}],
            "textures": [{{"name": "label", "source": 0}}],
            "images": [{{"bufferView": 2, "mimeType": "image/png"}}],
            "accessors": [
                {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}},
                {{"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}}
            ],
            "bufferViews": [
                {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
                {{"buffer": 0, "byteOffset": 36, "byteLength": 6}},
                {{"buffer": 0, "byteOffset": {image_offset}, "byteLength": {png_len}}}
            ],
            "buffers": [{{"byteLength": {total}}}]
        }}"#,
        png_len = png.len(),
        total = bin.len(),
    );
    encode_glb(&json, &bin)
}

/// 2x2 RGB PNG
pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 120, 40]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("Failed to encode test image");
    bytes
}

/// Model with two meshes sharing a textured material
pub fn synthetic_model(source: &str) -> ModelHandle {
    let texture = Texture::new(Some("label".into()), 1, 1, vec![255; 4]).into_shared();
    let material = Material::new(Some("paint".into()), [1.0; 4])
        .with_map(texture)
        .into_shared();
    let leaf = |x: f32| {
        let geometry = Geometry::new(
            vec![[x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x, 1.0, 0.0]],
            None,
        )
        .into_shared();
        SceneNode::mesh(MeshLeaf::new(geometry, MaterialSlot::Single(material.clone())))
    };

    ModelHandle::new(
        source,
        SceneNode::group(Some(source.to_string()))
            .with_child(leaf(0.0))
            .with_child(leaf(2.0)),
    )
}

/// Manager over an in-memory source, with the shared pieces exposed
pub struct Harness {
    pub gpu: MockGpu,
    pub cache: Arc<ModelCache<MockGpu>>,
    pub source: Arc<MemorySource>,
    pub manager: ModelManager<MockGpu>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_source(MemorySource::new())
    }

    pub fn with_source(source: MemorySource) -> Self {
        let gpu = MockGpu::new();
        let cache = Arc::new(ModelCache::new(gpu.clone()));
        let source = Arc::new(source);
        let manager = ModelManager::new(Arc::clone(&cache), source.clone());
        Self {
            gpu,
            cache,
            source,
            manager,
        }
    }

    /// Serve a triangle model under each url
    pub fn serve(&self, urls: &[&str]) {
        for url in urls {
            self.source.insert(*url, triangle_glb(url));
        }
    }
}
