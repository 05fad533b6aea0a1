//! GLTF/GLB scene decoding
//!
//! Turns a glTF 2.0 document into a [`SceneNode`] tree. Materials and
//! textures are created once per document index and shared by every
//! primitive referencing them.

use super::{DecoderConfig, SceneDecoder};
use crate::model::{
    Geometry, Material, MaterialRef, MaterialSlot, MeshLeaf, ModelError, NodeKind, SceneNode,
    Transform,
};
use crate::texture::{Texture, TextureError, TextureRef};

/// Extension that needs an external mesh decoder
pub const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

/// Decoder for `.gltf` (embedded buffers) and `.glb` documents
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfDecoder;

impl GltfDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl SceneDecoder for GltfDecoder {
    fn decode(
        &self,
        url: &str,
        bytes: &[u8],
        config: &DecoderConfig,
    ) -> Result<SceneNode, ModelError> {
        if bytes.is_empty() {
            return Err(ModelError::LoadError("document is empty".to_string()));
        }
        if !looks_like_gltf(bytes) {
            return Err(ModelError::UnsupportedFormat(format!(
                "{url} is neither GLB nor glTF JSON"
            )));
        }

        let gltf = gltf::Gltf::from_slice_without_validation(bytes)?;
        if let Some(extension) = gltf
            .extensions_required()
            .find(|extension| *extension == DRACO_EXTENSION)
        {
            return Err(ModelError::UnsupportedExtension {
                extension: extension.to_string(),
                decoder_path: config.decoder_path.clone(),
            });
        }

        let (document, buffers, images) = gltf::import_slice(bytes)?;
        log::debug!(
            "Decoding {}: {} meshes, {} materials, {} textures",
            url,
            document.meshes().len(),
            document.materials().len(),
            document.textures().len()
        );

        let textures = document
            .textures()
            .map(|texture| {
                let image = images.get(texture.source().index()).ok_or_else(|| {
                    ModelError::LoadError(format!(
                        "texture {} references missing image",
                        texture.index()
                    ))
                })?;
                let name = texture.name().map(str::to_string);
                Ok(texture_from_image(image, name)?.into_shared())
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        let materials = document
            .materials()
            .map(|material| convert_material(&material, &textures))
            .collect();

        let mut builder = SceneBuilder {
            url,
            buffers: &buffers,
            materials,
            default_material: None,
        };

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| ModelError::LoadError("document has no scene".to_string()))?;

        let mut root =
            SceneNode::group(Some(scene.name().map_or_else(|| url.to_string(), str::to_string)));
        for node in scene.nodes() {
            root.children.push(builder.build_node(node)?);
        }
        Ok(root)
    }
}

struct SceneBuilder<'a> {
    url: &'a str,
    buffers: &'a [gltf::buffer::Data],
    materials: Vec<MaterialRef>,
    default_material: Option<MaterialRef>,
}

impl SceneBuilder<'_> {
    fn build_node(&mut self, node: gltf::Node<'_>) -> Result<SceneNode, ModelError> {
        let (translation, rotation, scale) = node.transform().decomposed();
        let mut scene_node = SceneNode::group(node.name().map(str::to_string));
        scene_node.transform = Transform {
            translation,
            rotation,
            scale,
        };

        if let Some(mesh) = node.mesh() {
            let mut leaves = self.build_leaves(&mesh)?;
            if leaves.len() == 1 {
                scene_node.kind = NodeKind::Mesh(leaves.remove(0));
            } else {
                scene_node
                    .children
                    .extend(leaves.into_iter().map(SceneNode::mesh));
            }
        }

        for child in node.children() {
            scene_node.children.push(self.build_node(child)?);
        }
        Ok(scene_node)
    }

    fn build_leaves(&mut self, mesh: &gltf::Mesh<'_>) -> Result<Vec<MeshLeaf>, ModelError> {
        let mut leaves = Vec::new();

        for (prim_idx, primitive) in mesh.primitives().enumerate() {
            if !matches!(primitive.mode(), gltf::mesh::Mode::Triangles) {
                log::warn!(
                    "Skipping non-triangle primitive {prim_idx} of mesh {} in {}",
                    mesh.index(),
                    self.url
                );
                continue;
            }

            let buffers = self.buffers;
            let reader = primitive
                .reader(move |buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .ok_or_else(|| {
                    ModelError::LoadError(format!(
                        "primitive {prim_idx} of mesh {} has no positions",
                        mesh.index()
                    ))
                })?
                .collect();
            let indices = reader
                .read_indices()
                .map(|indices| indices.into_u32().collect::<Vec<_>>());

            let mut geometry = Geometry::new(positions, indices);
            geometry.normals = reader.read_normals().map(|normals| normals.collect());

            let material = match primitive.material().index() {
                Some(index) => self.materials.get(index).cloned().ok_or_else(|| {
                    ModelError::LoadError(format!("material {index} does not exist"))
                })?,
                None => self.default_material(),
            };

            leaves.push(MeshLeaf {
                name: mesh.name().map(str::to_string),
                geometry: geometry.into_shared(),
                material: MaterialSlot::Single(material),
            });
        }

        Ok(leaves)
    }

    fn default_material(&mut self) -> MaterialRef {
        self.default_material
            .get_or_insert_with(|| Material::new(Some("default".to_string()), [1.0; 4]).into_shared())
            .clone()
    }
}

fn convert_material(material: &gltf::Material<'_>, textures: &[TextureRef]) -> MaterialRef {
    let pbr = material.pbr_metallic_roughness();
    let mut converted = Material::new(material.name().map(str::to_string), pbr.base_color_factor());
    converted.double_sided = material.double_sided();
    converted.map = pbr
        .base_color_texture()
        .and_then(|info| textures.get(info.texture().index()).cloned());
    converted.into_shared()
}

fn texture_from_image(
    image: &gltf::image::Data,
    name: Option<String>,
) -> Result<Texture, TextureError> {
    use gltf::image::Format;

    let data = match image.format {
        Format::R8G8B8A8 => image.pixels.clone(),
        Format::R8G8B8 => image
            .pixels
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        Format::R8 => image.pixels.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        other => {
            return Err(TextureError::UnsupportedFormat(format!(
                "embedded image format {other:?}"
            )))
        }
    };
    Ok(Texture::new(name, image.width, image.height, data))
}

/// GLB magic or a JSON object after optional whitespace
fn looks_like_gltf(bytes: &[u8]) -> bool {
    bytes.starts_with(GLB_MAGIC)
        || bytes
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|&b| b == b'{')
}

/// Pack a glTF JSON document and its binary buffer into a GLB container
///
/// Both chunks are padded to four bytes (JSON with spaces, binary with
/// zeros). An empty `bin` omits the binary chunk.
pub fn encode_glb(json: &str, bin: &[u8]) -> Vec<u8> {
    fn padded(bytes: &[u8], fill: u8) -> Vec<u8> {
        let mut out = bytes.to_vec();
        while out.len() % 4 != 0 {
            out.push(fill);
        }
        out
    }

    let json = padded(json.as_bytes(), b' ');
    let bin = padded(bin, 0);
    let mut length = 12 + 8 + json.len();
    if !bin.is_empty() {
        length += 8 + bin.len();
    }

    let mut out = Vec::with_capacity(length);
    out.extend_from_slice(GLB_MAGIC);
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(length as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json);
    if !bin.is_empty() {
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(&bin);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two meshes sharing one material; the first is indexed.
    fn kibble_glb() -> Vec<u8> {
        let json = r#"{
            "asset": {"version": "2.0"},
            "scene": 0,
            "scenes": [{"name": "Kibble", "nodes": [0, 1]}],
            "nodes": [
                {"name": "kibble", "mesh": 0, "translation": [0.0, 1.0, 0.0]},
                {"name": "crumb", "mesh": 1}
            ],
            "meshes": [
                {"name": "kibble", "primitives": [{"attributes": {"POSITION": 0}, "indices": 1, "material": 0}]},
                {"name": "crumb", "primitives": [{"attributes": {"POSITION": 0}, "material": 0}]}
            ],
            "materials": [{"name": "brown", "pbrMetallicRoughness": {"baseColorFactor": [0.5, 0.3, 0.1, 1.0]}}],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
                {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
            ],
            "bufferViews": [
                {"buffer": 0, "byteOffset": 0, "byteLength": 36},
                {"buffer": 0, "byteOffset": 36, "byteLength": 6}
            ],
            "buffers": [{"byteLength": 42}]
        }"#;

        let mut bin = Vec::new();
        for v in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in v {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        encode_glb(json, &bin)
    }

    #[test]
    fn test_encode_glb_layout() {
        let glb = encode_glb("{}", &[1, 2, 3]);
        assert_eq!(&glb[0..4], b"glTF");
        assert_eq!(u32::from_le_bytes(glb[8..12].try_into().unwrap()) as usize, glb.len());
        assert_eq!(glb.len() % 4, 0);
        assert_eq!(glb.len(), 12 + 8 + 4 + 8 + 4);
    }

    #[test]
    fn test_decode_scene() {
        let root = GltfDecoder::new()
            .decode("/models/kibble.glb", &kibble_glb(), &DecoderConfig::default())
            .unwrap();

        assert_eq!(root.name.as_deref(), Some("Kibble"));
        assert_eq!(root.children.len(), 2);

        let kibble = root.find("kibble").unwrap();
        assert_eq!(kibble.transform.translation, [0.0, 1.0, 0.0]);
        let NodeKind::Mesh(leaf) = &kibble.kind else {
            panic!("kibble should be a mesh node");
        };
        let geometry = leaf.geometry.read();
        assert_eq!(geometry.vertex_count(), 3);
        assert_eq!(geometry.indices.as_deref(), Some(&[0u32, 1, 2][..]));
        assert!(geometry.normals.is_none());

        let leaves = root.mesh_leaves();
        assert_eq!(leaves.len(), 2);
        let a = &leaves[0].material.materials()[0];
        let b = &leaves[1].material.materials()[0];
        assert!(std::sync::Arc::ptr_eq(a, b));
        assert_eq!(a.read().base_color, [0.5, 0.3, 0.1, 1.0]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let decoder = GltfDecoder::new();
        let config = DecoderConfig::default();
        assert!(decoder.decode("/models/x.glb", &[], &config).is_err());
        assert!(matches!(
            decoder.decode("/models/x.glb", b"not a model", &config),
            Err(ModelError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            decoder.decode("/models/x.gltf", b"  {\"asset\": 1}", &config),
            Err(ModelError::Gltf(_))
        ));
    }

    #[test]
    fn test_draco_documents_name_decoder_path() {
        let json = r#"{
            "asset": {"version": "2.0"},
            "extensionsUsed": ["KHR_draco_mesh_compression"],
            "extensionsRequired": ["KHR_draco_mesh_compression"],
            "scenes": [{"nodes": []}]
        }"#;
        let result = GltfDecoder::new().decode(
            "/models/bag.glb",
            &encode_glb(json, &[]),
            &DecoderConfig::new("/decoders/draco/"),
        );

        match result {
            Err(ModelError::UnsupportedExtension {
                extension,
                decoder_path,
            }) => {
                assert_eq!(extension, DRACO_EXTENSION);
                assert_eq!(decoder_path, "/decoders/draco/");
            }
            other => panic!("expected unsupported extension, got {other:?}"),
        }
    }
}
