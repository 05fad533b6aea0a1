//! Scene graph of a loaded model
//!
//! A model is a tree of [`SceneNode`]s. Renderable leaves carry geometry and
//! one or more materials; materials may reference a texture. Geometry,
//! materials and textures are shared through `Arc<RwLock<_>>` so the same
//! resource can hang off several leaves, exactly as decoded documents do.

use crate::gpu::ResourceId;
use crate::texture::{TextureError, TextureRef};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Error type for model decoding operations
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to load model: {0}")]
    LoadError(String),

    #[error("Unsupported model format: {0}")]
    UnsupportedFormat(String),

    #[error("{extension} requires a decoder from {decoder_path}, which is not available")]
    UnsupportedExtension {
        extension: String,
        decoder_path: String,
    },

    #[error("GLTF error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),
}

/// Spatial transform (translation, rotation, scale)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: [f32; 3],
    pub rotation: [f32; 4], // quaternion (x, y, z, w)
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0], // identity quaternion
            scale: [1.0; 3],
        }
    }
}

/// Sphere enclosing all vertices of a geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: [f32; 3],
    pub radius: f32,
}

/// Vertex data of a renderable leaf
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// GPU identity
    pub id: ResourceId,
    pub positions: Vec<[f32; 3]>,
    /// Triangle list indices; `None` means consecutive vertex triples
    pub indices: Option<Vec<u32>>,
    /// Per-vertex normals, derived on optimize when the source has none
    pub normals: Option<Vec<[f32; 3]>>,
    pub bounding_sphere: Option<BoundingSphere>,
}

impl Geometry {
    /// Create geometry without derived data
    pub fn new(positions: Vec<[f32; 3]>, indices: Option<Vec<u32>>) -> Self {
        Self {
            id: ResourceId::next(),
            positions,
            indices,
            normals: None,
            bounding_sphere: None,
        }
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Wrap into the shared form referenced by mesh leaves
    pub fn into_shared(self) -> GeometryRef {
        Arc::new(RwLock::new(self))
    }
}

/// Surface description of a renderable leaf
#[derive(Debug, Clone)]
pub struct Material {
    /// GPU identity (compiled program + uniforms)
    pub id: ResourceId,
    pub name: Option<String>,
    /// Base color factor (RGBA)
    pub base_color: [f32; 4],
    /// Color (albedo) texture
    pub map: Option<TextureRef>,
    pub double_sided: bool,
    pub flat_shading: bool,
    /// Bumped whenever the program needs recompiling
    pub version: u32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            id: ResourceId::next(),
            name: None,
            base_color: [1.0, 1.0, 1.0, 1.0],
            map: None,
            double_sided: false,
            flat_shading: false,
            version: 0,
        }
    }
}

impl Material {
    /// Create a named material with a base color
    pub fn new(name: Option<String>, base_color: [f32; 4]) -> Self {
        Self {
            name,
            base_color,
            ..Self::default()
        }
    }

    /// Attach a color texture
    pub fn with_map(mut self, map: TextureRef) -> Self {
        self.map = Some(map);
        self
    }

    /// Wrap into the shared form referenced by mesh leaves
    pub fn into_shared(self) -> MaterialRef {
        Arc::new(RwLock::new(self))
    }
}

pub type GeometryRef = Arc<RwLock<Geometry>>;
pub type MaterialRef = Arc<RwLock<Material>>;

/// Materials bound to a mesh leaf
#[derive(Debug, Clone)]
pub enum MaterialSlot {
    Single(MaterialRef),
    /// One material per geometry group
    Multi(Vec<MaterialRef>),
}

impl MaterialSlot {
    /// All bound materials, regardless of slot kind
    pub fn materials(&self) -> &[MaterialRef] {
        match self {
            Self::Single(material) => std::slice::from_ref(material),
            Self::Multi(materials) => materials,
        }
    }
}

/// A renderable leaf
#[derive(Debug, Clone)]
pub struct MeshLeaf {
    pub name: Option<String>,
    pub geometry: GeometryRef,
    pub material: MaterialSlot,
}

impl MeshLeaf {
    pub fn new(geometry: GeometryRef, material: MaterialSlot) -> Self {
        Self {
            name: None,
            geometry,
            material,
        }
    }
}

/// What a scene node holds
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Pure transform/grouping node
    Group,
    Mesh(MeshLeaf),
}

/// A node in the scene hierarchy
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: Option<String>,
    pub transform: Transform,
    pub kind: NodeKind,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Create an empty group node
    pub fn group(name: Option<String>) -> Self {
        Self {
            name,
            transform: Transform::default(),
            kind: NodeKind::Group,
            children: Vec::new(),
        }
    }

    /// Create a node holding a mesh leaf
    pub fn mesh(leaf: MeshLeaf) -> Self {
        Self {
            name: leaf.name.clone(),
            transform: Transform::default(),
            kind: NodeKind::Mesh(leaf),
            children: Vec::new(),
        }
    }

    /// Append a child node
    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// Depth-first pre-order visit of this node and all descendants
    pub fn traverse<'a>(&'a self, visit: &mut impl FnMut(&'a SceneNode)) {
        visit(self);
        for child in &self.children {
            child.traverse(visit);
        }
    }

    /// All mesh leaves in the subtree, in traversal order
    pub fn mesh_leaves(&self) -> Vec<&MeshLeaf> {
        let mut leaves = Vec::new();
        self.traverse(&mut |node| {
            if let NodeKind::Mesh(leaf) = &node.kind {
                leaves.push(leaf);
            }
        });
        leaves
    }

    /// Find the first node with the given name
    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        let mut found = None;
        self.traverse(&mut |node| {
            if found.is_none() && node.name.as_deref() == Some(name) {
                found = Some(node);
            }
        });
        found
    }
}

struct ModelInner {
    id: Uuid,
    source: String,
    root: SceneNode,
    retired: AtomicBool,
}

/// Handle to a loaded model
///
/// Cloning is cheap and every clone refers to the same scene graph. Once the
/// model has been disposed the handle is retired and must not be rendered.
#[derive(Clone)]
pub struct ModelHandle {
    inner: Arc<ModelInner>,
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("id", &self.inner.id)
            .field("source", &self.inner.source)
            .field("mesh_count", &self.mesh_count())
            .field("retired", &self.is_retired())
            .finish()
    }
}

impl ModelHandle {
    /// Wrap a decoded scene graph
    pub fn new(source: impl Into<String>, root: SceneNode) -> Self {
        Self {
            inner: Arc::new(ModelInner {
                id: Uuid::new_v4(),
                source: source.into(),
                root,
                retired: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// URL the model was loaded from
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    pub fn root(&self) -> &SceneNode {
        &self.inner.root
    }

    /// Number of renderable leaves
    pub fn mesh_count(&self) -> usize {
        self.inner.root.mesh_leaves().len()
    }

    /// True once the GPU resources have been released
    pub fn is_retired(&self) -> bool {
        self.inner.retired.load(Ordering::Acquire)
    }

    /// Mark retired; returns false if it already was
    pub(crate) fn retire(&self) -> bool {
        !self.inner.retired.swap(true, Ordering::AcqRel)
    }

    /// Whether both handles refer to the same loaded model
    pub fn ptr_eq(&self, other: &ModelHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> GeometryRef {
        Geometry::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], None)
            .into_shared()
    }

    #[test]
    fn test_material_slot_materials() {
        let a = Material::default().into_shared();
        let b = Material::default().into_shared();

        assert_eq!(MaterialSlot::Single(a.clone()).materials().len(), 1);
        assert_eq!(MaterialSlot::Multi(vec![a, b]).materials().len(), 2);
    }

    #[test]
    fn test_traverse_visits_all_nodes() {
        let material = Material::default().into_shared();
        let root = SceneNode::group(Some("root".into()))
            .with_child(
                SceneNode::group(Some("arm".into())).with_child(SceneNode::mesh(MeshLeaf::new(
                    triangle(),
                    MaterialSlot::Single(material.clone()),
                ))),
            )
            .with_child(SceneNode::mesh(MeshLeaf::new(
                triangle(),
                MaterialSlot::Single(material),
            )));

        let mut count = 0;
        root.traverse(&mut |_| count += 1);

        assert_eq!(count, 4);
        assert_eq!(root.mesh_leaves().len(), 2);
        assert!(root.find("arm").is_some());
        assert!(root.find("leg").is_none());
    }

    #[test]
    fn test_model_handle_identity_and_retirement() {
        let handle = ModelHandle::new("/models/bowl.glb", SceneNode::group(None));
        let clone = handle.clone();
        let other = ModelHandle::new("/models/bowl.glb", SceneNode::group(None));

        assert!(handle.ptr_eq(&clone));
        assert!(!handle.ptr_eq(&other));
        assert_eq!(handle.source(), "/models/bowl.glb");

        assert!(!clone.is_retired());
        assert!(handle.retire());
        assert!(clone.is_retired());
        assert!(!handle.retire());
    }
}
