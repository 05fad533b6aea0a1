//! Post-load normalization of decoded models
//!
//! Derives missing geometry data and normalizes material/texture state so a
//! model renders the same way regardless of how its source was authored.

use crate::model::{BoundingSphere, Geometry, Material, ModelHandle, NodeKind};
use crate::texture::{ColorSpace, Texture};
use glam::Vec3;

/// Anisotropic filtering level applied to color textures
pub const TEXTURE_ANISOTROPY: u8 = 4;

/// Optimize every mesh leaf of a model
///
/// Running it again on the same handle changes nothing: derived data is only
/// computed when absent and versions are only bumped on actual changes.
/// Returns the number of mesh leaves visited.
pub fn optimize_model(handle: &ModelHandle) -> usize {
    let mut visited = 0;
    handle.root().traverse(&mut |node| {
        if let NodeKind::Mesh(leaf) = &node.kind {
            visited += 1;

            prepare_geometry(&mut leaf.geometry.write());
            for material in leaf.material.materials() {
                normalize_material(&mut material.write());
            }
        }
    });

    log::debug!(
        "Optimized {} mesh leaves of {}",
        visited,
        handle.source()
    );
    visited
}

/// Compute normals and bounding sphere if the geometry lacks them
pub fn prepare_geometry(geometry: &mut Geometry) {
    if geometry.normals.is_none() {
        geometry.normals = Some(compute_vertex_normals(
            &geometry.positions,
            geometry.indices.as_deref(),
        ));
    }
    if geometry.bounding_sphere.is_none() {
        geometry.bounding_sphere = Some(compute_bounding_sphere(&geometry.positions));
    }
}

/// Force consistent material state; returns true if anything changed
pub fn normalize_material(material: &mut Material) -> bool {
    let mut changed = false;

    if !material.double_sided {
        material.double_sided = true;
        changed = true;
    }
    if !material.flat_shading {
        material.flat_shading = true;
        changed = true;
    }
    if let Some(map) = &material.map {
        changed |= normalize_color_texture(&mut map.write());
    }

    if changed {
        material.version += 1;
    }
    changed
}

/// Color textures sample in sRGB with mipmaps and anisotropic filtering
pub fn normalize_color_texture(texture: &mut Texture) -> bool {
    let mut changed = false;

    if texture.color_space != ColorSpace::Srgb {
        texture.color_space = ColorSpace::Srgb;
        changed = true;
    }
    if texture.anisotropy != TEXTURE_ANISOTROPY {
        texture.anisotropy = TEXTURE_ANISOTROPY;
        changed = true;
    }
    if !texture.generate_mipmaps {
        texture.generate_mipmaps = true;
        changed = true;
    }

    if changed {
        texture.version += 1;
    }
    changed
}

/// Per-vertex normals for a triangle list
///
/// Indexed geometry gets smooth normals (face normals averaged per shared
/// vertex); unindexed geometry gets flat per-triangle normals.
pub fn compute_vertex_normals(positions: &[[f32; 3]], indices: Option<&[u32]>) -> Vec<[f32; 3]> {
    const FALLBACK: [f32; 3] = [0.0, 0.0, 1.0];

    let face_normal = |a: [f32; 3], b: [f32; 3], c: [f32; 3]| {
        let v0 = Vec3::from_array(a);
        let normal = (Vec3::from_array(b) - v0).cross(Vec3::from_array(c) - v0);
        if normal.length_squared() > 1e-12 {
            Some(normal.normalize())
        } else {
            None
        }
    };

    match indices {
        Some(indices) => {
            let mut accumulated = vec![Vec3::ZERO; positions.len()];
            for chunk in indices.chunks_exact(3) {
                let [i0, i1, i2] = [chunk[0] as usize, chunk[1] as usize, chunk[2] as usize];
                if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
                    log::warn!("Skipping triangle with out-of-range index");
                    continue;
                }
                if let Some(normal) = face_normal(positions[i0], positions[i1], positions[i2]) {
                    accumulated[i0] += normal;
                    accumulated[i1] += normal;
                    accumulated[i2] += normal;
                }
            }

            accumulated
                .into_iter()
                .map(|n| {
                    if n.length_squared() > 1e-12 {
                        n.normalize().to_array()
                    } else {
                        FALLBACK
                    }
                })
                .collect()
        }
        None => {
            let mut normals = Vec::with_capacity(positions.len());
            for chunk in positions.chunks_exact(3) {
                let normal = face_normal(chunk[0], chunk[1], chunk[2])
                    .map(|n| n.to_array())
                    .unwrap_or(FALLBACK);
                normals.extend([normal; 3]);
            }
            // trailing vertices that do not form a triangle
            normals.resize(positions.len(), FALLBACK);
            normals
        }
    }
}

/// Sphere centred on the bounding box, enclosing every position
pub fn compute_bounding_sphere(positions: &[[f32; 3]]) -> BoundingSphere {
    if positions.is_empty() {
        return BoundingSphere {
            center: [0.0; 3],
            radius: 0.0,
        };
    }

    let (min, max) = positions.iter().map(|p| Vec3::from_array(*p)).fold(
        (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
        |(min, max), p| (min.min(p), max.max(p)),
    );
    let center = (min + max) * 0.5;
    let radius = positions
        .iter()
        .map(|p| center.distance(Vec3::from_array(*p)))
        .fold(0.0_f32, f32::max);

    BoundingSphere {
        center: center.to_array(),
        radius,
    }
}
