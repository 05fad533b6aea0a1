//! GPU resource teardown for retired models

use crate::gpu::{GpuDevice, ResourceId};
use crate::model::{ModelHandle, NodeKind};
use crate::texture::TextureRef;
use std::collections::HashSet;

/// What a disposal pass released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisposalReport {
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
}

impl DisposalReport {
    /// Total number of released resources
    pub fn total(&self) -> usize {
        self.geometries + self.materials + self.textures
    }
}

/// Release all GPU resources of a model and retire the handle
///
/// Geometry, materials and textures shared between leaves of this model are
/// released once. A handle that is already retired is left alone, so
/// disposing twice never frees twice. Resources shared with *other* models
/// are not tracked and become invalid for them too.
pub fn dispose_model<G: GpuDevice>(gpu: &G, handle: &ModelHandle) -> DisposalReport {
    if !handle.retire() {
        log::debug!("Model {} already disposed, skipping", handle.source());
        return DisposalReport::default();
    }

    let mut seen: HashSet<ResourceId> = HashSet::new();
    let mut report = DisposalReport::default();

    handle.root().traverse(&mut |node| {
        let NodeKind::Mesh(leaf) = &node.kind else {
            return;
        };

        let geometry = leaf.geometry.read();
        if seen.insert(geometry.id) {
            gpu.release_geometry(&geometry);
            report.geometries += 1;
        }

        for material in leaf.material.materials() {
            let material = material.read();
            if seen.insert(material.id) {
                gpu.release_material(&material);
                report.materials += 1;
            }
            if let Some(map) = &material.map {
                let texture = map.read();
                if seen.insert(texture.id) {
                    gpu.release_texture(&texture);
                    report.textures += 1;
                }
            }
        }
    });

    log::debug!(
        "Disposed {} on {}: {} geometries, {} materials, {} textures",
        handle.source(),
        gpu.backend_name(),
        report.geometries,
        report.materials,
        report.textures
    );
    report
}

/// Release a standalone texture
pub fn dispose_texture<G: GpuDevice>(gpu: &G, texture: &TextureRef) {
    gpu.release_texture(&texture.read());
}
