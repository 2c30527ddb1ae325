//! Asset loading
//!
//! Decoding is delegated to external crates; this module only reshapes the
//! decoded data into the renderer's mesh layout.

use std::path::Path;

use crate::foundation::math::{Vec2, Vec3};
use crate::render::context::{VulkanError, VulkanResult};
use crate::render::mesh::{Mesh, Vertex};

/// Load a triangulated OBJ file into a single mesh.
///
/// Missing normals come back as zero vectors; missing texture coordinates as
/// the origin. Tangents are left zero.
pub fn load_obj<P: AsRef<Path>>(path: P) -> VulkanResult<Mesh> {
    let path = path.as_ref();
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| VulkanError::Asset(format!("failed to load {}: {}", path.display(), e)))?;

    if models.is_empty() {
        return Err(VulkanError::Asset(format!(
            "{} contains no meshes",
            path.display()
        )));
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Mesh".to_string());
    let mut mesh = Mesh::new(name);

    for model in &models {
        let m = &model.mesh;
        let base = mesh.vertices.len() as u32;
        let vertex_count = m.positions.len() / 3;

        for i in 0..vertex_count {
            let pos = Vec3::new(
                m.positions[3 * i],
                m.positions[3 * i + 1],
                m.positions[3 * i + 2],
            );
            let normal = if m.normals.len() >= 3 * (i + 1) {
                Vec3::new(m.normals[3 * i], m.normals[3 * i + 1], m.normals[3 * i + 2])
            } else {
                Vec3::zeros()
            };
            let tex_coord = if m.texcoords.len() >= 2 * (i + 1) {
                Vec2::new(m.texcoords[2 * i], m.texcoords[2 * i + 1])
            } else {
                Vec2::zeros()
            };
            mesh.vertices.push(Vertex::new(pos, normal, tex_coord));
        }

        mesh.indices.extend(m.indices.iter().map(|&i| i + base));
    }

    log::debug!(
        "[ASSETS] Loaded {}: {} vertices, {} indices",
        path.display(),
        mesh.vertices.len(),
        mesh.indices.len()
    );

    Ok(mesh)
}
