//! Mesh data, vertex layout, and the shared-arena accumulator

use ash::vk;
use std::mem;

use crate::foundation::math::{Mat4, Vec2, Vec3, Vec4};

/// Vertex layout shared by every sample shader.
///
/// Attribute locations 0..3 match the vertex stage declarations.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Object-space position, location 0
    pub pos: Vec3,
    /// Surface normal, location 1
    pub normal: Vec3,
    /// Surface tangent, location 2
    pub tangent: Vec3,
    /// Texture coordinates, location 3
    pub tex_coord: Vec2,
}

unsafe impl bytemuck::Zeroable for Vertex {}
unsafe impl bytemuck::Pod for Vertex {}

impl Vertex {
    /// Create a vertex with a zero tangent
    pub fn new(pos: Vec3, normal: Vec3, tex_coord: Vec2) -> Self {
        Self {
            pos,
            normal,
            tangent: Vec3::zeros(),
            tex_coord,
        }
    }

    /// Vertex buffer binding description for `binding`
    pub fn binding_description(binding: u32) -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::builder()
            .binding(binding)
            .stride(mem::size_of::<Self>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
            .build()
    }

    /// Attribute descriptions for locations 0..3
    pub fn attribute_descriptions(binding: u32) -> [vk::VertexInputAttributeDescription; 4] {
        // repr(C) with f32 fields: pos 0, normal 12, tangent 24, uv 36
        [
            vk::VertexInputAttributeDescription::builder()
                .binding(binding)
                .location(0)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(0)
                .build(),
            vk::VertexInputAttributeDescription::builder()
                .binding(binding)
                .location(1)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(12)
                .build(),
            vk::VertexInputAttributeDescription::builder()
                .binding(binding)
                .location(2)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(24)
                .build(),
            vk::VertexInputAttributeDescription::builder()
                .binding(binding)
                .location(3)
                .format(vk::Format::R32G32_SFLOAT)
                .offset(36)
                .build(),
        ]
    }
}

/// CPU-side mesh with indices relative to its own vertex list
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Human-readable mesh name
    pub name: String,
    /// Vertex list
    pub vertices: Vec<Vertex>,
    /// Indices into `vertices`
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create an empty named mesh
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Transform positions, normals and tangents in place
    pub fn transform(&mut self, m: &Mat4) {
        for v in &mut self.vertices {
            let p = m * Vec4::new(v.pos.x, v.pos.y, v.pos.z, 1.0);
            v.pos = Vec3::new(p.x, p.y, p.z);
            let n = m * Vec4::new(v.normal.x, v.normal.y, v.normal.z, 0.0);
            v.normal = Vec3::new(n.x, n.y, n.z).normalize();
            if v.tangent.norm_squared() > 0.0 {
                let t = m * Vec4::new(v.tangent.x, v.tangent.y, v.tangent.z, 0.0);
                v.tangent = Vec3::new(t.x, t.y, t.z).normalize();
            }
        }
    }

    /// Append `other`, rebasing its indices onto this mesh's vertices
    pub fn append(&mut self, other: &Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }
}

/// Where a mesh landed inside a shared vertex/index arena.
///
/// Indices stay mesh-relative; draws pass `first_vertex` as the vertex
/// offset and `first_index` as the index offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshRef {
    /// Name of the appended mesh
    pub name: String,
    /// Offset of the mesh's first vertex in the arena
    pub first_vertex: u32,
    /// Offset of the mesh's first index in the arena
    pub first_index: u32,
    /// Number of indices the mesh contributes
    pub index_count: u32,
}

/// Accumulates meshes into one shared vertex/index arena so they upload as a
/// single pair of buffers.
#[derive(Debug, Default)]
pub struct MeshAccumulator {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl MeshAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mesh and return where it landed
    pub fn append_mesh(&mut self, mesh: &Mesh) -> MeshRef {
        let mesh_ref = MeshRef {
            name: mesh.name.clone(),
            first_vertex: self.vertices.len() as u32,
            first_index: self.indices.len() as u32,
            index_count: mesh.indices.len() as u32,
        };
        self.vertices.extend_from_slice(&mesh.vertices);
        // Indices stay relative to the mesh's own first vertex
        self.indices.extend_from_slice(&mesh.indices);
        mesh_ref
    }

    /// All accumulated vertices
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// All accumulated indices
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-6;

    fn tri(name: &str) -> Mesh {
        let mut m = Mesh::new(name);
        m.vertices = vec![
            Vertex::new(Vec3::zeros(), Vec3::z(), Vec2::zeros()),
            Vertex::new(Vec3::x(), Vec3::z(), Vec2::new(1.0, 0.0)),
            Vertex::new(Vec3::y(), Vec3::z(), Vec2::new(0.0, 1.0)),
        ];
        m.indices = vec![0, 1, 2];
        m
    }

    fn quad(name: &str) -> Mesh {
        let mut m = Mesh::new(name);
        m.vertices = vec![
            Vertex::new(Vec3::zeros(), Vec3::z(), Vec2::zeros()),
            Vertex::new(Vec3::x(), Vec3::z(), Vec2::new(1.0, 0.0)),
            Vertex::new(Vec3::new(1.0, 1.0, 0.0), Vec3::z(), Vec2::new(1.0, 1.0)),
            Vertex::new(Vec3::y(), Vec3::z(), Vec2::new(0.0, 1.0)),
        ];
        m.indices = vec![0, 1, 2, 0, 2, 3];
        m
    }

    #[test]
    fn accumulator_tracks_offsets() {
        let mut acc = MeshAccumulator::new();
        let a = acc.append_mesh(&tri("a"));
        let b = acc.append_mesh(&quad("b"));

        assert_eq!(a.first_vertex, 0);
        assert_eq!(a.first_index, 0);
        assert_eq!(a.index_count, 3);

        assert_eq!(b.first_vertex, 3);
        assert_eq!(b.first_index, 3);
        assert_eq!(b.index_count, 6);

        assert_eq!(acc.vertices().len(), 7);
        assert_eq!(acc.indices().len(), 9);
    }

    #[test]
    fn accumulated_indices_stay_mesh_relative() {
        let mut acc = MeshAccumulator::new();
        acc.append_mesh(&tri("a"));
        let b = acc.append_mesh(&quad("b"));

        let b_indices =
            &acc.indices()[b.first_index as usize..(b.first_index + b.index_count) as usize];
        // Every index addresses the appended mesh's own vertices
        assert!(b_indices.iter().all(|&i| i < 4));
    }

    #[test]
    fn mesh_append_rebases_indices() {
        let mut m = tri("a");
        m.append(&quad("b"));

        assert_eq!(m.vertices.len(), 7);
        assert_eq!(m.indices.len(), 9);
        assert_eq!(&m.indices[3..], &[3, 4, 5, 3, 5, 6]);
    }

    #[test]
    fn transform_moves_positions_and_keeps_normals_unit() {
        let mut m = tri("a");
        let rot = nalgebra::Rotation3::from_euler_angles(0.0, std::f32::consts::FRAC_PI_2, 0.0);
        let xform = Mat4::new_translation(&Vec3::new(0.0, 2.0, 0.0)) * rot.to_homogeneous();
        m.transform(&xform);

        for v in &m.vertices {
            assert_relative_eq!(v.normal.norm(), 1.0, epsilon = EPSILON);
        }
        // +Z normal rotated 90 degrees about Y faces +X
        assert_relative_eq!(m.vertices[0].normal, Vec3::x(), epsilon = 1e-5);
        assert_relative_eq!(m.vertices[0].pos, Vec3::new(0.0, 2.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn vertex_layout_matches_shader_locations() {
        assert_eq!(mem::size_of::<Vertex>(), 44);

        let attrs = Vertex::attribute_descriptions(0);
        assert_eq!(attrs[0].offset, 0);
        assert_eq!(attrs[1].offset, 12);
        assert_eq!(attrs[2].offset, 24);
        assert_eq!(attrs[3].offset, 36);
        assert_eq!(attrs[3].format, vk::Format::R32G32_SFLOAT);
        assert_eq!(Vertex::binding_description(0).stride, 44);
    }
}
