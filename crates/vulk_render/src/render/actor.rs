//! Actors: named mesh instances with world transforms

use crate::foundation::math::Mat4;
use crate::render::mesh::MeshRef;

/// Per-instance world transform as laid out in the actors storage buffer
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub struct InstanceXform {
    /// Model-to-world transform for one instance
    pub world: Mat4,
}

unsafe impl bytemuck::Zeroable for InstanceXform {}
unsafe impl bytemuck::Pod for InstanceXform {}

impl InstanceXform {
    /// Wrap a world transform
    pub fn new(world: Mat4) -> Self {
        Self { world }
    }
}

/// A drawable instance: which arena mesh it uses and where it sits
#[derive(Debug, Clone)]
pub struct Actor {
    /// Instance name
    pub name: String,
    /// Arena location of the actor's mesh
    pub mesh_ref: MeshRef,
    /// World transform
    pub transform: Mat4,
}

impl Actor {
    /// Create an actor from an arena mesh reference
    pub fn new(name: impl Into<String>, mesh_ref: MeshRef, transform: Mat4) -> Self {
        Self {
            name: name.into(),
            mesh_ref,
            transform,
        }
    }
}
