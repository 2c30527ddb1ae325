//! GPU-visible uniform buffer layouts
//!
//! All structs here are `repr(C, align(16))` and mirror the std140 blocks the
//! shaders declare. Keep field order in sync with the GLSL side.

use crate::foundation::math::{Mat4, Vec3};

/// World, view and projection transforms
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub struct TransformsUbo {
    /// Model-to-world transform
    pub world: Mat4,
    /// World-to-view transform
    pub view: Mat4,
    /// View-to-clip transform
    pub proj: Mat4,
}

unsafe impl bytemuck::Zeroable for TransformsUbo {}
unsafe impl bytemuck::Pod for TransformsUbo {}

impl TransformsUbo {
    /// Identity transforms
    pub fn identity() -> Self {
        Self {
            world: Mat4::identity(),
            view: Mat4::identity(),
            proj: Mat4::identity(),
        }
    }
}

/// Camera eye position, padded to 16 bytes
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub struct EyePosUbo {
    /// Eye position in world space
    pub pos: Vec3,
    _pad: f32,
}

unsafe impl bytemuck::Zeroable for EyePosUbo {}
unsafe impl bytemuck::Pod for EyePosUbo {}

impl EyePosUbo {
    /// Wrap an eye position
    pub fn new(pos: Vec3) -> Self {
        Self { pos, _pad: 0.0 }
    }
}

/// A single model transform, used by outline/shadow passes that re-draw a
/// mesh under a different world matrix
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub struct ModelXformUbo {
    /// Model-to-world transform for this pass
    pub model: Mat4,
}

unsafe impl bytemuck::Zeroable for ModelXformUbo {}
unsafe impl bytemuck::Pod for ModelXformUbo {}

impl ModelXformUbo {
    /// Wrap a model transform
    pub fn new(model: Mat4) -> Self {
        Self { model }
    }
}

/// Mirror plane for the reflected-world pass: the vertex stage reflects each
/// position across the plane through `point` with unit `normal`
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub struct MirrorPlaneUbo {
    /// Unit plane normal
    pub normal: Vec3,
    _pad0: f32,
    /// A point on the plane
    pub point: Vec3,
    _pad1: f32,
}

unsafe impl bytemuck::Zeroable for MirrorPlaneUbo {}
unsafe impl bytemuck::Pod for MirrorPlaneUbo {}

impl MirrorPlaneUbo {
    /// Describe the plane through `point` with unit `normal`
    pub fn new(normal: Vec3, point: Vec3) -> Self {
        Self {
            normal,
            _pad0: 0.0,
            point,
            _pad1: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn ubo_sizes_match_the_shader_blocks() {
        assert_eq!(mem::size_of::<TransformsUbo>(), 192);
        assert_eq!(mem::size_of::<EyePosUbo>(), 16);
        assert_eq!(mem::size_of::<ModelXformUbo>(), 64);
        assert_eq!(mem::size_of::<MirrorPlaneUbo>(), 32);
    }
}
