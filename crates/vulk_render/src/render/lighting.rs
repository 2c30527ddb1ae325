//! Light and material layouts shared with the fragment shaders

use crate::foundation::math::Vec3;

/// Point/spot light, interleaved with its falloff scalars so the block packs
/// into three 16-byte rows
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub struct Light {
    /// Light position in world space
    pub pos: Vec3,
    /// Distance at which falloff begins
    pub falloff_start: f32,
    /// Light color
    pub color: Vec3,
    /// Distance at which the light contributes nothing
    pub falloff_end: f32,
    /// Spot direction
    pub direction: Vec3,
    /// Spotlight exponent, 0 for point lights
    pub spot_power: f32,
}

unsafe impl bytemuck::Zeroable for Light {}
unsafe impl bytemuck::Pod for Light {}

impl Default for Light {
    fn default() -> Self {
        Self {
            pos: Vec3::zeros(),
            falloff_start: 1.0,
            color: Vec3::new(1.0, 1.0, 1.0),
            falloff_end: 10.0,
            direction: -Vec3::y(),
            spot_power: 0.0,
        }
    }
}

impl Light {
    /// White point light at `pos`
    pub fn point(pos: Vec3) -> Self {
        Self {
            pos,
            ..Self::default()
        }
    }
}

/// Phong material row for the materials table
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub struct Material {
    /// Ambient reflectance
    pub ambient: Vec3,
    /// Specular exponent
    pub shininess: f32,
    /// Diffuse reflectance
    pub diffuse: Vec3,
    /// Opacity, 1 is opaque
    pub alpha: f32,
    /// Specular reflectance
    pub specular: Vec3,
    /// Index of refraction
    pub index_of_refraction: f32,
}

unsafe impl bytemuck::Zeroable for Material {}
unsafe impl bytemuck::Pod for Material {}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vec3::new(0.1, 0.1, 0.1),
            shininess: 32.0,
            diffuse: Vec3::new(0.8, 0.8, 0.8),
            alpha: 1.0,
            specular: Vec3::new(0.5, 0.5, 0.5),
            index_of_refraction: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn gpu_blocks_pack_into_16_byte_rows() {
        assert_eq!(mem::size_of::<Light>(), 48);
        assert_eq!(mem::size_of::<Material>(), 48);
    }
}
