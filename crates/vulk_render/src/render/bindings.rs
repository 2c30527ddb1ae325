//! Shader binding registry
//!
//! Single source of truth for descriptor binding indices. The GLSL side
//! declares the same numbers, so a renumbering here is a renumbering there.

/// Descriptor binding slots shared by all sample shaders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ShaderBinding {
    /// World/view/projection transforms UBO
    XformsUbo = 0,
    /// Primary texture sampler
    TextureSampler = 1,
    /// Per-instance actor transforms SSBO
    Actors = 2,
    /// Scene lights UBO
    Lights = 3,
    /// Material table SSBO
    Materials = 4,
    /// Camera eye position UBO
    EyePos = 5,
    /// Second texture sampler
    TextureSampler2 = 6,
    /// Third texture sampler
    TextureSampler3 = 7,
    /// Wave animation transform UBO
    WavesXform = 8,
    /// Normal map sampler
    NormalSampler = 9,
    /// Per-model transform UBO
    ModelXform = 10,
    /// Mirror plane UBO for reflected-world passes
    MirrorPlaneUbo = 11,
}

impl ShaderBinding {
    /// The binding index as declared in the shaders
    pub const fn index(self) -> u32 {
        self as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_indices_match_the_shader_declarations() {
        assert_eq!(ShaderBinding::XformsUbo.index(), 0);
        assert_eq!(ShaderBinding::TextureSampler.index(), 1);
        assert_eq!(ShaderBinding::Actors.index(), 2);
        assert_eq!(ShaderBinding::Lights.index(), 3);
        assert_eq!(ShaderBinding::Materials.index(), 4);
        assert_eq!(ShaderBinding::EyePos.index(), 5);
        assert_eq!(ShaderBinding::TextureSampler2.index(), 6);
        assert_eq!(ShaderBinding::TextureSampler3.index(), 7);
        assert_eq!(ShaderBinding::WavesXform.index(), 8);
        assert_eq!(ShaderBinding::NormalSampler.index(), 9);
        assert_eq!(ShaderBinding::ModelXform.index(), 10);
        assert_eq!(ShaderBinding::MirrorPlaneUbo.index(), 11);
    }
}
