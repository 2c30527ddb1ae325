//! A skull and wall reflected in a stencil-masked mirror
//!
//! Four passes in fixed order on one command buffer:
//!
//! 1. `DrawOpaque`: skull and wall, ordinary lit pipeline.
//! 2. `StencilMirror`: the mirror quad with color and depth writes off,
//!    stamping reference 1 into the stencil buffer.
//! 3. `DrawMirroredWorld`: skull and wall again; the vertex stage reflects
//!    positions across the mirror plane, front faces are culled because the
//!    reflection flips winding, the depth test is off so the reflection isn't
//!    clipped by the real geometry, and the stencil test confines fragments
//!    to the mirror.
//! 4. `DrawMirror`: the mirror quad blended over the reflection.

use ash::{vk, Device};

use crate::foundation::math::{Mat4, Vec3};
use crate::render::bindings::ShaderBinding;
use crate::render::camera::Camera;
use crate::render::context::{VulkanContext, VulkanResult};
use crate::render::descriptor::{DescriptorSets, DescriptorSetsBuilder};
use crate::render::frame::UniformBuffer;
use crate::render::geo::make_quad;
use crate::render::lighting::Light;
use crate::render::pipeline::{Pipeline, PipelineBuilder};
use crate::render::texture::Texture;
use crate::render::ubo::MirrorPlaneUbo;

use super::common::{bind_pass, MeshBuffers, Projection, Sample, SampleResources, SceneUbos};
use super::technique::{stencil_mask_state, stencil_write_state};

/// The four passes, in the order they must record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorPass {
    /// Skull and wall as seen directly
    DrawOpaque,
    /// Stamp the mirror's footprint into the stencil buffer
    StencilMirror,
    /// The world reflected across the mirror plane, stencil-confined
    DrawMirroredWorld,
    /// The translucent mirror surface itself
    DrawMirror,
}

impl MirrorPass {
    /// Recording order
    pub const ORDER: [MirrorPass; 4] = [
        MirrorPass::DrawOpaque,
        MirrorPass::StencilMirror,
        MirrorPass::DrawMirroredWorld,
        MirrorPass::DrawMirror,
    ];
}

/// Mirror reflection sample
pub struct MirrorWorld {
    device: Device,
    camera: Camera,
    ubos: SceneUbos,
    _mirror_plane: UniformBuffer<MirrorPlaneUbo>,

    skull: MeshBuffers,
    wall: MeshBuffers,
    mirror: MeshBuffers,

    skull_sets: DescriptorSets,
    wall_sets: DescriptorSets,
    mirror_sets: DescriptorSets,
    skull_mirrored_sets: DescriptorSets,
    wall_mirrored_sets: DescriptorSets,

    opaque_pipeline: Pipeline,
    stencil_pipeline: Pipeline,
    mirrored_pipeline: Pipeline,
    mirror_pipeline: Pipeline,
}

/// Plane normal and a point on the plane from a quad's model transform.
/// Quads are authored in the XY plane facing +Z.
fn quad_plane(model: &Mat4) -> (Vec3, Vec3) {
    let normal = model.transform_vector(&Vec3::z()).normalize();
    let point = model.transform_point(&nalgebra::Point3::origin()).coords;
    (normal, point)
}

/// `StencilMirror` state: no color, no depth, stamp reference 1 everywhere
/// the mirror rasterizes
fn stencil_stamp_pass() -> PipelineBuilder {
    PipelineBuilder::new()
        .set_color_write_mask(vk::ColorComponentFlags::empty())
        .set_depth_write_enabled(false)
        .set_stencil_test_enabled(true)
        .set_front_stencil(stencil_write_state(1))
        .copy_front_stencil_to_back()
}

/// `DrawMirroredWorld` state: front faces culled because the reflection flips
/// winding, depth ignored so real geometry doesn't clip the reflection, and
/// fragments confined to the stamped mirror footprint
fn mirrored_world_pass() -> PipelineBuilder {
    PipelineBuilder::new()
        .set_cull_mode(vk::CullModeFlags::FRONT)
        .set_depth_test_enabled(false)
        .set_stencil_test_enabled(true)
        .set_front_stencil(stencil_mask_state(1, vk::CompareOp::EQUAL))
        .copy_front_stencil_to_back()
}

/// `DrawMirror` state: the translucent mirror surface blended over the
/// reflection, still confined to its own footprint
fn mirror_surface_pass() -> PipelineBuilder {
    PipelineBuilder::new()
        .set_blending_enabled(true)
        .set_stencil_test_enabled(true)
        .set_front_stencil(stencil_mask_state(1, vk::CompareOp::EQUAL))
        .copy_front_stencil_to_back()
}

impl MirrorWorld {
    /// Build all four passes; expects a `skull` mesh plus `skull`, `wall` and
    /// `mirror` textures in the registry
    pub fn new(ctx: &VulkanContext, resources: &SampleResources) -> VulkanResult<Self> {
        let mut camera = Camera::default();
        camera.look_at(Vec3::new(0.9, 1.0, 1.3), Vec3::new(0.5, 0.0, 0.0));

        let light = Light {
            pos: Vec3::new(2.0, 0.5, 0.5),
            color: Vec3::new(0.7, 0.7, 0.7),
            ..Light::default()
        };
        let ubos = SceneUbos::new(ctx, light, Projection::standard(0.01, 10.0))?;

        let skull = MeshBuffers::from_mesh(ctx, resources.mesh("skull")?)?;

        // Wall leaning back 45 degrees, mirror hanging just in front of it
        let wall_model = Mat4::new_translation(&Vec3::new(0.0, -0.5, 0.0))
            * nalgebra::Rotation3::from_axis_angle(&Vec3::x_axis(), -45f32.to_radians())
                .to_homogeneous();
        let mut wall_mesh = make_quad(6.0, 6.0, 1);
        wall_mesh.transform(&wall_model);

        let mirror_model = Mat4::new_translation(&Vec3::new(0.0, -0.49, 0.0))
            * nalgebra::Rotation3::from_axis_angle(&Vec3::x_axis(), -45f32.to_radians())
                .to_homogeneous()
            * Mat4::new_translation(&Vec3::new(0.0, 0.5, 0.0));
        let mut mirror_mesh = make_quad(2.0, 1.0, 1);
        mirror_mesh.transform(&mirror_model);

        let wall = MeshBuffers::from_mesh(ctx, &wall_mesh)?;
        let mirror = MeshBuffers::from_mesh(ctx, &mirror_mesh)?;

        let (plane_normal, plane_point) = quad_plane(&mirror_model);
        let mut mirror_plane = UniformBuffer::new(ctx)?;
        mirror_plane.write(MirrorPlaneUbo::new(plane_normal, plane_point));

        let lit_sets = |texture: &Texture| -> VulkanResult<DescriptorSets> {
            DescriptorSetsBuilder::new()
                .add_uniform_buffers(
                    ubos.transforms(),
                    vk::ShaderStageFlags::VERTEX,
                    ShaderBinding::XformsUbo,
                )?
                .add_uniform_buffers(
                    ubos.eye_pos(),
                    vk::ShaderStageFlags::FRAGMENT,
                    ShaderBinding::EyePos,
                )?
                .add_shared_uniform_buffer(
                    ubos.light(),
                    vk::ShaderStageFlags::FRAGMENT,
                    ShaderBinding::Lights,
                )?
                .add_image_sampler(
                    texture.image_view(),
                    texture.sampler(),
                    vk::ShaderStageFlags::FRAGMENT,
                    ShaderBinding::TextureSampler,
                )?
                .build(ctx)
        };

        let mirrored_sets = |texture: &Texture| -> VulkanResult<DescriptorSets> {
            DescriptorSetsBuilder::new()
                .add_uniform_buffers(
                    ubos.transforms(),
                    vk::ShaderStageFlags::VERTEX,
                    ShaderBinding::XformsUbo,
                )?
                .add_uniform_buffers(
                    ubos.eye_pos(),
                    vk::ShaderStageFlags::FRAGMENT,
                    ShaderBinding::EyePos,
                )?
                .add_shared_uniform_buffer(
                    ubos.light(),
                    vk::ShaderStageFlags::FRAGMENT,
                    ShaderBinding::Lights,
                )?
                .add_image_sampler(
                    texture.image_view(),
                    texture.sampler(),
                    vk::ShaderStageFlags::FRAGMENT,
                    ShaderBinding::TextureSampler,
                )?
                .add_shared_uniform_buffer(
                    &mirror_plane,
                    vk::ShaderStageFlags::VERTEX,
                    ShaderBinding::MirrorPlaneUbo,
                )?
                .build(ctx)
        };

        let skull_texture = resources.texture("skull")?;
        let wall_texture = resources.texture("wall")?;
        let mirror_texture = resources.texture("mirror")?;

        let skull_sets = lit_sets(skull_texture)?;
        let wall_sets = lit_sets(wall_texture)?;
        let mirror_sets = lit_sets(mirror_texture)?;
        let skull_mirrored_sets = mirrored_sets(skull_texture)?;
        let wall_mirrored_sets = mirrored_sets(wall_texture)?;

        let opaque_pipeline = PipelineBuilder::new()
            .vertex_shader(resources.vertex_shader(&ctx.device, "lit_model")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "lit_model")?)
            .add_standard_vertex_input(0)
            .build(ctx, skull_sets.layout())?;

        let stencil_pipeline = stencil_stamp_pass()
            .vertex_shader(resources.vertex_shader(&ctx.device, "lit_model")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "lit_model")?)
            .add_standard_vertex_input(0)
            .build(ctx, mirror_sets.layout())?;

        let mirrored_pipeline = mirrored_world_pass()
            .vertex_shader(resources.vertex_shader(&ctx.device, "mirrored")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "lit_model")?)
            .add_standard_vertex_input(0)
            .build(ctx, skull_mirrored_sets.layout())?;

        let mirror_pipeline = mirror_surface_pass()
            .vertex_shader(resources.vertex_shader(&ctx.device, "lit_model")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "lit_model")?)
            .add_standard_vertex_input(0)
            .build(ctx, mirror_sets.layout())?;

        Ok(Self {
            device: ctx.device.clone(),
            camera,
            ubos,
            _mirror_plane: mirror_plane,
            skull,
            wall,
            mirror,
            skull_sets,
            wall_sets,
            mirror_sets,
            skull_mirrored_sets,
            wall_mirrored_sets,
            opaque_pipeline,
            stencil_pipeline,
            mirrored_pipeline,
            mirror_pipeline,
        })
    }

    fn record_pass(
        &self,
        pass: MirrorPass,
        cmd: vk::CommandBuffer,
        frame: usize,
        viewport: vk::Viewport,
        scissor: vk::Rect2D,
    ) {
        let device = &self.device;
        match pass {
            MirrorPass::DrawOpaque => {
                bind_pass(
                    device,
                    cmd,
                    &self.opaque_pipeline,
                    &self.skull_sets,
                    frame,
                    viewport,
                    scissor,
                );
                self.skull.bind(device, cmd);
                self.skull.draw(device, cmd);

                bind_pass(
                    device,
                    cmd,
                    &self.opaque_pipeline,
                    &self.wall_sets,
                    frame,
                    viewport,
                    scissor,
                );
                self.wall.bind(device, cmd);
                self.wall.draw(device, cmd);
            }
            MirrorPass::StencilMirror => {
                bind_pass(
                    device,
                    cmd,
                    &self.stencil_pipeline,
                    &self.mirror_sets,
                    frame,
                    viewport,
                    scissor,
                );
                self.mirror.bind(device, cmd);
                self.mirror.draw(device, cmd);
            }
            MirrorPass::DrawMirroredWorld => {
                bind_pass(
                    device,
                    cmd,
                    &self.mirrored_pipeline,
                    &self.skull_mirrored_sets,
                    frame,
                    viewport,
                    scissor,
                );
                self.skull.bind(device, cmd);
                self.skull.draw(device, cmd);

                bind_pass(
                    device,
                    cmd,
                    &self.mirrored_pipeline,
                    &self.wall_mirrored_sets,
                    frame,
                    viewport,
                    scissor,
                );
                self.wall.bind(device, cmd);
                self.wall.draw(device, cmd);
            }
            MirrorPass::DrawMirror => {
                bind_pass(
                    device,
                    cmd,
                    &self.mirror_pipeline,
                    &self.mirror_sets,
                    frame,
                    viewport,
                    scissor,
                );
                self.mirror.bind(device, cmd);
                self.mirror.draw(device, cmd);
            }
        }
    }
}

impl Sample for MirrorWorld {
    fn update(&mut self, frame: usize, time: f32, viewport: vk::Viewport) -> VulkanResult<()> {
        let world =
            nalgebra::Rotation3::from_axis_angle(&Vec3::y_axis(), time * 90f32.to_radians())
                .to_homogeneous();
        self.ubos.update(frame, &self.camera, world, viewport);
        Ok(())
    }

    fn render(
        &mut self,
        cmd: vk::CommandBuffer,
        frame: usize,
        viewport: vk::Viewport,
        scissor: vk::Rect2D,
    ) -> VulkanResult<()> {
        for pass in MirrorPass::ORDER {
            self.record_pass(pass, cmd, frame, viewport, scissor);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn passes_record_in_program_order() {
        assert_eq!(
            MirrorPass::ORDER,
            [
                MirrorPass::DrawOpaque,
                MirrorPass::StencilMirror,
                MirrorPass::DrawMirroredWorld,
                MirrorPass::DrawMirror,
            ]
        );
    }

    #[test]
    fn stencil_stamp_pass_writes_without_touching_color_or_depth() {
        let config = *stencil_stamp_pass().config();
        assert_eq!(config.color_write_mask, vk::ColorComponentFlags::empty());
        assert!(!config.depth_write_enable);
        assert!(config.stencil_test_enable);
        assert_eq!(config.front_stencil.compare_op, vk::CompareOp::ALWAYS);
        assert_eq!(config.front_stencil.pass_op, vk::StencilOp::REPLACE);
        assert_eq!(config.front_stencil.reference, 1);
        assert_eq!(config.back_stencil.reference, 1);
    }

    #[test]
    fn mirrored_world_pass_is_confined_and_winding_flipped() {
        let config = *mirrored_world_pass().config();
        assert_eq!(config.cull_mode, vk::CullModeFlags::FRONT);
        assert!(!config.depth_test_enable);
        assert!(config.stencil_test_enable);
        assert_eq!(config.front_stencil.compare_op, vk::CompareOp::EQUAL);
        assert_eq!(config.front_stencil.reference, 1);
        assert_eq!(config.front_stencil.write_mask, 0);
        assert_eq!(config.back_stencil.compare_op, vk::CompareOp::EQUAL);
    }

    #[test]
    fn mirror_surface_pass_blends_within_its_footprint() {
        let config = *mirror_surface_pass().config();
        assert!(config.blend_enable);
        assert!(config.depth_test_enable);
        assert!(config.stencil_test_enable);
        assert_eq!(config.front_stencil.compare_op, vk::CompareOp::EQUAL);
        assert_eq!(config.front_stencil.reference, 1);
        assert_eq!(config.front_stencil.write_mask, 0);
    }

    #[test]
    fn quad_plane_tracks_the_model_transform() {
        // A quad leaned back 45 degrees faces up-and-forward
        let model = nalgebra::Rotation3::from_axis_angle(&Vec3::x_axis(), -45f32.to_radians())
            .to_homogeneous();
        let (normal, point) = quad_plane(&model);

        let half = std::f32::consts::FRAC_1_SQRT_2;
        assert_relative_eq!(normal.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(normal.y, half, epsilon = 1e-6);
        assert_relative_eq!(normal.z, half, epsilon = 1e-6);
        assert_relative_eq!(point.norm(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn quad_plane_point_follows_translation() {
        let model = Mat4::new_translation(&Vec3::new(0.0, -0.49, 0.0))
            * nalgebra::Rotation3::from_axis_angle(&Vec3::x_axis(), -45f32.to_radians())
                .to_homogeneous()
            * Mat4::new_translation(&Vec3::new(0.0, 0.5, 0.0));
        let (normal, point) = quad_plane(&model);

        // Still facing up-and-forward, offset by the composed translations
        assert!(normal.y > 0.0 && normal.z > 0.0);
        let half = 0.5 * std::f32::consts::FRAC_1_SQRT_2;
        assert_relative_eq!(point.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(point.y, half - 0.49, epsilon = 1e-5);
        assert_relative_eq!(point.z, -half, epsilon = 1e-5);
    }
}
