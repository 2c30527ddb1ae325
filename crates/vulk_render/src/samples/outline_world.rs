//! Stencil outline around a skull
//!
//! The lit pass stamps reference 1 wherever it draws. The outline pass then
//! redraws the skull slightly scaled up with the stencil test set to
//! NOT_EQUAL 1, so only the halo outside the original silhouette survives.
//! Depth test and write are off for the outline so it never fights the model.

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
use crate::render::ubo::ModelXformUbo;

use super::common::{bind_pass, MeshBuffers, Projection, Sample, SampleResources, SceneUbos};
use super::technique::{stencil_mask_state, stencil_write_state};

/// How much the outline pass inflates the model
pub const OUTLINE_SCALE: f32 = 1.01;

/// Lit pass state: ordinary depth-tested drawing that also stamps reference 1
/// into the stencil buffer wherever it rasterizes
fn model_pass() -> PipelineBuilder {
    PipelineBuilder::new()
        .set_stencil_test_enabled(true)
        .set_front_stencil(stencil_write_state(1))
        .copy_front_stencil_to_back()
}

/// Outline pass state: fragments survive only outside the stamped silhouette,
/// with depth ignored so the halo never fights the model
fn outline_pass() -> PipelineBuilder {
    PipelineBuilder::new()
        .set_depth_test_enabled(false)
        .set_depth_write_enabled(false)
        .set_stencil_test_enabled(true)
        .set_front_stencil(stencil_mask_state(1, vk::CompareOp::NOT_EQUAL))
        .copy_front_stencil_to_back()
}

/// Outlined skull sample
pub struct OutlineWorld {
    device: Device,
    camera: Camera,
    ubos: SceneUbos,
    _outline_xform: UniformBuffer<ModelXformUbo>,

    skull: MeshBuffers,
    wall: MeshBuffers,

    skull_sets: DescriptorSets,
    wall_sets: DescriptorSets,
    outline_sets: DescriptorSets,

    model_pipeline: Pipeline,
    outline_pipeline: Pipeline,
}

impl OutlineWorld {
    /// Build the lit and outline passes; expects a `skull` mesh plus `skull`
    /// and `wall` textures in the registry
    pub fn new(ctx: &VulkanContext, resources: &SampleResources) -> VulkanResult<Self> {
        let mut camera = Camera::default();
        camera.look_at(Vec3::new(0.0, 0.0, 1.3), Vec3::zeros());

        let light = Light {
            pos: Vec3::new(2.0, 0.5, 0.5),
            color: Vec3::new(0.7, 0.7, 0.7),
            ..Light::default()
        };
        let ubos = SceneUbos::new(ctx, light, Projection::standard(0.01, 10.0))?;

        let skull = MeshBuffers::from_mesh(ctx, resources.mesh("skull")?)?;

        let mut wall_mesh = make_quad(2.0, 2.0, 1);
        wall_mesh.transform(&Mat4::new_translation(&Vec3::new(1.0, 0.0, 1.0)));
        let wall = MeshBuffers::from_mesh(ctx, &wall_mesh)?;

        let mut outline_xform = UniformBuffer::new(ctx)?;
        outline_xform.write(ModelXformUbo::new(Mat4::new_scaling(OUTLINE_SCALE)));

        let lit_sets = |texture_name: &str| -> VulkanResult<DescriptorSets> {
            let texture = resources.texture(texture_name)?;
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

        let skull_sets = lit_sets("skull")?;
        let wall_sets = lit_sets("wall")?;

        let outline_sets = DescriptorSetsBuilder::new()
            .add_uniform_buffers(
                ubos.transforms(),
                vk::ShaderStageFlags::VERTEX,
                ShaderBinding::XformsUbo,
            )?
            .add_shared_uniform_buffer(
                &outline_xform,
                vk::ShaderStageFlags::VERTEX,
                ShaderBinding::ModelXform,
            )?
            .build(ctx)?;

        let model_pipeline = model_pass()
            .vertex_shader(resources.vertex_shader(&ctx.device, "lit_model")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "lit_model")?)
            .add_standard_vertex_input(0)
            .build(ctx, skull_sets.layout())?;

        let outline_pipeline = outline_pass()
            .vertex_shader(resources.vertex_shader(&ctx.device, "outline")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "outline")?)
            .add_standard_vertex_input(0)
            .build(ctx, outline_sets.layout())?;

        Ok(Self {
            device: ctx.device.clone(),
            camera,
            ubos,
            _outline_xform: outline_xform,
            skull,
            wall,
            skull_sets,
            wall_sets,
            outline_sets,
            model_pipeline,
            outline_pipeline,
        })
    }
}

impl Sample for OutlineWorld {
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
        let device = &self.device;

        bind_pass(
            device,
            cmd,
            &self.model_pipeline,
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
            &self.model_pipeline,
            &self.wall_sets,
            frame,
            viewport,
            scissor,
        );
        self.wall.bind(device, cmd);
        self.wall.draw(device, cmd);

        // Outline reuses the skull's buffers under the inflated transform
        bind_pass(
            device,
            cmd,
            &self.outline_pipeline,
            &self.outline_sets,
            frame,
            viewport,
            scissor,
        );
        self.skull.bind(device, cmd);
        self.skull.draw(device, cmd);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::geo::make_geo_sphere;
    use approx::assert_relative_eq;

    #[test]
    fn lit_pass_stamps_the_stencil_while_depth_testing() {
        let config = *model_pass().config();
        assert!(config.depth_test_enable);
        assert!(config.depth_write_enable);
        assert!(config.stencil_test_enable);
        assert_eq!(config.front_stencil.compare_op, vk::CompareOp::ALWAYS);
        assert_eq!(config.front_stencil.pass_op, vk::StencilOp::REPLACE);
        assert_eq!(config.front_stencil.reference, 1);
        assert_eq!(config.front_stencil.write_mask, 0xFF);
        assert_eq!(config.back_stencil.pass_op, vk::StencilOp::REPLACE);
        assert_eq!(config.back_stencil.reference, 1);
    }

    #[test]
    fn outline_pass_draws_only_outside_the_silhouette() {
        let config = *outline_pass().config();
        assert!(!config.depth_test_enable);
        assert!(!config.depth_write_enable);
        assert!(config.stencil_test_enable);
        assert_eq!(config.front_stencil.compare_op, vk::CompareOp::NOT_EQUAL);
        assert_eq!(config.front_stencil.reference, 1);
        assert_eq!(config.front_stencil.write_mask, 0);
        assert_eq!(config.front_stencil.pass_op, vk::StencilOp::KEEP);
        assert_eq!(config.back_stencil.compare_op, vk::CompareOp::NOT_EQUAL);
        assert_eq!(config.back_stencil.write_mask, 0);
    }

    #[test]
    fn inflation_moves_every_vertex_outward() {
        let mut mesh = make_geo_sphere(1.0, 2);
        let original = mesh.vertices.clone();
        mesh.transform(&Mat4::new_scaling(OUTLINE_SCALE));

        for (inflated, base) in mesh.vertices.iter().zip(&original) {
            assert!(inflated.pos.norm() > base.pos.norm());
            // Radially outward: direction from the center is unchanged
            assert_relative_eq!(
                inflated.pos.normalize().dot(&base.pos.normalize()),
                1.0,
                epsilon = 1e-5
            );
        }
    }
}
