//! Planar shadow: a skull's shadow flattened onto the floor
//!
//! The shadow pass redraws the skull through a projection matrix that
//! squashes every vertex onto the floor plane along the ray from the light.
//! The stencil buffer only lets the first fragment per pixel through, so
//! overlapping shadow triangles darken the floor exactly once instead of
//! stacking.

use ash::{vk, Device};

use crate::foundation::math::{shadow_onto_plane, Mat4, Vec3};
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
use super::technique::stencil_mask_state;

/// Shadow offset above the floor to dodge depth fighting
const SHADOW_LIFT: f32 = 0.001;

/// Flatten geometry onto the floor plane (y = 0) as seen from `light_pos`,
/// lifted just above the surface
pub fn floor_shadow_matrix(light_pos: Vec3) -> Mat4 {
    Mat4::new_translation(&Vec3::new(0.0, SHADOW_LIFT, 0.0))
        * shadow_onto_plane(Vec3::y(), 0.0, light_pos)
}

/// Planar shadow sample
pub struct PlanarShadowWorld {
    device: Device,
    camera: Camera,
    ubos: SceneUbos,
    _shadow_xform: UniformBuffer<ModelXformUbo>,

    skull: MeshBuffers,
    floor: MeshBuffers,

    skull_sets: DescriptorSets,
    floor_sets: DescriptorSets,
    shadow_sets: DescriptorSets,

    lit_pipeline: Pipeline,
    shadow_pipeline: Pipeline,
}

impl PlanarShadowWorld {
    /// Build the lit and shadow passes; expects a `skull` mesh plus `skull`
    /// and `floor` textures in the registry
    pub fn new(ctx: &VulkanContext, resources: &SampleResources) -> VulkanResult<Self> {
        let mut camera = Camera::default();
        camera.look_at(Vec3::new(0.9, 1.0, 1.3), Vec3::new(0.5, 0.0, 0.0));

        let light_pos = Vec3::new(2.0, 3.0, 1.0);
        let light = Light {
            pos: light_pos,
            color: Vec3::new(1.0, 1.0, 1.0),
            ..Light::default()
        };
        let ubos = SceneUbos::new(ctx, light, Projection::standard(0.01, 10.0))?;

        let mut skull_mesh = resources.mesh("skull")?.clone();
        skull_mesh.transform(&Mat4::new_translation(&Vec3::new(0.0, 0.5, 0.0)));
        let skull = MeshBuffers::from_mesh(ctx, &skull_mesh)?;

        // Floor quad rotated flat into the y = 0 plane
        let mut floor_mesh = make_quad(6.0, 6.0, 1);
        floor_mesh.transform(
            &nalgebra::Rotation3::from_axis_angle(&Vec3::x_axis(), -90f32.to_radians())
                .to_homogeneous(),
        );
        let floor = MeshBuffers::from_mesh(ctx, &floor_mesh)?;

        let mut shadow_xform = UniformBuffer::new(ctx)?;
        shadow_xform.write(ModelXformUbo::new(floor_shadow_matrix(light_pos)));

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
        let floor_sets = lit_sets("floor")?;

        let shadow_sets = DescriptorSetsBuilder::new()
            .add_uniform_buffers(
                ubos.transforms(),
                vk::ShaderStageFlags::VERTEX,
                ShaderBinding::XformsUbo,
            )?
            .add_shared_uniform_buffer(
                &shadow_xform,
                vk::ShaderStageFlags::VERTEX,
                ShaderBinding::ModelXform,
            )?
            .build(ctx)?;

        let lit_pipeline = PipelineBuilder::new()
            .vertex_shader(resources.vertex_shader(&ctx.device, "lit_model")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "lit_model")?)
            .add_standard_vertex_input(0)
            .build(ctx, skull_sets.layout())?;

        // Shadow fragments pass only where the stencil is still 0 and then
        // bump it, so each floor pixel darkens at most once
        let shadow_pipeline = PipelineBuilder::new()
            .vertex_shader(resources.vertex_shader(&ctx.device, "shadow")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "shadow")?)
            .add_standard_vertex_input(0)
            .set_blending_enabled(true)
            .set_depth_write_enabled(false)
            .set_stencil_test_enabled(true)
            .set_front_stencil(stencil_mask_state(0, vk::CompareOp::EQUAL))
            .set_front_stencil_pass_op(vk::StencilOp::INCREMENT_AND_CLAMP)
            .set_front_stencil_write_mask(0xFF)
            .copy_front_stencil_to_back()
            .build(ctx, shadow_sets.layout())?;

        Ok(Self {
            device: ctx.device.clone(),
            camera,
            ubos,
            _shadow_xform: shadow_xform,
            skull,
            floor,
            skull_sets,
            floor_sets,
            shadow_sets,
            lit_pipeline,
            shadow_pipeline,
        })
    }
}

impl Sample for PlanarShadowWorld {
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
            &self.lit_pipeline,
            &self.floor_sets,
            frame,
            viewport,
            scissor,
        );
        self.floor.bind(device, cmd);
        self.floor.draw(device, cmd);

        bind_pass(
            device,
            cmd,
            &self.lit_pipeline,
            &self.skull_sets,
            frame,
            viewport,
            scissor,
        );
        self.skull.bind(device, cmd);
        self.skull.draw(device, cmd);

        // Shadow reuses the skull's buffers under the flattening transform
        bind_pass(
            device,
            cmd,
            &self.shadow_pipeline,
            &self.shadow_sets,
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
    use approx::assert_relative_eq;

    #[test]
    fn shadow_lands_on_the_floor() {
        let light = Vec3::new(0.0, 4.0, 0.0);
        let m = floor_shadow_matrix(light);

        let shadow = m.transform_point(&nalgebra::Point3::new(1.0, 2.0, 0.0));
        assert_relative_eq!(shadow.y, SHADOW_LIFT, epsilon = 1e-5);
        // Light directly overhead at twice the height doubles the offset
        assert_relative_eq!(shadow.x, 2.0, epsilon = 1e-4);
        assert_relative_eq!(shadow.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn points_already_on_the_floor_only_get_lifted() {
        let light = Vec3::new(2.0, 3.0, 1.0);
        let m = floor_shadow_matrix(light);

        let p = m.transform_point(&nalgebra::Point3::new(0.7, 0.0, -0.3));
        assert_relative_eq!(p.x, 0.7, epsilon = 1e-4);
        assert_relative_eq!(p.y, SHADOW_LIFT, epsilon = 1e-5);
        assert_relative_eq!(p.z, -0.3, epsilon = 1e-4);
    }
}
