//! Phong-lit geodesic sphere
//!
//! One renderable, one point light. The world rotates about Y so the specular
//! highlight sweeps across the sphere.

use ash::{vk, Device};

use crate::foundation::math::Vec3;
use crate::render::bindings::ShaderBinding;
use crate::render::camera::Camera;
use crate::render::context::{VulkanContext, VulkanResult};
use crate::render::descriptor::DescriptorSetsBuilder;
use crate::render::geo::make_geo_sphere;
use crate::render::lighting::Light;
use crate::render::pipeline::PipelineBuilder;
use crate::render::texture::Texture;

use super::common::{MeshBuffers, Projection, Renderable, Sample, SampleResources, SceneUbos};

/// Lit sphere sample
pub struct Lighting {
    device: Device,
    camera: Camera,
    ubos: SceneUbos,
    sphere: Renderable,
    _texture: Texture,
}

impl Lighting {
    /// Build the sphere and its lit pipeline
    pub fn new(ctx: &VulkanContext, resources: &SampleResources) -> VulkanResult<Self> {
        let mut camera = Camera::default();
        camera.look_at(Vec3::new(0.0, 1.2, 2.5), Vec3::zeros());

        let light = Light {
            pos: Vec3::new(2.0, 0.5, 0.5),
            color: Vec3::new(0.7, 0.7, 0.7),
            ..Light::default()
        };
        let ubos = SceneUbos::new(ctx, light, Projection::standard(0.1, 100.0))?;

        let texture = Texture::solid_color(ctx, [200, 200, 200, 255])?;
        let buffers = MeshBuffers::from_mesh(ctx, &make_geo_sphere(1.0, 3))?;

        let descriptors = DescriptorSetsBuilder::new()
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
            .build(ctx)?;

        let pipeline = PipelineBuilder::new()
            .vertex_shader(resources.vertex_shader(&ctx.device, "light")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "light")?)
            .add_standard_vertex_input(0)
            .build(ctx, descriptors.layout())?;

        Ok(Self {
            device: ctx.device.clone(),
            camera,
            ubos,
            sphere: Renderable {
                buffers,
                descriptors,
                pipeline,
            },
            _texture: texture,
        })
    }
}

impl Sample for Lighting {
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
        self.sphere.record(&self.device, cmd, frame, viewport, scissor);
        Ok(())
    }
}
