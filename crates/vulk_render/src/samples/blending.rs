//! Alpha blending: a textured tile behind a fence cut out by an opacity map
//!
//! The tile records first so the fence's transparent texels blend against it.
//! Both pipelines use the fixed blend formula; draw order supplies the rest.

use ash::{vk, Device};

use crate::foundation::math::{perspective_vk, Mat4, Vec3};
use crate::render::bindings::ShaderBinding;
use crate::render::camera::Camera;
use crate::render::context::{VulkanContext, VulkanResult};
use crate::render::descriptor::DescriptorSetsBuilder;
use crate::render::frame::FrameUbos;
use crate::render::geo::make_quad;
use crate::render::pipeline::PipelineBuilder;
use crate::render::ubo::TransformsUbo;

use super::common::{MeshBuffers, Renderable, Sample, SampleResources};

/// Blended fence-over-tile sample
pub struct Blending {
    device: Device,
    camera: Camera,
    transforms: FrameUbos<TransformsUbo>,
    tile: Renderable,
    fence: Renderable,
}

impl Blending {
    /// Build both quads; expects `tile`, `fence_color` and `fence_opacity`
    /// textures in the registry
    pub fn new(ctx: &VulkanContext, resources: &SampleResources) -> VulkanResult<Self> {
        let mut camera = Camera::default();
        camera.look_at(Vec3::new(0.0, 0.0, 1.3), Vec3::zeros());

        let transforms = FrameUbos::new_with(ctx, TransformsUbo::identity())?;

        let tile_mesh = make_quad(1.0, 1.0, 1);
        let mut fence_mesh = make_quad(1.0, 1.0, 1);
        // Fence floats slightly in front of the tile
        fence_mesh.transform(&Mat4::new_translation(&Vec3::new(0.0, 0.0, 0.05)));

        let tile_texture = resources.texture("tile")?;
        let tile_descriptors = DescriptorSetsBuilder::new()
            .add_uniform_buffers(
                &transforms,
                vk::ShaderStageFlags::VERTEX,
                ShaderBinding::XformsUbo,
            )?
            .add_image_sampler(
                tile_texture.image_view(),
                tile_texture.sampler(),
                vk::ShaderStageFlags::FRAGMENT,
                ShaderBinding::TextureSampler,
            )?
            .build(ctx)?;
        let tile_pipeline = PipelineBuilder::new()
            .vertex_shader(resources.vertex_shader(&ctx.device, "model")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "model")?)
            .add_standard_vertex_input(0)
            .set_blending_enabled(true)
            .build(ctx, tile_descriptors.layout())?;
        let tile = Renderable {
            buffers: MeshBuffers::from_mesh(ctx, &tile_mesh)?,
            descriptors: tile_descriptors,
            pipeline: tile_pipeline,
        };

        let fence_opacity = resources.texture("fence_opacity")?;
        let fence_color = resources.texture("fence_color")?;
        let fence_descriptors = DescriptorSetsBuilder::new()
            .add_uniform_buffers(
                &transforms,
                vk::ShaderStageFlags::VERTEX,
                ShaderBinding::XformsUbo,
            )?
            .add_image_sampler(
                fence_opacity.image_view(),
                fence_opacity.sampler(),
                vk::ShaderStageFlags::FRAGMENT,
                ShaderBinding::TextureSampler,
            )?
            .add_image_sampler(
                fence_color.image_view(),
                fence_color.sampler(),
                vk::ShaderStageFlags::FRAGMENT,
                ShaderBinding::TextureSampler2,
            )?
            .build(ctx)?;
        let fence_pipeline = PipelineBuilder::new()
            .vertex_shader(resources.vertex_shader(&ctx.device, "blending")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "blending")?)
            .add_standard_vertex_input(0)
            .set_blending_enabled(true)
            .build(ctx, fence_descriptors.layout())?;
        let fence = Renderable {
            buffers: MeshBuffers::from_mesh(ctx, &fence_mesh)?,
            descriptors: fence_descriptors,
            pipeline: fence_pipeline,
        };

        Ok(Self {
            device: ctx.device.clone(),
            camera,
            transforms,
            tile,
            fence,
        })
    }
}

impl Sample for Blending {
    fn update(&mut self, frame: usize, time: f32, viewport: vk::Viewport) -> VulkanResult<()> {
        let world =
            nalgebra::Rotation3::from_axis_angle(&Vec3::y_axis(), time * 90f32.to_radians())
                .to_homogeneous();
        let aspect = viewport.width / viewport.height;
        self.transforms.write(
            frame,
            TransformsUbo {
                world,
                view: self.camera.view_matrix(),
                proj: perspective_vk(45f32.to_radians(), aspect, 0.01, 10.0),
            },
        );
        Ok(())
    }

    fn render(
        &mut self,
        cmd: vk::CommandBuffer,
        frame: usize,
        viewport: vk::Viewport,
        scissor: vk::Rect2D,
    ) -> VulkanResult<()> {
        // Opaque-ish backdrop first, cutout fence second
        self.tile.record(&self.device, cmd, frame, viewport, scissor);
        self.fence.record(&self.device, cmd, frame, viewport, scissor);
        Ok(())
    }
}
