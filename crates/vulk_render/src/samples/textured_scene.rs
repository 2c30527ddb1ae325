//! Lit terrain blended with water, textured by elevation
//!
//! The terrain fragment shader blends beach, rock and snow samplers by
//! height. The waves pass draws the same footprint as a translucent sheet
//! with its material in a storage buffer. A geometry-shader pipeline that
//! extrudes normals can be toggled on for debugging.

use ash::{vk, Device};

use crate::foundation::math::Vec3;
use crate::render::bindings::ShaderBinding;
use crate::render::camera::Camera;
use crate::render::context::{VulkanContext, VulkanResult};
use crate::render::descriptor::{DescriptorSets, DescriptorSetsBuilder};
use crate::render::frame::StorageBuffer;
use crate::render::geo::make_grid;
use crate::render::lighting::{Light, Material};
use crate::render::pipeline::{Pipeline, PipelineBuilder};

use super::common::{
    bind_pass, MeshBuffers, Projection, Renderable, Sample, SampleResources, SceneUbos,
};
use super::land_and_waves::displace_terrain;

const GRID_SIZE: f32 = 160.0;
const GRID_ROWS: u32 = 50;
const GRID_COLS: u32 = 50;

/// Elevation-textured terrain sample
pub struct TexturedScene {
    device: Device,
    camera: Camera,
    ubos: SceneUbos,
    terrain: Renderable,
    waves: Renderable,
    _wave_material: StorageBuffer<Material>,
    normals_descriptors: DescriptorSets,
    normals_pipeline: Pipeline,
    /// Draw the normal-extrusion debug pass after the scene
    pub show_normals: bool,
}

impl TexturedScene {
    /// Build the terrain and wave passes; expects `beach`, `rock`, `snow` and
    /// `water` textures in the registry
    pub fn new(ctx: &VulkanContext, resources: &SampleResources) -> VulkanResult<Self> {
        let mut camera = Camera::default();
        camera.look_at(Vec3::new(15.0, 120.0, 170.0), Vec3::zeros());

        let light = Light {
            pos: Vec3::new(0.0, 200.0, 0.0),
            color: Vec3::new(1.0, 1.0, 1.0),
            falloff_start: 100.0,
            falloff_end: -1.0,
            ..Light::default()
        };
        let ubos = SceneUbos::new(ctx, light, Projection::standard(1.0, 4000.0))?;

        let mut terrain_mesh = make_grid(GRID_SIZE, GRID_SIZE, GRID_ROWS, GRID_COLS, 4.0, 4.0);
        displace_terrain(&mut terrain_mesh);
        let terrain_buffers = MeshBuffers::from_mesh(ctx, &terrain_mesh)?;

        let beach = resources.texture("beach")?;
        let rock = resources.texture("rock")?;
        let snow = resources.texture("snow")?;
        let terrain_descriptors = DescriptorSetsBuilder::new()
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
                beach.image_view(),
                beach.sampler(),
                vk::ShaderStageFlags::FRAGMENT,
                ShaderBinding::TextureSampler,
            )?
            .add_image_sampler(
                rock.image_view(),
                rock.sampler(),
                vk::ShaderStageFlags::FRAGMENT,
                ShaderBinding::TextureSampler2,
            )?
            .add_image_sampler(
                snow.image_view(),
                snow.sampler(),
                vk::ShaderStageFlags::FRAGMENT,
                ShaderBinding::TextureSampler3,
            )?
            .build(ctx)?;
        let terrain_pipeline = PipelineBuilder::new()
            .vertex_shader(resources.vertex_shader(&ctx.device, "lit_textured_terrain")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "lit_textured_terrain")?)
            .add_standard_vertex_input(0)
            .build(ctx, terrain_descriptors.layout())?;
        let terrain = Renderable {
            buffers: terrain_buffers,
            descriptors: terrain_descriptors,
            pipeline: terrain_pipeline,
        };

        let mut wave_material = StorageBuffer::new(ctx, 1)?;
        wave_material.as_mut_slice()[0] = Material {
            diffuse: Vec3::new(0.2, 0.4, 0.7),
            alpha: 0.6,
            shininess: 96.0,
            ..Material::default()
        };

        let wave_mesh = make_grid(GRID_SIZE, GRID_SIZE, GRID_ROWS, GRID_COLS, 4.0, 4.0);
        let water = resources.texture("water")?;
        let wave_descriptors = DescriptorSetsBuilder::new()
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
                water.image_view(),
                water.sampler(),
                vk::ShaderStageFlags::FRAGMENT,
                ShaderBinding::TextureSampler,
            )?
            .add_shared_storage_buffer(
                &wave_material,
                vk::ShaderStageFlags::FRAGMENT,
                ShaderBinding::Materials,
            )?
            .build(ctx)?;
        let wave_pipeline = PipelineBuilder::new()
            .vertex_shader(resources.vertex_shader(&ctx.device, "lit_textured_waves")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "lit_textured_waves")?)
            .add_standard_vertex_input(0)
            .set_blending_enabled(true)
            .build(ctx, wave_descriptors.layout())?;
        let waves = Renderable {
            buffers: MeshBuffers::from_mesh(ctx, &wave_mesh)?,
            descriptors: wave_descriptors,
            pipeline: wave_pipeline,
        };

        // Debug pass: the geometry shader turns each vertex into a normal line
        let normals_descriptors = DescriptorSetsBuilder::new()
            .add_uniform_buffers(
                ubos.transforms(),
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::GEOMETRY,
                ShaderBinding::XformsUbo,
            )?
            .build(ctx)?;
        let normals_pipeline = PipelineBuilder::new()
            .vertex_shader(resources.vertex_shader(&ctx.device, "normals")?)
            .geometry_shader(resources.geometry_shader(&ctx.device, "normals")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "normals")?)
            .add_standard_vertex_input(0)
            .set_primitive_topology(vk::PrimitiveTopology::POINT_LIST)
            .build(ctx, normals_descriptors.layout())?;

        Ok(Self {
            device: ctx.device.clone(),
            camera,
            ubos,
            terrain,
            waves,
            _wave_material: wave_material,
            normals_descriptors,
            normals_pipeline,
            show_normals: false,
        })
    }
}

impl Sample for TexturedScene {
    fn update(&mut self, frame: usize, time: f32, viewport: vk::Viewport) -> VulkanResult<()> {
        let world =
            nalgebra::Rotation3::from_axis_angle(&Vec3::y_axis(), 0.5 * time * 90f32.to_radians())
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
        self.terrain
            .record(&self.device, cmd, frame, viewport, scissor);
        self.waves
            .record(&self.device, cmd, frame, viewport, scissor);

        if self.show_normals {
            bind_pass(
                &self.device,
                cmd,
                &self.normals_pipeline,
                &self.normals_descriptors,
                frame,
                viewport,
                scissor,
            );
            self.terrain.buffers.bind(&self.device, cmd);
            self.terrain.buffers.draw(&self.device, cmd);
        }
        Ok(())
    }
}
