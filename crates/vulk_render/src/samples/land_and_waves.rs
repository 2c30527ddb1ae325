//! Procedural terrain with CPU-animated water
//!
//! The terrain is a displaced grid uploaded once. The waves grid is rewritten
//! on the CPU every frame into the buffer of the frame that is *not*
//! currently recording, so the GPU never reads vertices mid-write. Each frame
//! then draws its own wave buffer.

use ash::{vk, Device};

use crate::foundation::math::{perspective_vk, Mat4, Vec3};
use crate::render::actor::InstanceXform;
use crate::render::bindings::ShaderBinding;
use crate::render::buffer::{IndexBuffer, VertexBuffer};
use crate::render::camera::Camera;
use crate::render::context::{VulkanContext, VulkanError, VulkanResult};
use crate::render::descriptor::{DescriptorSets, DescriptorSetsBuilder};
use crate::render::frame::{next_frame, FrameStorage, FrameUbos, MAX_FRAMES_IN_FLIGHT};
use crate::render::geo::make_grid;
use crate::render::mesh::{Mesh, Vertex};
use crate::render::pipeline::{Pipeline, PipelineBuilder};
use crate::render::ubo::TransformsUbo;

use super::common::{bind_pass, MeshBuffers, Renderable, Sample, SampleResources};

/// Terrain height at a ground position
pub fn terrain_height(x: f32, z: f32) -> f32 {
    0.3 * (z * (0.1 * x).sin() + x * (0.1 * z).cos())
}

/// Analytic terrain normal from the height function's partial derivatives
pub fn terrain_normal(x: f32, z: f32) -> Vec3 {
    let dh_dx = 0.03 * z * (0.1 * x).cos() + 0.3 * (0.1 * z).cos();
    let dh_dz = 0.3 * (0.1 * x).sin() - 0.03 * x * (0.1 * z).sin();
    Vec3::new(-dh_dx, 1.0, -dh_dz).normalize()
}

/// Water surface height at `time` seconds
pub fn wave_height(x: f32, z: f32, time: f32) -> f32 {
    0.6 * ((0.1 * x + time).sin() + (0.1 * z + 0.7 * time).cos())
}

/// Displace a flat grid by the terrain height function and recompute normals
pub fn displace_terrain(grid: &mut Mesh) {
    for v in &mut grid.vertices {
        v.pos.y = terrain_height(v.pos.x, v.pos.z);
        v.normal = terrain_normal(v.pos.x, v.pos.z);
    }
}

const GRID_SIZE: f32 = 160.0;
const GRID_ROWS: u32 = 50;
const GRID_COLS: u32 = 50;

/// Hills and animated water sample
pub struct LandAndWaves {
    device: Device,
    camera: Camera,
    transforms: FrameUbos<TransformsUbo>,
    _actors: FrameStorage<InstanceXform>,
    terrain: Renderable,
    wave_mesh: Mesh,
    wave_scratch: Vec<Vertex>,
    wave_vertices: [VertexBuffer; MAX_FRAMES_IN_FLIGHT],
    wave_indices: IndexBuffer,
    wave_descriptors: DescriptorSets,
    wave_pipeline: Pipeline,
}

impl LandAndWaves {
    /// Build terrain and wave grids; expects `uv_checker` and `water`
    /// textures in the registry
    pub fn new(ctx: &VulkanContext, resources: &SampleResources) -> VulkanResult<Self> {
        let mut camera = Camera::default();
        camera.look_at(Vec3::new(15.0, 120.0, 170.0), Vec3::zeros());

        let transforms = FrameUbos::new_with(ctx, TransformsUbo::identity())?;

        // One static terrain instance per frame
        let mut actors = FrameStorage::new(ctx, 1)?;
        for frame in 0..MAX_FRAMES_IN_FLIGHT {
            actors[frame].as_mut_slice()[0] = InstanceXform::new(Mat4::identity());
        }

        let mut terrain_mesh = make_grid(GRID_SIZE, GRID_SIZE, GRID_ROWS, GRID_COLS, 4.0, 4.0);
        displace_terrain(&mut terrain_mesh);

        let terrain_texture = resources.texture("uv_checker")?;
        let terrain_descriptors = DescriptorSetsBuilder::new()
            .add_uniform_buffers(
                &transforms,
                vk::ShaderStageFlags::VERTEX,
                ShaderBinding::XformsUbo,
            )?
            .add_image_sampler(
                terrain_texture.image_view(),
                terrain_texture.sampler(),
                vk::ShaderStageFlags::FRAGMENT,
                ShaderBinding::TextureSampler,
            )?
            .add_storage_buffers(
                &actors,
                vk::ShaderStageFlags::VERTEX,
                ShaderBinding::Actors,
            )?
            .build(ctx)?;
        let terrain_pipeline = PipelineBuilder::new()
            .vertex_shader(resources.vertex_shader(&ctx.device, "terrain")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "terrain")?)
            .add_standard_vertex_input(0)
            .build(ctx, terrain_descriptors.layout())?;
        let terrain = Renderable {
            buffers: MeshBuffers::from_mesh(ctx, &terrain_mesh)?,
            descriptors: terrain_descriptors,
            pipeline: terrain_pipeline,
        };

        let wave_mesh = make_grid(GRID_SIZE, GRID_SIZE, GRID_ROWS, GRID_COLS, 4.0, 4.0);
        let wave_scratch = wave_mesh.vertices.clone();

        let mut buffers = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            buffers.push(VertexBuffer::new_host_visible(ctx, &wave_mesh.vertices)?);
        }
        let wave_vertices: [VertexBuffer; MAX_FRAMES_IN_FLIGHT] =
            buffers.try_into().map_err(|_| {
                VulkanError::InitializationFailed("wave vertex buffer count mismatch".to_string())
            })?;
        let wave_indices = IndexBuffer::new(ctx, &wave_mesh.indices)?;

        let water_texture = resources.texture("water")?;
        let wave_descriptors = DescriptorSetsBuilder::new()
            .add_uniform_buffers(
                &transforms,
                vk::ShaderStageFlags::VERTEX,
                ShaderBinding::XformsUbo,
            )?
            .add_image_sampler(
                water_texture.image_view(),
                water_texture.sampler(),
                vk::ShaderStageFlags::FRAGMENT,
                ShaderBinding::TextureSampler,
            )?
            .build(ctx)?;
        let wave_pipeline = PipelineBuilder::new()
            .vertex_shader(resources.vertex_shader(&ctx.device, "waves")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "waves")?)
            .add_standard_vertex_input(0)
            .set_blending_enabled(true)
            .build(ctx, wave_descriptors.layout())?;

        Ok(Self {
            device: ctx.device.clone(),
            camera,
            transforms,
            _actors: actors,
            terrain,
            wave_mesh,
            wave_scratch,
            wave_vertices,
            wave_indices,
            wave_descriptors,
            wave_pipeline,
        })
    }

    fn write_waves(&mut self, frame: usize, time: f32) -> VulkanResult<()> {
        self.wave_scratch.copy_from_slice(&self.wave_mesh.vertices);
        for v in &mut self.wave_scratch {
            v.pos.y = wave_height(v.pos.x, v.pos.z, time);
        }
        self.wave_vertices[frame].update(&self.wave_scratch)
    }
}

impl Sample for LandAndWaves {
    fn update(&mut self, frame: usize, time: f32, viewport: vk::Viewport) -> VulkanResult<()> {
        let aspect = viewport.width / viewport.height;
        self.transforms.write(
            frame,
            TransformsUbo {
                world: Mat4::identity(),
                view: self.camera.view_matrix(),
                proj: perspective_vk(45f32.to_radians(), aspect, 1.0, 4000.0),
            },
        );
        // Animate into the frame the GPU is not about to read
        self.write_waves(next_frame(frame), time)?;
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

        bind_pass(
            &self.device,
            cmd,
            &self.wave_pipeline,
            &self.wave_descriptors,
            frame,
            viewport,
            scissor,
        );
        unsafe {
            self.device.cmd_bind_vertex_buffers(
                cmd,
                0,
                &[self.wave_vertices[frame].handle()],
                &[0],
            );
            self.device.cmd_bind_index_buffer(
                cmd,
                self.wave_indices.handle(),
                0,
                vk::IndexType::UINT32,
            );
            self.device
                .cmd_draw_indexed(cmd, self.wave_indices.index_count(), 1, 0, 0, 0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn terrain_is_flat_at_the_origin() {
        assert_eq!(terrain_height(0.0, 0.0), 0.0);
    }

    #[test]
    fn terrain_normal_is_unit_length_and_upward() {
        for (x, z) in [(0.0, 0.0), (13.0, -42.0), (-80.0, 80.0)] {
            let n = terrain_normal(x, z);
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-5);
            assert!(n.y > 0.0);
        }
    }

    #[test]
    fn terrain_normal_matches_a_finite_difference() {
        let (x, z) = (7.0, -15.0);
        let h = 1e-3;
        let dh_dx = (terrain_height(x + h, z) - terrain_height(x - h, z)) / (2.0 * h);
        let dh_dz = (terrain_height(x, z + h) - terrain_height(x, z - h)) / (2.0 * h);
        let expected = Vec3::new(-dh_dx, 1.0, -dh_dz).normalize();

        let n = terrain_normal(x, z);
        assert_relative_eq!(n.x, expected.x, epsilon = 1e-4);
        assert_relative_eq!(n.y, expected.y, epsilon = 1e-4);
        assert_relative_eq!(n.z, expected.z, epsilon = 1e-4);
    }

    #[test]
    fn wave_height_stays_bounded() {
        for i in 0..100 {
            let t = i as f32 * 0.37;
            let y = wave_height(31.0, -17.0, t);
            assert!(y.abs() <= 1.2 + 1e-5);
        }
    }

    #[test]
    fn displacement_keeps_grid_footprint() {
        let mut grid = make_grid(160.0, 160.0, 10, 10, 1.0, 1.0);
        let footprint: Vec<(f32, f32)> = grid.vertices.iter().map(|v| (v.pos.x, v.pos.z)).collect();
        displace_terrain(&mut grid);

        for (v, (x, z)) in grid.vertices.iter().zip(footprint) {
            assert_eq!(v.pos.x, x);
            assert_eq!(v.pos.z, z);
            assert_eq!(v.pos.y, terrain_height(x, z));
        }
    }
}
