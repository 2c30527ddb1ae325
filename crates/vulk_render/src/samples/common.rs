//! Plumbing shared by every sample
//!
//! Each sample owns its geometry, descriptor sets and pipelines, but they all
//! update the same per-frame scene UBOs, bind passes the same way, and pull
//! meshes, textures and shaders out of the same named registries.

use ash::{vk, Device};
use std::collections::HashMap;

use crate::config::RenderSettings;
use crate::foundation::math::{perspective_vk, Mat4};
use crate::render::buffer::{IndexBuffer, VertexBuffer};
use crate::render::camera::Camera;
use crate::render::context::{VulkanContext, VulkanError, VulkanResult};
use crate::render::descriptor::DescriptorSets;
use crate::render::frame::{FrameUbos, UniformBuffer};
use crate::render::lighting::Light;
use crate::render::mesh::{Mesh, MeshAccumulator, MeshRef};
use crate::render::pipeline::Pipeline;
use crate::render::shader::ShaderModule;
use crate::render::texture::Texture;
use crate::render::ubo::{EyePosUbo, TransformsUbo};

/// A sample's view into the renderer while recording one frame
pub trait Sample {
    /// Rewrite this frame's mapped buffers. Must only run after the frame's
    /// fence has signaled.
    fn update(&mut self, frame: usize, time: f32, viewport: vk::Viewport) -> VulkanResult<()>;

    /// Record this sample's passes, in order, into `cmd`
    fn render(
        &mut self,
        cmd: vk::CommandBuffer,
        frame: usize,
        viewport: vk::Viewport,
        scissor: vk::Rect2D,
    ) -> VulkanResult<()>;
}

/// Perspective parameters a sample renders with
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    /// Vertical field of view in radians
    pub fovy: f32,
    /// Near plane distance
    pub near: f32,
    /// Far plane distance
    pub far: f32,
}

impl Projection {
    /// 45 degree field of view with the given clip planes
    pub fn standard(near: f32, far: f32) -> Self {
        Self {
            fovy: std::f32::consts::FRAC_PI_4,
            near,
            far,
        }
    }
}

/// The UBOs every sample feeds its shaders: per-frame transforms, per-frame
/// eye position, and one shared light.
pub struct SceneUbos {
    transforms: FrameUbos<TransformsUbo>,
    eye_pos: FrameUbos<EyePosUbo>,
    light: UniformBuffer<Light>,
    projection: Projection,
}

impl SceneUbos {
    /// Create the scene UBOs with `light` uploaded once
    pub fn new(ctx: &VulkanContext, light: Light, projection: Projection) -> VulkanResult<Self> {
        let transforms = FrameUbos::new_with(ctx, TransformsUbo::identity())?;
        let eye_pos = FrameUbos::new(ctx)?;
        let mut light_ubo = UniformBuffer::new(ctx)?;
        light_ubo.write(light);
        Ok(Self {
            transforms,
            eye_pos,
            light: light_ubo,
            projection,
        })
    }

    /// Recompute view and projection for `frame` from the camera and the
    /// current viewport, with `world` as the scene transform
    pub fn update(&mut self, frame: usize, camera: &Camera, world: Mat4, viewport: vk::Viewport) {
        let aspect = viewport.width / viewport.height;
        let proj = perspective_vk(
            self.projection.fovy,
            aspect,
            self.projection.near,
            self.projection.far,
        );
        self.transforms.write(
            frame,
            TransformsUbo {
                world,
                view: camera.view_matrix(),
                proj,
            },
        );
        self.eye_pos.write(frame, EyePosUbo::new(camera.eye));
    }

    /// The per-frame transform UBOs
    pub fn transforms(&self) -> &FrameUbos<TransformsUbo> {
        &self.transforms
    }

    /// The per-frame eye position UBOs
    pub fn eye_pos(&self) -> &FrameUbos<EyePosUbo> {
        &self.eye_pos
    }

    /// The shared light UBO
    pub fn light(&self) -> &UniformBuffer<Light> {
        &self.light
    }

    /// Mutable access for samples that animate their light
    pub fn light_mut(&mut self) -> &mut UniformBuffer<Light> {
        &mut self.light
    }
}

/// Device-local vertex and index buffers for one mesh or one arena
pub struct MeshBuffers {
    vertices: VertexBuffer,
    indices: IndexBuffer,
}

impl MeshBuffers {
    /// Upload a single mesh
    pub fn from_mesh(ctx: &VulkanContext, mesh: &Mesh) -> VulkanResult<Self> {
        Ok(Self {
            vertices: VertexBuffer::new(ctx, &mesh.vertices)?,
            indices: IndexBuffer::new(ctx, &mesh.indices)?,
        })
    }

    /// Upload an accumulated arena as one buffer pair
    pub fn from_arena(ctx: &VulkanContext, arena: &MeshAccumulator) -> VulkanResult<Self> {
        Ok(Self {
            vertices: VertexBuffer::new(ctx, arena.vertices())?,
            indices: IndexBuffer::new(ctx, arena.indices())?,
        })
    }

    /// Bind the vertex and index buffers
    pub fn bind(&self, device: &Device, cmd: vk::CommandBuffer) {
        unsafe {
            device.cmd_bind_vertex_buffers(cmd, 0, &[self.vertices.handle()], &[0]);
            device.cmd_bind_index_buffer(cmd, self.indices.handle(), 0, vk::IndexType::UINT32);
        }
    }

    /// Draw everything in the buffers as one instance
    pub fn draw(&self, device: &Device, cmd: vk::CommandBuffer) {
        unsafe {
            device.cmd_draw_indexed(cmd, self.indices.index_count(), 1, 0, 0, 0);
        }
    }

    /// Draw one arena mesh, `instance_count` instances starting at
    /// `first_instance`. Indices are mesh-relative, so `first_vertex` rides
    /// along as the vertex offset.
    pub fn draw_ref(
        &self,
        device: &Device,
        cmd: vk::CommandBuffer,
        mesh_ref: &MeshRef,
        instance_count: u32,
        first_instance: u32,
    ) {
        unsafe {
            device.cmd_draw_indexed(
                cmd,
                mesh_ref.index_count,
                instance_count,
                mesh_ref.first_index,
                mesh_ref.first_vertex as i32,
                first_instance,
            );
        }
    }
}

/// Bind a pipeline with its per-frame descriptor set and the dynamic
/// viewport/scissor state
pub fn bind_pass(
    device: &Device,
    cmd: vk::CommandBuffer,
    pipeline: &Pipeline,
    descriptors: &DescriptorSets,
    frame: usize,
    viewport: vk::Viewport,
    scissor: vk::Rect2D,
) {
    unsafe {
        device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline.handle());
        device.cmd_set_viewport(cmd, 0, &[viewport]);
        device.cmd_set_scissor(cmd, 0, &[scissor]);
        device.cmd_bind_descriptor_sets(
            cmd,
            vk::PipelineBindPoint::GRAPHICS,
            pipeline.layout(),
            0,
            &[descriptors.set(frame)],
            &[],
        );
    }
}

/// One drawable: geometry plus the descriptor sets and pipeline that draw it
pub struct Renderable {
    /// Uploaded geometry
    pub buffers: MeshBuffers,
    /// Per-frame descriptor sets
    pub descriptors: DescriptorSets,
    /// The pass's pipeline
    pub pipeline: Pipeline,
}

impl Renderable {
    /// Bind everything and draw the whole buffer pair
    pub fn record(
        &self,
        device: &Device,
        cmd: vk::CommandBuffer,
        frame: usize,
        viewport: vk::Viewport,
        scissor: vk::Rect2D,
    ) {
        bind_pass(
            device,
            cmd,
            &self.pipeline,
            &self.descriptors,
            frame,
            viewport,
            scissor,
        );
        self.buffers.bind(device, cmd);
        self.buffers.draw(device, cmd);
    }
}

/// Named mesh and texture registries plus shader loading rooted at the
/// configured asset directories. Lookups fail fast with the offending name.
pub struct SampleResources {
    settings: RenderSettings,
    meshes: HashMap<String, Mesh>,
    textures: HashMap<String, Texture>,
}

impl SampleResources {
    /// Create empty registries over `settings`
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            meshes: HashMap::new(),
            textures: HashMap::new(),
        }
    }

    /// The settings the registries resolve paths against
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Register a mesh under its own name
    pub fn add_mesh(&mut self, mesh: Mesh) -> VulkanResult<()> {
        if self.meshes.contains_key(&mesh.name) {
            return Err(VulkanError::Config {
                reason: format!("mesh {:?} is already registered", mesh.name),
            });
        }
        self.meshes.insert(mesh.name.clone(), mesh);
        Ok(())
    }

    /// Load an OBJ model from the asset root and register it
    pub fn load_model(&mut self, file: &str) -> VulkanResult<()> {
        let mesh = crate::assets::load_obj(self.settings.model_path(file))?;
        self.add_mesh(mesh)
    }

    /// Look up a registered mesh
    pub fn mesh(&self, name: &str) -> VulkanResult<&Mesh> {
        self.meshes.get(name).ok_or_else(|| VulkanError::Config {
            reason: format!("no mesh registered as {:?}", name),
        })
    }

    /// Register an already created texture
    pub fn add_texture(&mut self, name: &str, texture: Texture) -> VulkanResult<()> {
        if self.textures.contains_key(name) {
            return Err(VulkanError::Config {
                reason: format!("texture {:?} is already registered", name),
            });
        }
        self.textures.insert(name.to_string(), texture);
        Ok(())
    }

    /// Load a texture file from the asset root and register it under `name`
    pub fn load_texture(&mut self, ctx: &VulkanContext, name: &str, file: &str) -> VulkanResult<()> {
        let texture = Texture::from_file(ctx, self.settings.texture_path(file))?;
        self.add_texture(name, texture)
    }

    /// Look up a registered texture
    pub fn texture(&self, name: &str) -> VulkanResult<&Texture> {
        self.textures.get(name).ok_or_else(|| VulkanError::Config {
            reason: format!("no texture registered as {:?}", name),
        })
    }

    fn shader(&self, device: &Device, file: String) -> VulkanResult<ShaderModule> {
        ShaderModule::from_file(device.clone(), self.settings.shader_path(&file))
    }

    /// Load a compiled vertex shader by base name
    pub fn vertex_shader(&self, device: &Device, name: &str) -> VulkanResult<ShaderModule> {
        self.shader(device, format!("{}.vert.spv", name))
    }

    /// Load a compiled fragment shader by base name
    pub fn fragment_shader(&self, device: &Device, name: &str) -> VulkanResult<ShaderModule> {
        self.shader(device, format!("{}.frag.spv", name))
    }

    /// Load a compiled geometry shader by base name
    pub fn geometry_shader(&self, device: &Device, name: &str) -> VulkanResult<ShaderModule> {
        self.shader(device, format!("{}.geom.spv", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::geo::make_quad;

    #[test]
    fn duplicate_mesh_names_are_rejected() {
        let mut resources = SampleResources::new(RenderSettings::default());
        resources.add_mesh(make_quad(1.0, 1.0, 0)).unwrap();

        let result = resources.add_mesh(make_quad(2.0, 2.0, 0));
        assert!(matches!(result, Err(VulkanError::Config { .. })));
    }

    #[test]
    fn missing_mesh_lookup_names_the_mesh() {
        let resources = SampleResources::new(RenderSettings::default());
        match resources.mesh("skull") {
            Err(VulkanError::Config { reason }) => assert!(reason.contains("skull")),
            _ => panic!("expected Config error"),
        }
    }

    #[test]
    fn registered_mesh_is_returned_by_name() {
        let mut resources = SampleResources::new(RenderSettings::default());
        let quad = make_quad(1.0, 1.0, 0);
        let name = quad.name.clone();
        resources.add_mesh(quad).unwrap();

        let found = resources.mesh(&name).unwrap();
        assert_eq!(found.name, name);
        assert!(!found.vertices.is_empty());
    }

    #[test]
    fn missing_texture_lookup_names_the_texture() {
        let resources = SampleResources::new(RenderSettings::default());
        match resources.texture("uv_checker") {
            Err(VulkanError::Config { reason }) => assert!(reason.contains("uv_checker")),
            _ => panic!("expected Config error"),
        }
    }

    #[test]
    fn standard_projection_uses_a_45_degree_fov() {
        let projection = Projection::standard(0.01, 10.0);
        assert!((projection.fovy - std::f32::consts::FRAC_PI_4).abs() < 1e-6);
        assert_eq!(projection.near, 0.01);
        assert_eq!(projection.far, 10.0);
    }
}
