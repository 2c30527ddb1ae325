//! A spinning arrangement of triangles and quads drawn from one arena
//!
//! All meshes share a single vertex/index buffer pair, and all actors live in
//! one per-frame storage buffer. Each mesh group is a single instanced draw
//! with the arena offsets from its `MeshRef`.

use ash::{vk, Device};

use crate::foundation::math::{perspective_vk, Mat4, Vec3};
use crate::render::actor::{Actor, InstanceXform};
use crate::render::bindings::ShaderBinding;
use crate::render::camera::Camera;
use crate::render::context::{VulkanContext, VulkanResult};
use crate::render::descriptor::{DescriptorSets, DescriptorSetsBuilder};
use crate::render::frame::{FrameStorage, FrameUbos, MAX_FRAMES_IN_FLIGHT};
use crate::render::geo::{make_equilateral_triangle, make_quad};
use crate::render::mesh::{MeshAccumulator, MeshRef};
use crate::render::pipeline::{Pipeline, PipelineBuilder};
use crate::render::texture::Texture;
use crate::render::ubo::TransformsUbo;

use super::common::{bind_pass, MeshBuffers, Sample, SampleResources};

/// One instanced draw: an arena mesh and its slice of the actors buffer
struct ActorGroup {
    mesh_ref: MeshRef,
    first_instance: u32,
    count: u32,
}

/// Pack actor sets into contiguous runs of one instance buffer, one
/// `ActorGroup` per mesh
fn group_actors(sets: &[(MeshRef, &[Actor])]) -> (Vec<ActorGroup>, Vec<InstanceXform>) {
    let mut groups = Vec::new();
    let mut xforms = Vec::new();
    for (mesh_ref, actors) in sets {
        groups.push(ActorGroup {
            mesh_ref: mesh_ref.clone(),
            first_instance: xforms.len() as u32,
            count: actors.len() as u32,
        });
        xforms.extend(actors.iter().map(|a| InstanceXform::new(a.transform)));
    }
    (groups, xforms)
}

/// The first sample: unlit instanced geometry rotating about the Z axis
pub struct Scene {
    device: Device,
    camera: Camera,
    transforms: FrameUbos<TransformsUbo>,
    _actors: FrameStorage<InstanceXform>,
    buffers: MeshBuffers,
    groups: Vec<ActorGroup>,
    descriptors: DescriptorSets,
    pipeline: Pipeline,
    _texture: Texture,
}

impl Scene {
    /// Build the arena, the actor buffer, and the single pipeline
    pub fn new(ctx: &VulkanContext, resources: &SampleResources) -> VulkanResult<Self> {
        let mut camera = Camera::default();
        camera.look_at(Vec3::new(0.0, 0.0, 2.0), Vec3::zeros());

        let tri = make_equilateral_triangle(1.0, 1);
        let quad = make_quad(1.0, 0.5, 0);

        let mut arena = MeshAccumulator::new();
        let quad_ref = arena.append_mesh(&quad);
        let tri_ref = arena.append_mesh(&tri);
        let buffers = MeshBuffers::from_arena(ctx, &arena)?;

        let quad_actors = [
            Actor::new(
                "quad1",
                quad_ref.clone(),
                Mat4::new_translation(&Vec3::new(0.0, 0.5, 0.0)),
            ),
            Actor::new(
                "quad0",
                quad_ref.clone(),
                Mat4::new_translation(&Vec3::new(0.0, -0.1, 0.0)),
            ),
        ];
        let tri_actors = [
            Actor::new(
                "tri1",
                tri_ref.clone(),
                Mat4::new_translation(&Vec3::new(0.5, 0.0, 0.0)),
            ),
            Actor::new(
                "tri0",
                tri_ref.clone(),
                Mat4::new_translation(&Vec3::new(-0.1, 0.0, 0.0)),
            ),
        ];

        let (groups, xforms) =
            group_actors(&[(quad_ref, &quad_actors[..]), (tri_ref, &tri_actors[..])]);

        // Static actors, so both frames get the same contents once
        let mut actor_buffers = FrameStorage::new(ctx, xforms.len())?;
        for frame in 0..MAX_FRAMES_IN_FLIGHT {
            actor_buffers[frame].as_mut_slice().copy_from_slice(&xforms);
        }

        let transforms = FrameUbos::new_with(ctx, TransformsUbo::identity())?;
        let texture = Texture::solid_color(ctx, [255, 255, 255, 255])?;

        let descriptors = DescriptorSetsBuilder::new()
            .add_uniform_buffers(
                &transforms,
                vk::ShaderStageFlags::VERTEX,
                ShaderBinding::XformsUbo,
            )?
            .add_storage_buffers(
                &actor_buffers,
                vk::ShaderStageFlags::VERTEX,
                ShaderBinding::Actors,
            )?
            .add_image_sampler(
                texture.image_view(),
                texture.sampler(),
                vk::ShaderStageFlags::FRAGMENT,
                ShaderBinding::TextureSampler,
            )?
            .build(ctx)?;

        let pipeline = PipelineBuilder::new()
            .vertex_shader(resources.vertex_shader(&ctx.device, "instance")?)
            .fragment_shader(resources.fragment_shader(&ctx.device, "model")?)
            .add_standard_vertex_input(0)
            .build(ctx, descriptors.layout())?;

        Ok(Self {
            device: ctx.device.clone(),
            camera,
            transforms,
            _actors: actor_buffers,
            buffers,
            groups,
            descriptors,
            pipeline,
            _texture: texture,
        })
    }
}

impl Sample for Scene {
    fn update(&mut self, frame: usize, time: f32, viewport: vk::Viewport) -> VulkanResult<()> {
        let world =
            nalgebra::Rotation3::from_axis_angle(&Vec3::z_axis(), time * 90f32.to_radians())
                .to_homogeneous();
        let aspect = viewport.width / viewport.height;
        self.transforms.write(
            frame,
            TransformsUbo {
                world,
                view: self.camera.view_matrix(),
                proj: perspective_vk(45f32.to_radians(), aspect, 0.1, 10.0),
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
        bind_pass(
            &self.device,
            cmd,
            &self.pipeline,
            &self.descriptors,
            frame,
            viewport,
            scissor,
        );
        self.buffers.bind(&self.device, cmd);
        for group in &self.groups {
            self.buffers.draw_ref(
                &self.device,
                cmd,
                &group.mesh_ref,
                group.count,
                group.first_instance,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actors_pack_into_contiguous_group_slices() {
        let mut arena = MeshAccumulator::new();
        let quad_ref = arena.append_mesh(&make_quad(1.0, 0.5, 0));
        let tri_ref = arena.append_mesh(&make_equilateral_triangle(1.0, 1));

        let quad_actors = [
            Actor::new(
                "quad1",
                quad_ref.clone(),
                Mat4::new_translation(&Vec3::new(0.0, 0.5, 0.0)),
            ),
            Actor::new(
                "quad0",
                quad_ref.clone(),
                Mat4::new_translation(&Vec3::new(0.0, -0.1, 0.0)),
            ),
        ];
        let tri_actors = [Actor::new(
            "tri0",
            tri_ref.clone(),
            Mat4::new_translation(&Vec3::new(0.5, 0.0, 0.0)),
        )];

        let (groups, xforms) =
            group_actors(&[(quad_ref.clone(), &quad_actors[..]), (tri_ref, &tri_actors[..])]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].first_instance, 0);
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[1].first_instance, 2);
        assert_eq!(groups[1].count, 1);
        assert_eq!(xforms.len(), 3);
        assert_eq!(groups[0].mesh_ref.name, quad_ref.name);

        // Each group's slice of the packed buffer is its actors in order
        let quad_slice = &xforms[..groups[0].count as usize];
        assert_eq!(quad_slice[0].world, quad_actors[0].transform);
        assert_eq!(quad_slice[1].world, quad_actors[1].transform);
        let tri_slice = &xforms[groups[1].first_instance as usize..];
        assert_eq!(tri_slice[0].world, tri_actors[0].transform);
    }
}
