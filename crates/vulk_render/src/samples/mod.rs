//! The sample scenes
//!
//! Each sample implements [`common::Sample`]: a host shell constructs it with
//! a [`common::SampleResources`] registry, calls `update` once the frame's
//! fence signals, and `render` to record into that frame's command buffer.

pub mod blending;
pub mod common;
pub mod land_and_waves;
pub mod lighting;
pub mod mirror_world;
pub mod outline_world;
pub mod planar_shadow;
pub mod scene;
pub mod technique;
pub mod textured_scene;

pub use blending::Blending;
pub use common::{Projection, Renderable, Sample, SampleResources, SceneUbos};
pub use land_and_waves::LandAndWaves;
pub use lighting::Lighting;
pub use mirror_world::{MirrorPass, MirrorWorld};
pub use outline_world::OutlineWorld;
pub use planar_shadow::PlanarShadowWorld;
pub use scene::Scene;
pub use textured_scene::TexturedScene;
