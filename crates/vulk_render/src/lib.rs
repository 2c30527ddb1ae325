//! # vulk_render
//!
//! A set of Vulkan rendering samples built on a small builder layer:
//! descriptor set layouts, pools and updaters as inspectable plain data,
//! persistently mapped per-frame buffers, a mesh arena for single-upload
//! geometry, and multi-pass stencil techniques (outline, mirror reflection,
//! planar shadow).
//!
//! The crate does not own a window or swapchain. A host shell supplies a
//! [`render::VulkanContext`] and drives any [`samples::Sample`]:
//!
//! ```rust,no_run
//! use vulk_render::config::RenderSettings;
//! use vulk_render::samples::{Sample, SampleResources, Scene};
//!
//! # fn run(ctx: &vulk_render::render::VulkanContext,
//! #        cmd: ash::vk::CommandBuffer,
//! #        frame: usize,
//! #        viewport: ash::vk::Viewport,
//! #        scissor: ash::vk::Rect2D) -> vulk_render::render::VulkanResult<()> {
//! let resources = SampleResources::new(RenderSettings::load("settings.toml")?);
//! let mut scene = Scene::new(ctx, &resources)?;
//!
//! // Per frame, after the frame's fence has signaled:
//! scene.update(frame, 0.0, viewport)?;
//! scene.render(cmd, frame, viewport, scissor)?;
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod config;
pub mod foundation;
pub mod render;
pub mod samples;
