//! Vulkan resource wrappers and builders
//!
//! Everything here follows the same shape: a plain-data builder that can be
//! inspected and tested without a device, and an RAII wrapper that owns one
//! native handle plus the `ash::Device` clone that destroys it.

pub mod actor;
pub mod bindings;
pub mod buffer;
pub mod camera;
pub mod context;
pub mod descriptor;
pub mod frame;
pub mod geo;
pub mod lighting;
pub mod mesh;
pub mod pipeline;
pub mod shader;
pub mod texture;
pub mod ubo;

pub use context::{VulkanContext, VulkanError, VulkanResult};
pub use frame::{next_frame, MAX_FRAMES_IN_FLIGHT};
