//! Vulkan error types and the borrowed-device context
//!
//! The context bundles the handles a host shell creates during startup
//! (instance, device, queue, command pool, render pass). The shell keeps
//! ownership and tears them down after waiting for device idle; nothing here
//! destroys them.

use ash::{vk, Device, Instance};
use thiserror::Error;

use crate::render::texture::Sampler;

/// Errors that can occur during Vulkan operations
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// A descriptor binding index was registered twice in one layout
    #[error("Duplicate descriptor binding: {binding}")]
    DuplicateBinding {
        /// The binding index that was already registered
        binding: u32,
    },

    /// Caller supplied an invalid configuration
    #[error("Invalid configuration: {reason}")]
    Config {
        /// Description of what was invalid
        reason: String,
    },

    /// Initialization of a resource failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// No memory type satisfies the requested properties
    #[error("No suitable memory type found")]
    NoSuitableMemoryType,

    /// An asset file could not be read or decoded
    #[error("Asset error: {0}")]
    Asset(String),
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

/// Handles borrowed from the host shell's device stack.
///
/// All resource creation in this crate goes through a `VulkanContext`. Every
/// creation failure is fatal and surfaces as a [`VulkanError`]; there are no
/// retry paths.
#[derive(Clone)]
pub struct VulkanContext {
    /// Vulkan instance, used for physical device queries
    pub instance: Instance,
    /// Logical device
    pub device: Device,
    /// Physical device backing the logical device
    pub physical_device: vk::PhysicalDevice,
    /// Queue used for graphics and transfer submissions
    pub graphics_queue: vk::Queue,
    /// Command pool for transient transfer command buffers
    pub command_pool: vk::CommandPool,
    /// Render pass the sample pipelines are built against
    pub render_pass: vk::RenderPass,
}

impl VulkanContext {
    /// Wrap handles owned by the host shell.
    pub fn from_parts(
        instance: Instance,
        device: Device,
        physical_device: vk::PhysicalDevice,
        graphics_queue: vk::Queue,
        command_pool: vk::CommandPool,
        render_pass: vk::RenderPass,
    ) -> Self {
        Self {
            instance,
            device,
            physical_device,
            graphics_queue,
            command_pool,
            render_pass,
        }
    }

    /// Find a memory type matching `type_filter` with all `properties` set.
    pub fn find_memory_type(
        &self,
        type_filter: u32,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<u32> {
        let mem_properties = unsafe {
            self.instance
                .get_physical_device_memory_properties(self.physical_device)
        };

        for i in 0..mem_properties.memory_type_count {
            if (type_filter & (1 << i)) != 0
                && (mem_properties.memory_types[i as usize].property_flags & properties)
                    == properties
            {
                return Ok(i);
            }
        }

        Err(VulkanError::NoSuitableMemoryType)
    }

    /// Record and synchronously submit a one-shot command buffer.
    ///
    /// Used for staging copies and image layout transitions during setup.
    pub fn one_time_commands<F>(&self, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&Device, vk::CommandBuffer),
    {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffer = unsafe {
            self.device
                .allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::Api)?[0]
        };

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        let result = unsafe {
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(VulkanError::Api)
                .and_then(|()| {
                    record(&self.device, command_buffer);
                    self.device
                        .end_command_buffer(command_buffer)
                        .map_err(VulkanError::Api)
                })
                .and_then(|()| {
                    let buffers = [command_buffer];
                    let submit_info = vk::SubmitInfo::builder().command_buffers(&buffers).build();
                    self.device
                        .queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
                        .map_err(VulkanError::Api)
                })
                .and_then(|()| {
                    self.device
                        .queue_wait_idle(self.graphics_queue)
                        .map_err(VulkanError::Api)
                })
        };

        unsafe {
            self.device
                .free_command_buffers(self.command_pool, &[command_buffer]);
        }

        result
    }

    /// Create a 2D image view for `image`.
    pub fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        aspect_mask: vk::ImageAspectFlags,
    ) -> VulkanResult<vk::ImageView> {
        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(
                vk::ImageSubresourceRange::builder()
                    .aspect_mask(aspect_mask)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1)
                    .build(),
            );

        unsafe {
            self.device
                .create_image_view(&view_info, None)
                .map_err(VulkanError::Api)
        }
    }

    /// Create the standard texture sampler: linear filtering, repeat
    /// addressing, no anisotropy or mipmaps.
    pub fn create_texture_sampler(&self) -> VulkanResult<Sampler> {
        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(false)
            .max_anisotropy(1.0)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .min_lod(0.0)
            .max_lod(0.0);

        let sampler = unsafe {
            self.device
                .create_sampler(&sampler_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Sampler::from_raw(self.device.clone(), sampler))
    }
}
