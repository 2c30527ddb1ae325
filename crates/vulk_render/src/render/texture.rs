//! Sampled textures uploaded through a staging buffer

use ash::{vk, Device};
use std::path::Path;

use crate::render::buffer::Buffer;
use crate::render::context::{VulkanContext, VulkanError, VulkanResult};

/// Texture sampler with RAII cleanup
pub struct Sampler {
    device: Device,
    sampler: vk::Sampler,
}

impl Sampler {
    /// Take ownership of a sampler handle
    pub(crate) fn from_raw(device: Device, sampler: vk::Sampler) -> Self {
        Self { device, sampler }
    }

    /// Get the sampler handle
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
        }
    }
}

/// A sampled 2D texture: image, memory, view, and sampler with RAII cleanup
pub struct Texture {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    image_view: vk::ImageView,
    sampler: Sampler,
    extent: vk::Extent2D,
}

impl Texture {
    /// Load an image file and upload it as an RGBA8 texture
    pub fn from_file<P: AsRef<Path>>(ctx: &VulkanContext, path: P) -> VulkanResult<Self> {
        let image = image::open(&path)
            .map_err(|e| {
                VulkanError::Asset(format!(
                    "failed to load texture {}: {}",
                    path.as_ref().display(),
                    e
                ))
            })?
            .to_rgba8();
        let (width, height) = image.dimensions();
        log::debug!(
            "[TEXTURE] Loaded {} ({}x{})",
            path.as_ref().display(),
            width,
            height
        );
        Self::from_pixels(ctx, &image.into_raw(), width, height)
    }

    /// Create a 1x1 solid color texture
    pub fn solid_color(ctx: &VulkanContext, color: [u8; 4]) -> VulkanResult<Self> {
        Self::from_pixels(ctx, &color, 1, 1)
    }

    /// Upload tightly packed RGBA8 pixels as a sampled texture
    pub fn from_pixels(
        ctx: &VulkanContext,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> VulkanResult<Self> {
        let expected = (width * height * 4) as usize;
        if pixels.len() != expected {
            return Err(VulkanError::Config {
                reason: format!(
                    "texture data is {} bytes, expected {} for {}x{} RGBA8",
                    pixels.len(),
                    expected,
                    width,
                    height
                ),
            });
        }

        let extent = vk::Extent2D { width, height };
        let format = vk::Format::R8G8B8A8_UNORM;

        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe {
            ctx.device
                .create_image(&image_info, None)
                .map_err(VulkanError::Api)?
        };

        let mem_requirements = unsafe { ctx.device.get_image_memory_requirements(image) };
        let memory_type_index = match ctx.find_memory_type(
            mem_requirements.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ) {
            Ok(index) => index,
            Err(e) => {
                unsafe { ctx.device.destroy_image(image, None) };
                return Err(e);
            }
        };

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(mem_requirements.size)
            .memory_type_index(memory_type_index);

        let memory = unsafe {
            match ctx.device.allocate_memory(&alloc_info, None) {
                Ok(memory) => memory,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(VulkanError::Api(e));
                }
            }
        };

        unsafe {
            if let Err(e) = ctx.device.bind_image_memory(image, memory, 0) {
                ctx.device.destroy_image(image, None);
                ctx.device.free_memory(memory, None);
                return Err(VulkanError::Api(e));
            }
        }

        let staging = Buffer::new(
            ctx,
            pixels.len() as vk::DeviceSize,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        staging.write_data(pixels)?;

        ctx.one_time_commands(|device, cmd| {
            transition_layout(
                device,
                cmd,
                image,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            );

            let region = vk::BufferImageCopy::builder()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(
                    vk::ImageSubresourceLayers::builder()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .mip_level(0)
                        .base_array_layer(0)
                        .layer_count(1)
                        .build(),
                )
                .image_extent(vk::Extent3D {
                    width,
                    height,
                    depth: 1,
                })
                .build();

            unsafe {
                device.cmd_copy_buffer_to_image(
                    cmd,
                    staging.handle(),
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
            }

            transition_layout(
                device,
                cmd,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );
        })?;

        let image_view = ctx.create_image_view(image, format, vk::ImageAspectFlags::COLOR)?;
        let sampler = ctx.create_texture_sampler()?;

        Ok(Self {
            device: ctx.device.clone(),
            image,
            memory,
            image_view,
            sampler,
            extent,
        })
    }

    /// Get the shader-visible image view
    pub fn image_view(&self) -> vk::ImageView {
        self.image_view
    }

    /// Get the sampler handle
    pub fn sampler(&self) -> vk::Sampler {
        self.sampler.handle()
    }

    /// Texture dimensions
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image_view(self.image_view, None);
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

fn transition_layout(
    device: &Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) {
    let (src_access, dst_access, src_stage, dst_stage) = match (old_layout, new_layout) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => (
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        _ => (
            vk::AccessFlags::empty(),
            vk::AccessFlags::empty(),
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        ),
    };

    let barrier = vk::ImageMemoryBarrier::builder()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(
            vk::ImageSubresourceRange::builder()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1)
                .build(),
        )
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
        .build();

    unsafe {
        device.cmd_pipeline_barrier(
            cmd,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}
