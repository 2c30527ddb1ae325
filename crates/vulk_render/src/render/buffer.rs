//! Buffer management for vertex, index and staging data
//!
//! Memory management following RAII patterns with proper allocation and cleanup

use ash::{vk, Device};
use bytemuck::Pod;
use std::mem;

use crate::render::context::{VulkanContext, VulkanError, VulkanResult};

/// Buffer wrapper with memory management
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a new buffer with memory allocation
    pub fn new(
        ctx: &VulkanContext,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            ctx.device
                .create_buffer(&buffer_info, None)
                .map_err(VulkanError::Api)?
        };

        let mem_requirements = unsafe { ctx.device.get_buffer_memory_requirements(buffer) };

        let memory_type_index =
            match ctx.find_memory_type(mem_requirements.memory_type_bits, properties) {
                Ok(index) => index,
                Err(e) => {
                    unsafe { ctx.device.destroy_buffer(buffer, None) };
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
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(VulkanError::Api(e));
                }
            }
        };

        unsafe {
            if let Err(e) = ctx.device.bind_buffer_memory(buffer, memory, 0) {
                ctx.device.destroy_buffer(buffer, None);
                ctx.device.free_memory(memory, None);
                return Err(VulkanError::Api(e));
            }
        }

        Ok(Self {
            device: ctx.device.clone(),
            buffer,
            memory,
            size,
        })
    }

    /// Map the whole buffer for writing. Host-visible memory only.
    pub fn map_memory(&self) -> VulkanResult<*mut std::ffi::c_void> {
        unsafe {
            self.device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)
        }
    }

    /// Unmap previously mapped memory
    pub fn unmap_memory(&self) {
        unsafe {
            self.device.unmap_memory(self.memory);
        }
    }

    /// Write a slice into the buffer via a transient mapping
    pub fn write_data<T: Pod>(&self, data: &[T]) -> VulkanResult<()> {
        let data_ptr = self.map_memory()?;

        unsafe {
            let src_ptr = data.as_ptr() as *const std::ffi::c_void;
            let size = mem::size_of_val(data);
            std::ptr::copy_nonoverlapping(src_ptr, data_ptr, size);
        }

        self.unmap_memory();
        Ok(())
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Get size in bytes
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Create a device-local buffer initialized from `data` via a staging copy.
pub fn device_local_from_slice<T: Pod>(
    ctx: &VulkanContext,
    data: &[T],
    usage: vk::BufferUsageFlags,
) -> VulkanResult<Buffer> {
    let size = mem::size_of_val(data) as vk::DeviceSize;

    let staging = Buffer::new(
        ctx,
        size,
        vk::BufferUsageFlags::TRANSFER_SRC,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )?;
    staging.write_data(data)?;

    let buffer = Buffer::new(
        ctx,
        size,
        usage | vk::BufferUsageFlags::TRANSFER_DST,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )?;

    ctx.one_time_commands(|device, cmd| {
        let region = vk::BufferCopy::builder().size(size).build();
        unsafe {
            device.cmd_copy_buffer(cmd, staging.handle(), buffer.handle(), &[region]);
        }
    })?;

    Ok(buffer)
}

/// Vertex buffer for vertex data.
///
/// `new` uploads to device-local memory; `new_host_visible` keeps the buffer
/// CPU-writable for per-frame geometry updates (waves animation).
pub struct VertexBuffer {
    buffer: Buffer,
    vertex_count: u32,
}

impl VertexBuffer {
    /// Create a device-local vertex buffer with staged upload
    pub fn new<T: Pod>(ctx: &VulkanContext, vertices: &[T]) -> VulkanResult<Self> {
        let buffer = device_local_from_slice(ctx, vertices, vk::BufferUsageFlags::VERTEX_BUFFER)?;
        Ok(Self {
            buffer,
            vertex_count: vertices.len() as u32,
        })
    }

    /// Create a host-visible vertex buffer that can be rewritten each frame
    pub fn new_host_visible<T: Pod>(ctx: &VulkanContext, vertices: &[T]) -> VulkanResult<Self> {
        let size = mem::size_of_val(vertices) as vk::DeviceSize;
        let buffer = Buffer::new(
            ctx,
            size,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        buffer.write_data(vertices)?;
        Ok(Self {
            buffer,
            vertex_count: vertices.len() as u32,
        })
    }

    /// Overwrite the buffer contents. Host-visible buffers only; the caller
    /// must ensure no in-flight frame is still reading this buffer.
    pub fn update<T: Pod>(&self, vertices: &[T]) -> VulkanResult<()> {
        self.buffer.write_data(vertices)
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}

/// Index buffer for u32 index data
pub struct IndexBuffer {
    buffer: Buffer,
    index_count: u32,
}

impl IndexBuffer {
    /// Create a device-local index buffer with staged upload
    pub fn new(ctx: &VulkanContext, indices: &[u32]) -> VulkanResult<Self> {
        let buffer = device_local_from_slice(ctx, indices, vk::BufferUsageFlags::INDEX_BUFFER)?;
        Ok(Self {
            buffer,
            index_count: indices.len() as u32,
        })
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Get index count
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
