//! Per-frame-in-flight GPU resources
//!
//! Uniform and storage buffers here are host-visible, host-coherent, and
//! persistently mapped for their whole lifetime: mapped once at creation,
//! unmapped in `Drop`. CPU writes become visible to the GPU without explicit
//! flushes.
//!
//! Synchronization discipline stays with the caller: a frame's buffers may
//! only be rewritten after that frame's fence has signaled. Nothing here
//! enforces it.

use ash::vk;
use bytemuck::Pod;
use std::mem;
use std::ops::{Index, IndexMut};

use crate::render::buffer::Buffer;
use crate::render::context::{VulkanContext, VulkanError, VulkanResult};

/// Number of frames the CPU may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// The frame index the CPU prepares while `frame` is being consumed
pub fn next_frame(frame: usize) -> usize {
    (frame + 1) % MAX_FRAMES_IN_FLIGHT
}

/// A persistently mapped uniform buffer holding one `T`
pub struct UniformBuffer<T: Pod> {
    buffer: Buffer,
    mapped: *mut T,
}

impl<T: Pod> UniformBuffer<T> {
    /// Create and map a uniform buffer sized for one `T`
    pub fn new(ctx: &VulkanContext) -> VulkanResult<Self> {
        let buffer = Buffer::new(
            ctx,
            mem::size_of::<T>() as vk::DeviceSize,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        let mapped = buffer.map_memory()? as *mut T;
        Ok(Self { buffer, mapped })
    }

    /// Write the uniform value through the persistent mapping
    pub fn write(&mut self, value: T) {
        unsafe {
            self.mapped.write(value);
        }
    }

    /// Read the current uniform value back
    pub fn read(&self) -> T {
        unsafe { self.mapped.read() }
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Size of the uniform range in bytes
    pub fn byte_size(&self) -> vk::DeviceSize {
        mem::size_of::<T>() as vk::DeviceSize
    }
}

impl<T: Pod> Drop for UniformBuffer<T> {
    fn drop(&mut self) {
        self.buffer.unmap_memory();
    }
}

/// A persistently mapped storage buffer holding `len` elements of `T`
pub struct StorageBuffer<T: Pod> {
    buffer: Buffer,
    mapped: *mut T,
    len: usize,
}

impl<T: Pod> StorageBuffer<T> {
    /// Create and map a storage buffer for `len` elements
    pub fn new(ctx: &VulkanContext, len: usize) -> VulkanResult<Self> {
        if len == 0 {
            return Err(VulkanError::Config {
                reason: "storage buffer length must be nonzero".to_string(),
            });
        }
        let buffer = Buffer::new(
            ctx,
            (len * mem::size_of::<T>()) as vk::DeviceSize,
            vk::BufferUsageFlags::STORAGE_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        let mapped = buffer.map_memory()? as *mut T;
        Ok(Self {
            buffer,
            mapped,
            len,
        })
    }

    /// View the mapped elements as a mutable slice
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.mapped, self.len) }
    }

    /// View the mapped elements as a slice
    pub fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.mapped, self.len) }
    }

    /// Element count
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds zero elements (never true once constructed)
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Size of the storage range in bytes
    pub fn byte_size(&self) -> vk::DeviceSize {
        self.buffer.size()
    }
}

impl<T: Pod> Drop for StorageBuffer<T> {
    fn drop(&mut self) {
        self.buffer.unmap_memory();
    }
}

/// One independently mapped uniform buffer per frame in flight.
///
/// Each frame owns a distinct buffer, so writing frame N never aliases the
/// buffer frame N-1's command buffer still reads.
pub struct FrameUbos<T: Pod> {
    buffers: [UniformBuffer<T>; MAX_FRAMES_IN_FLIGHT],
}

impl<T: Pod> FrameUbos<T> {
    /// Create one uniform buffer per frame in flight
    pub fn new(ctx: &VulkanContext) -> VulkanResult<Self> {
        let mut buffers = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            buffers.push(UniformBuffer::new(ctx)?);
        }
        let buffers = buffers.try_into().map_err(|_| {
            VulkanError::InitializationFailed("frame uniform buffer count mismatch".to_string())
        })?;
        Ok(Self { buffers })
    }

    /// Create the per-frame buffers with every frame initialized to `value`
    pub fn new_with(ctx: &VulkanContext, value: T) -> VulkanResult<Self> {
        let mut ubos = Self::new(ctx)?;
        for frame in 0..MAX_FRAMES_IN_FLIGHT {
            ubos.buffers[frame].write(value);
        }
        Ok(ubos)
    }

    /// Write `value` into one frame's buffer
    pub fn write(&mut self, frame: usize, value: T) {
        self.buffers[frame].write(value);
    }

    /// The per-frame buffers in frame order
    pub fn buffers(&self) -> &[UniformBuffer<T>; MAX_FRAMES_IN_FLIGHT] {
        &self.buffers
    }
}

impl<T: Pod> Index<usize> for FrameUbos<T> {
    type Output = UniformBuffer<T>;

    fn index(&self, frame: usize) -> &Self::Output {
        &self.buffers[frame]
    }
}

impl<T: Pod> IndexMut<usize> for FrameUbos<T> {
    fn index_mut(&mut self, frame: usize) -> &mut Self::Output {
        &mut self.buffers[frame]
    }
}

/// One independently mapped storage buffer per frame in flight
pub struct FrameStorage<T: Pod> {
    buffers: [StorageBuffer<T>; MAX_FRAMES_IN_FLIGHT],
}

impl<T: Pod> FrameStorage<T> {
    /// Create one storage buffer of `len` elements per frame in flight
    pub fn new(ctx: &VulkanContext, len: usize) -> VulkanResult<Self> {
        let mut buffers = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            buffers.push(StorageBuffer::new(ctx, len)?);
        }
        let buffers = buffers.try_into().map_err(|_| {
            VulkanError::InitializationFailed("frame storage buffer count mismatch".to_string())
        })?;
        Ok(Self { buffers })
    }

    /// The per-frame buffers in frame order
    pub fn buffers(&self) -> &[StorageBuffer<T>; MAX_FRAMES_IN_FLIGHT] {
        &self.buffers
    }
}

impl<T: Pod> Index<usize> for FrameStorage<T> {
    type Output = StorageBuffer<T>;

    fn index(&self, frame: usize) -> &Self::Output {
        &self.buffers[frame]
    }
}

impl<T: Pod> IndexMut<usize> for FrameStorage<T> {
    fn index_mut(&mut self, frame: usize) -> &mut Self::Output {
        &mut self.buffers[frame]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_frame_cycles_through_all_frames() {
        let mut frame = 0;
        let mut seen = [false; MAX_FRAMES_IN_FLIGHT];
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            seen[frame] = true;
            frame = next_frame(frame);
        }
        assert_eq!(frame, 0);
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn next_frame_never_returns_its_input() {
        for frame in 0..MAX_FRAMES_IN_FLIGHT {
            assert_ne!(next_frame(frame), frame);
        }
    }
}
