//! Descriptor set layouts, pools and per-frame set population
//!
//! Builders are consumed by `build`, so a configured builder cannot be
//! reused. Layout construction rejects duplicate binding indices before any
//! device call is made, which keeps the checks unit-testable.

use ash::{vk, Device};
use bytemuck::Pod;

use crate::render::bindings::ShaderBinding;
use crate::render::context::{VulkanContext, VulkanError, VulkanResult};
use crate::render::frame::{FrameStorage, FrameUbos, StorageBuffer, UniformBuffer, MAX_FRAMES_IN_FLIGHT};

/// Descriptor set layout builder for creating reusable layouts
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayoutBuilder {
    /// Create a new descriptor set layout builder
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    fn add_binding(
        mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        stage_flags: vk::ShaderStageFlags,
    ) -> VulkanResult<Self> {
        if self.bindings.iter().any(|b| b.binding == binding) {
            return Err(VulkanError::DuplicateBinding { binding });
        }
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding)
                .descriptor_type(descriptor_type)
                .descriptor_count(1)
                .stage_flags(stage_flags)
                .build(),
        );
        Ok(self)
    }

    /// Add a uniform buffer binding
    pub fn add_uniform_buffer(
        self,
        binding: ShaderBinding,
        stage_flags: vk::ShaderStageFlags,
    ) -> VulkanResult<Self> {
        self.add_binding(
            binding.index(),
            vk::DescriptorType::UNIFORM_BUFFER,
            stage_flags,
        )
    }

    /// Add a storage buffer binding
    pub fn add_storage_buffer(
        self,
        binding: ShaderBinding,
        stage_flags: vk::ShaderStageFlags,
    ) -> VulkanResult<Self> {
        self.add_binding(
            binding.index(),
            vk::DescriptorType::STORAGE_BUFFER,
            stage_flags,
        )
    }

    /// Add a combined image sampler binding
    pub fn add_combined_image_sampler(
        self,
        binding: ShaderBinding,
        stage_flags: vk::ShaderStageFlags,
    ) -> VulkanResult<Self> {
        self.add_binding(
            binding.index(),
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            stage_flags,
        )
    }

    /// The bindings accumulated so far
    pub fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding] {
        &self.bindings
    }

    /// Build the descriptor set layout
    pub fn build(self, device: &Device) -> VulkanResult<DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&self.bindings);

        let layout = unsafe { device.create_descriptor_set_layout(&layout_info, None) }
            .map_err(VulkanError::Api)?;

        log::debug!(
            "[DESCRIPTOR] Created set layout with {} bindings",
            self.bindings.len()
        );

        Ok(DescriptorSetLayout {
            layout,
            device: device.clone(),
            bindings: self.bindings,
        })
    }
}

impl Default for DescriptorSetLayoutBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptor set layout wrapper with automatic cleanup
pub struct DescriptorSetLayout {
    layout: vk::DescriptorSetLayout,
    device: Device,
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayout {
    /// Get the Vulkan descriptor set layout handle
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    /// Get the bindings used in this layout
    pub fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding] {
        &self.bindings
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Descriptor pool builder accumulating per-type capacity.
///
/// Repeated calls for the same descriptor type are additive: callers size the
/// pool by summing what each set they plan to allocate will consume.
pub struct DescriptorPoolBuilder {
    uniform_buffer_count: u32,
    storage_buffer_count: u32,
    combined_image_sampler_count: u32,
}

impl DescriptorPoolBuilder {
    /// Create an empty pool builder
    pub fn new() -> Self {
        Self {
            uniform_buffer_count: 0,
            storage_buffer_count: 0,
            combined_image_sampler_count: 0,
        }
    }

    /// Reserve capacity for `count` more uniform buffer descriptors
    pub fn add_uniform_buffer_count(mut self, count: u32) -> Self {
        self.uniform_buffer_count += count;
        self
    }

    /// Reserve capacity for `count` more storage buffer descriptors
    pub fn add_storage_buffer_count(mut self, count: u32) -> Self {
        self.storage_buffer_count += count;
        self
    }

    /// Reserve capacity for `count` more combined image sampler descriptors
    pub fn add_combined_image_sampler_count(mut self, count: u32) -> Self {
        self.combined_image_sampler_count += count;
        self
    }

    /// Accumulated uniform buffer capacity
    pub fn uniform_buffer_count(&self) -> u32 {
        self.uniform_buffer_count
    }

    /// Accumulated storage buffer capacity
    pub fn storage_buffer_count(&self) -> u32 {
        self.storage_buffer_count
    }

    /// Accumulated combined image sampler capacity
    pub fn combined_image_sampler_count(&self) -> u32 {
        self.combined_image_sampler_count
    }

    /// Build a pool sized for the accumulated counts and `max_sets` sets
    pub fn build(self, device: &Device, max_sets: u32) -> VulkanResult<DescriptorPool> {
        let mut pool_sizes = Vec::new();
        if self.uniform_buffer_count > 0 {
            pool_sizes.push(
                vk::DescriptorPoolSize::builder()
                    .ty(vk::DescriptorType::UNIFORM_BUFFER)
                    .descriptor_count(self.uniform_buffer_count)
                    .build(),
            );
        }
        if self.storage_buffer_count > 0 {
            pool_sizes.push(
                vk::DescriptorPoolSize::builder()
                    .ty(vk::DescriptorType::STORAGE_BUFFER)
                    .descriptor_count(self.storage_buffer_count)
                    .build(),
            );
        }
        if self.combined_image_sampler_count > 0 {
            pool_sizes.push(
                vk::DescriptorPoolSize::builder()
                    .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .descriptor_count(self.combined_image_sampler_count)
                    .build(),
            );
        }

        if pool_sizes.is_empty() {
            return Err(VulkanError::Config {
                reason: "descriptor pool has no reserved capacity".to_string(),
            });
        }

        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(max_sets)
            .pool_sizes(&pool_sizes);

        let pool =
            unsafe { device.create_descriptor_pool(&pool_info, None) }.map_err(VulkanError::Api)?;

        log::debug!(
            "[DESCRIPTOR] Created pool: {} sets, {} ubo / {} ssbo / {} sampler descriptors",
            max_sets,
            self.uniform_buffer_count,
            self.storage_buffer_count,
            self.combined_image_sampler_count
        );

        Ok(DescriptorPool {
            pool,
            device: device.clone(),
        })
    }
}

impl Default for DescriptorPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptor pool for allocating descriptor sets
pub struct DescriptorPool {
    pool: vk::DescriptorPool,
    device: Device,
}

impl DescriptorPool {
    /// Allocate one descriptor set per layout handle.
    ///
    /// Exhausting the reserved capacity is fatal and surfaces as the native
    /// error code; nothing grows or retries.
    pub fn allocate(
        &self,
        layouts: &[vk::DescriptorSetLayout],
    ) -> VulkanResult<Vec<vk::DescriptorSet>> {
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);

        unsafe { self.device.allocate_descriptor_sets(&alloc_info) }.map_err(VulkanError::Api)
    }

    /// Get the pool handle
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

/// Batches descriptor writes for one allocated set and flushes them in a
/// single update call.
///
/// Buffer and image infos are boxed so the pointers staged into each write
/// stay valid while more writes accumulate.
pub struct DescriptorSetUpdater {
    set: vk::DescriptorSet,
    writes: Vec<vk::WriteDescriptorSet>,
    buffer_infos: Vec<Box<vk::DescriptorBufferInfo>>,
    image_infos: Vec<Box<vk::DescriptorImageInfo>>,
}

impl DescriptorSetUpdater {
    /// Start an update batch for `set`
    pub fn new(set: vk::DescriptorSet) -> Self {
        Self {
            set,
            writes: Vec::new(),
            buffer_infos: Vec::new(),
            image_infos: Vec::new(),
        }
    }

    fn add_buffer(
        mut self,
        buffer: vk::Buffer,
        range: vk::DeviceSize,
        descriptor_type: vk::DescriptorType,
        binding: ShaderBinding,
    ) -> Self {
        let info = Box::new(
            vk::DescriptorBufferInfo::builder()
                .buffer(buffer)
                .offset(0)
                .range(range)
                .build(),
        );

        let write = vk::WriteDescriptorSet::builder()
            .dst_set(self.set)
            .dst_binding(binding.index())
            .dst_array_element(0)
            .descriptor_type(descriptor_type)
            .buffer_info(std::slice::from_ref(info.as_ref()))
            .build();

        self.buffer_infos.push(info);
        self.writes.push(write);
        self
    }

    /// Stage a uniform buffer write
    pub fn add_uniform_buffer(
        self,
        buffer: vk::Buffer,
        range: vk::DeviceSize,
        binding: ShaderBinding,
    ) -> Self {
        self.add_buffer(buffer, range, vk::DescriptorType::UNIFORM_BUFFER, binding)
    }

    /// Stage a storage buffer write
    pub fn add_storage_buffer(
        self,
        buffer: vk::Buffer,
        range: vk::DeviceSize,
        binding: ShaderBinding,
    ) -> Self {
        self.add_buffer(buffer, range, vk::DescriptorType::STORAGE_BUFFER, binding)
    }

    /// Stage a combined image sampler write
    pub fn add_image_sampler(
        mut self,
        image_view: vk::ImageView,
        sampler: vk::Sampler,
        binding: ShaderBinding,
    ) -> Self {
        let info = Box::new(
            vk::DescriptorImageInfo::builder()
                .image_view(image_view)
                .sampler(sampler)
                .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .build(),
        );

        let write = vk::WriteDescriptorSet::builder()
            .dst_set(self.set)
            .dst_binding(binding.index())
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(std::slice::from_ref(info.as_ref()))
            .build();

        self.image_infos.push(info);
        self.writes.push(write);
        self
    }

    /// Number of staged writes
    pub fn staged_writes(&self) -> usize {
        self.writes.len()
    }

    /// Flush all staged writes in one call
    pub fn update(self, device: &Device) {
        unsafe {
            device.update_descriptor_sets(&self.writes, &[]);
        }
    }
}

/// A layout, its pool, and one populated set per frame in flight.
///
/// Field order encodes teardown order: sets die with the pool, the pool
/// before the layout is still legal since sets reference the layout only at
/// allocation time.
pub struct DescriptorSets {
    layout: DescriptorSetLayout,
    pool: DescriptorPool,
    sets: [vk::DescriptorSet; MAX_FRAMES_IN_FLIGHT],
}

impl DescriptorSets {
    /// The layout handle, for pipeline layout creation
    pub fn layout(&self) -> vk::DescriptorSetLayout {
        self.layout.handle()
    }

    /// The set bound while recording `frame`
    pub fn set(&self, frame: usize) -> vk::DescriptorSet {
        self.sets[frame]
    }

    /// All per-frame sets
    pub fn sets(&self) -> &[vk::DescriptorSet; MAX_FRAMES_IN_FLIGHT] {
        &self.sets
    }

    /// The owned pool
    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }
}

enum PendingWrite {
    Buffer {
        buffer: vk::Buffer,
        range: vk::DeviceSize,
        descriptor_type: vk::DescriptorType,
        binding: ShaderBinding,
    },
    Image {
        view: vk::ImageView,
        sampler: vk::Sampler,
        binding: ShaderBinding,
    },
}

/// Composes a layout, a pool sized for `MAX_FRAMES_IN_FLIGHT` sets, and the
/// writes that populate each frame's set.
pub struct DescriptorSetsBuilder {
    layout: DescriptorSetLayoutBuilder,
    pool: DescriptorPoolBuilder,
    frame_writes: [Vec<PendingWrite>; MAX_FRAMES_IN_FLIGHT],
}

impl DescriptorSetsBuilder {
    /// Create an empty composite builder
    pub fn new() -> Self {
        Self {
            layout: DescriptorSetLayoutBuilder::new(),
            pool: DescriptorPoolBuilder::new(),
            frame_writes: Default::default(),
        }
    }

    /// Bind one uniform buffer per frame from `ubos`
    pub fn add_uniform_buffers<T: Pod>(
        mut self,
        ubos: &FrameUbos<T>,
        stage_flags: vk::ShaderStageFlags,
        binding: ShaderBinding,
    ) -> VulkanResult<Self> {
        self.layout = self.layout.add_uniform_buffer(binding, stage_flags)?;
        self.pool = self
            .pool
            .add_uniform_buffer_count(MAX_FRAMES_IN_FLIGHT as u32);
        for (frame, writes) in self.frame_writes.iter_mut().enumerate() {
            writes.push(PendingWrite::Buffer {
                buffer: ubos[frame].handle(),
                range: ubos[frame].byte_size(),
                descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                binding,
            });
        }
        Ok(self)
    }

    /// Bind the same uniform buffer in every frame's set
    pub fn add_shared_uniform_buffer<T: Pod>(
        mut self,
        ubo: &UniformBuffer<T>,
        stage_flags: vk::ShaderStageFlags,
        binding: ShaderBinding,
    ) -> VulkanResult<Self> {
        self.layout = self.layout.add_uniform_buffer(binding, stage_flags)?;
        self.pool = self
            .pool
            .add_uniform_buffer_count(MAX_FRAMES_IN_FLIGHT as u32);
        for writes in self.frame_writes.iter_mut() {
            writes.push(PendingWrite::Buffer {
                buffer: ubo.handle(),
                range: ubo.byte_size(),
                descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                binding,
            });
        }
        Ok(self)
    }

    /// Bind one storage buffer per frame from `storage`
    pub fn add_storage_buffers<T: Pod>(
        mut self,
        storage: &FrameStorage<T>,
        stage_flags: vk::ShaderStageFlags,
        binding: ShaderBinding,
    ) -> VulkanResult<Self> {
        self.layout = self.layout.add_storage_buffer(binding, stage_flags)?;
        self.pool = self
            .pool
            .add_storage_buffer_count(MAX_FRAMES_IN_FLIGHT as u32);
        for (frame, writes) in self.frame_writes.iter_mut().enumerate() {
            writes.push(PendingWrite::Buffer {
                buffer: storage[frame].handle(),
                range: storage[frame].byte_size(),
                descriptor_type: vk::DescriptorType::STORAGE_BUFFER,
                binding,
            });
        }
        Ok(self)
    }

    /// Bind the same storage buffer in every frame's set
    pub fn add_shared_storage_buffer<T: Pod>(
        mut self,
        storage: &StorageBuffer<T>,
        stage_flags: vk::ShaderStageFlags,
        binding: ShaderBinding,
    ) -> VulkanResult<Self> {
        self.layout = self.layout.add_storage_buffer(binding, stage_flags)?;
        self.pool = self
            .pool
            .add_storage_buffer_count(MAX_FRAMES_IN_FLIGHT as u32);
        for writes in self.frame_writes.iter_mut() {
            writes.push(PendingWrite::Buffer {
                buffer: storage.handle(),
                range: storage.byte_size(),
                descriptor_type: vk::DescriptorType::STORAGE_BUFFER,
                binding,
            });
        }
        Ok(self)
    }

    /// Bind the same sampled image in every frame's set
    pub fn add_image_sampler(
        mut self,
        view: vk::ImageView,
        sampler: vk::Sampler,
        stage_flags: vk::ShaderStageFlags,
        binding: ShaderBinding,
    ) -> VulkanResult<Self> {
        self.layout = self
            .layout
            .add_combined_image_sampler(binding, stage_flags)?;
        self.pool = self
            .pool
            .add_combined_image_sampler_count(MAX_FRAMES_IN_FLIGHT as u32);
        for writes in self.frame_writes.iter_mut() {
            writes.push(PendingWrite::Image {
                view,
                sampler,
                binding,
            });
        }
        Ok(self)
    }

    /// Build the layout and pool, allocate the per-frame sets, and flush the
    /// staged writes into them.
    pub fn build(self, ctx: &VulkanContext) -> VulkanResult<DescriptorSets> {
        let layout = self.layout.build(&ctx.device)?;
        let pool = self.pool.build(&ctx.device, MAX_FRAMES_IN_FLIGHT as u32)?;

        let layouts = [layout.handle(); MAX_FRAMES_IN_FLIGHT];
        let sets: [vk::DescriptorSet; MAX_FRAMES_IN_FLIGHT] =
            pool.allocate(&layouts)?.try_into().map_err(|_| {
                VulkanError::InitializationFailed(
                    "descriptor set allocation returned wrong count".to_string(),
                )
            })?;

        for (frame, writes) in self.frame_writes.into_iter().enumerate() {
            let mut updater = DescriptorSetUpdater::new(sets[frame]);
            for write in writes {
                updater = match write {
                    PendingWrite::Buffer {
                        buffer,
                        range,
                        descriptor_type,
                        binding,
                    } => updater.add_buffer(buffer, range, descriptor_type, binding),
                    PendingWrite::Image {
                        view,
                        sampler,
                        binding,
                    } => updater.add_image_sampler(view, sampler, binding),
                };
            }
            updater.update(&ctx.device);
        }

        Ok(DescriptorSets { layout, pool, sets })
    }
}

impl Default for DescriptorSetsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_uniform_binding_is_rejected() {
        crate::foundation::logging::init_for_tests();
        let result = DescriptorSetLayoutBuilder::new()
            .add_uniform_buffer(ShaderBinding::XformsUbo, vk::ShaderStageFlags::VERTEX)
            .and_then(|b| {
                b.add_uniform_buffer(ShaderBinding::XformsUbo, vk::ShaderStageFlags::FRAGMENT)
            });

        match result {
            Err(VulkanError::DuplicateBinding { binding }) => assert_eq!(binding, 0),
            _ => panic!("expected DuplicateBinding"),
        }
    }

    #[test]
    fn duplicate_binding_across_kinds_is_rejected() {
        let result = DescriptorSetLayoutBuilder::new()
            .add_uniform_buffer(ShaderBinding::Lights, vk::ShaderStageFlags::FRAGMENT)
            .and_then(|b| {
                b.add_combined_image_sampler(ShaderBinding::Lights, vk::ShaderStageFlags::FRAGMENT)
            });

        match result {
            Err(VulkanError::DuplicateBinding { binding }) => {
                assert_eq!(binding, ShaderBinding::Lights.index());
            }
            _ => panic!("expected DuplicateBinding"),
        }
    }

    #[test]
    fn distinct_bindings_accumulate() {
        let builder = DescriptorSetLayoutBuilder::new()
            .add_uniform_buffer(ShaderBinding::XformsUbo, vk::ShaderStageFlags::VERTEX)
            .unwrap()
            .add_uniform_buffer(ShaderBinding::EyePos, vk::ShaderStageFlags::FRAGMENT)
            .unwrap()
            .add_combined_image_sampler(ShaderBinding::TextureSampler, vk::ShaderStageFlags::FRAGMENT)
            .unwrap()
            .add_storage_buffer(ShaderBinding::Actors, vk::ShaderStageFlags::VERTEX)
            .unwrap();

        let bindings = builder.bindings();
        assert_eq!(bindings.len(), 4);
        assert_eq!(bindings[2].descriptor_type, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        assert_eq!(bindings[3].descriptor_type, vk::DescriptorType::STORAGE_BUFFER);
    }

    #[test]
    fn pool_counts_are_additive() {
        let builder = DescriptorPoolBuilder::new()
            .add_uniform_buffer_count(2)
            .add_uniform_buffer_count(3)
            .add_combined_image_sampler_count(4)
            .add_storage_buffer_count(1)
            .add_storage_buffer_count(1);

        assert_eq!(builder.uniform_buffer_count(), 5);
        assert_eq!(builder.combined_image_sampler_count(), 4);
        assert_eq!(builder.storage_buffer_count(), 2);
    }

    #[test]
    fn pool_counts_start_at_zero() {
        let builder = DescriptorPoolBuilder::new();
        assert_eq!(builder.uniform_buffer_count(), 0);
        assert_eq!(builder.storage_buffer_count(), 0);
        assert_eq!(builder.combined_image_sampler_count(), 0);
    }
}
