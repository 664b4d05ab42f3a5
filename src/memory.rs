use crate::mv_error::MvError;
use std::sync::Arc;
use vulkano::{
    buffer::{Buffer, BufferContents, BufferCreateInfo, BufferUsage, Subbuffer},
    command_buffer::allocator::{
        StandardCommandBufferAllocator,
        StandardCommandBufferAllocatorCreateInfo,
    },
    descriptor_set::allocator::StandardDescriptorSetAllocator,
    device::Device,
    memory::allocator::{
        AllocationCreateInfo, MemoryTypeFilter, StandardMemoryAllocator,
    },
    DeviceSize,
};

/// Allocators shared for the life of the device. Nothing here is made more
/// than once per frame so the standard allocators are enough.
pub struct Memory {
    pub memory_allocator: Arc<StandardMemoryAllocator>,
    pub set_allocator: StandardDescriptorSetAllocator,
    pub command_buffer_allocator: StandardCommandBufferAllocator,
}

impl Memory {
    #[must_use]
    pub fn new(device: &Arc<Device>) -> Self {
        Self {
            memory_allocator: Arc::new(StandardMemoryAllocator::new_default(
                device.clone(),
            )),
            set_allocator: StandardDescriptorSetAllocator::new(
                device.clone(),
                Default::default(),
            ),
            command_buffer_allocator: StandardCommandBufferAllocator::new(
                device.clone(),
                StandardCommandBufferAllocatorCreateInfo::default(),
            ),
        }
    }

    /// Byte buffer the host writes every frame and the device reads
    ///
    /// # Errors
    /// May return `MvError`
    pub fn streaming_buffer(
        &self,
        usage: BufferUsage,
        size: usize,
    ) -> Result<Subbuffer<[u8]>, MvError> {
        Ok(Buffer::new_slice::<u8>(
            self.memory_allocator.clone(),
            BufferCreateInfo {
                usage,
                ..Default::default()
            },
            AllocationCreateInfo {
                memory_type_filter: MemoryTypeFilter::PREFER_DEVICE
                    | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                ..Default::default()
            },
            size as DeviceSize,
        )?)
    }

    /// Buffer filled once at creation
    ///
    /// # Errors
    /// May return `MvError`
    pub fn static_buffer<T, I>(
        &self,
        usage: BufferUsage,
        data: I,
    ) -> Result<Subbuffer<[T]>, MvError>
    where
        T: BufferContents,
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        Ok(Buffer::from_iter(
            self.memory_allocator.clone(),
            BufferCreateInfo {
                usage,
                ..Default::default()
            },
            AllocationCreateInfo {
                memory_type_filter: MemoryTypeFilter::PREFER_DEVICE
                    | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                ..Default::default()
            },
            data,
        )?)
    }
}
