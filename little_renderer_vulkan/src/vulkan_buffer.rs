/// Buffer - Vulkan implementation of the Buffer trait

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use little_renderer::lr::device::{Buffer as LrBuffer, BufferDesc};
use little_renderer::lr::{Error, Result};
use little_renderer::{engine_bail, engine_err, engine_error};
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_convert::buffer_usage_to_vk;

/// Vulkan buffer implementation
pub struct Buffer {
    /// Shared GPU context (device, allocator, queue)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    allocation: Option<Allocation>,
    /// Buffer size
    size: u64,
}

impl Buffer {
    /// Create a buffer and bind freshly allocated memory to it
    pub fn new(ctx: Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        let create_info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(buffer_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let location = if desc.host_visible {
            MemoryLocation::CpuToGpu
        } else {
            MemoryLocation::GpuOnly
        };

        unsafe {
            let buffer = ctx.device.create_buffer(&create_info, None)
                .map_err(|e| engine_err!("lr::vulkan", "Failed to create buffer: {:?}", e))?;
            let requirements = ctx.device.get_buffer_memory_requirements(buffer);

            let allocation = {
                let mut allocator = ctx.allocator.lock()
                    .map_err(|_| engine_err!("lr::vulkan", "GPU allocator mutex poisoned"))?;
                allocator.allocate(&AllocationCreateDesc {
                    name: "buffer",
                    requirements,
                    location,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
            };
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    engine_error!("lr::vulkan", "Failed to allocate buffer memory: {:?}", e);
                    return Err(Error::OutOfMemory);
                }
            };

            if let Err(e) = ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                ctx.device.destroy_buffer(buffer, None);
                if let Ok(mut allocator) = ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
                return Err(engine_err!("lr::vulkan", "Failed to bind buffer memory: {:?}", e));
            }

            Ok(Self {
                ctx,
                buffer,
                allocation: Some(allocation),
                size: desc.size,
            })
        }
    }
}

impl LrBuffer for Buffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset + data.len() as u64;
        if end > self.size {
            engine_bail!("lr::vulkan", "Buffer update out of range: {} > {}", end, self.size);
        }
        let Some(allocation) = &self.allocation else {
            engine_bail!("lr::vulkan", "Buffer update failed: no GPU allocation");
        };
        let Some(mapped) = allocation.mapped_ptr() else {
            engine_bail!("lr::vulkan", "Buffer is not CPU-accessible");
        };
        unsafe {
            let dst = (mapped.as_ptr() as *mut u8).add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the buffer
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            // Destroy buffer
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}

/// Native handle of a core buffer created by this backend
pub(crate) fn vk_buffer(buffer: &dyn LrBuffer) -> Result<vk::Buffer> {
    buffer
        .as_any()
        .downcast_ref::<Buffer>()
        .map(|b| b.buffer)
        .ok_or_else(|| engine_err!("lr::vulkan", "Buffer was not created by the Vulkan backend"))
}
