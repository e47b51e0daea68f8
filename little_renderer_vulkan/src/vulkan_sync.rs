/// Fence and Semaphore - Vulkan synchronization primitives

use ash::vk;
use little_renderer::lr::Result;
use little_renderer::lr::device::{Fence as LrFence, Semaphore as LrSemaphore};
use little_renderer::engine_err;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan fence
pub struct Fence {
    ctx: Arc<GpuContext>,
    pub(crate) fence: vk::Fence,
}

impl Fence {
    pub fn new(ctx: Arc<GpuContext>, signaled: bool) -> Result<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe { ctx.device.create_fence(&info, None) }
            .map_err(|e| engine_err!("lr::vulkan", "Failed to create fence: {:?}", e))?;
        Ok(Self { ctx, fence })
    }
}

impl LrFence for Fence {
    fn is_signaled(&self) -> Result<bool> {
        unsafe { self.ctx.device.get_fence_status(self.fence) }
            .map_err(|e| engine_err!("lr::vulkan", "Failed to query fence status: {:?}", e))
    }

    fn wait(&self) -> Result<()> {
        unsafe { self.ctx.device.wait_for_fences(&[self.fence], true, u64::MAX) }
            .map_err(|e| engine_err!("lr::vulkan", "Failed to wait for fence: {:?}", e))
    }

    fn reset(&self) -> Result<()> {
        unsafe { self.ctx.device.reset_fences(&[self.fence]) }
            .map_err(|e| engine_err!("lr::vulkan", "Failed to reset fence: {:?}", e))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_fence(self.fence, None);
        }
    }
}

/// Vulkan binary semaphore
pub struct Semaphore {
    ctx: Arc<GpuContext>,
    pub(crate) semaphore: vk::Semaphore,
}

impl Semaphore {
    pub fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { ctx.device.create_semaphore(&info, None) }
            .map_err(|e| engine_err!("lr::vulkan", "Failed to create semaphore: {:?}", e))?;
        Ok(Self { ctx, semaphore })
    }
}

impl LrSemaphore for Semaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Native handle of a core semaphore created by this backend
pub(crate) fn vk_semaphore(semaphore: &dyn LrSemaphore) -> Result<vk::Semaphore> {
    semaphore
        .as_any()
        .downcast_ref::<Semaphore>()
        .map(|s| s.semaphore)
        .ok_or_else(|| engine_err!("lr::vulkan", "Semaphore was not created by the Vulkan backend"))
}

/// Native handle of a core fence created by this backend
pub(crate) fn vk_fence(fence: &dyn LrFence) -> Result<vk::Fence> {
    fence
        .as_any()
        .downcast_ref::<Fence>()
        .map(|f| f.fence)
        .ok_or_else(|| engine_err!("lr::vulkan", "Fence was not created by the Vulkan backend"))
}
