/// GpuContext - Shared GPU state for all Vulkan objects
///
/// Contains everything a resource needs after creation:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Graphics queue and its family

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::sync::{Arc, Mutex};

/// Shared GPU context for all Vulkan resources.
///
/// Shared (via `Arc`) by images, buffers, fences, semaphores and command
/// lists so each one can destroy itself on drop.
///
/// Note: device destruction is handled by `VulkanGraphicsDevice::drop()`;
/// every resource must be dropped before the graphics device.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator (shared, requires mutex for thread safety)
    pub allocator: Arc<Mutex<Allocator>>,

    /// Graphics queue for command submission
    pub graphics_queue: vk::Queue,

    /// Graphics queue family index
    pub graphics_queue_family: u32,
}

impl GpuContext {
    pub fn new(
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
    ) -> Self {
        Self {
            device,
            allocator,
            graphics_queue,
            graphics_queue_family,
        }
    }
}
