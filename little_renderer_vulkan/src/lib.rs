/*!
# Little Renderer - Vulkan Backend

Vulkan 1.3 implementation of the `little_renderer` device traits, built on
`ash` for the bindings and `gpu-allocator` for memory.

Rendering uses dynamic rendering (no render pass or framebuffer objects),
which matches the core's model of passes as barrier-delimited recording
scopes.

```no_run
use little_renderer::lr::{Config, GraphicsContext};
use little_renderer_vulkan::lr::VulkanGraphicsDevice;
# fn run(window: &winit::window::Window) -> little_renderer::lr::Result<()> {
let config = Config::default();
let device = VulkanGraphicsDevice::new(window, &config)?;
let _context = GraphicsContext::new(Box::new(device), config)?;
# Ok(())
# }
```

With the `vulkan-validation` feature, `Config::enable_validation` turns on
the Khronos validation layer and forwards its messages to the engine logger.
*/

mod vulkan_buffer;
mod vulkan_command_list;
mod vulkan_context;
mod vulkan_convert;
#[cfg(feature = "vulkan-validation")]
mod vulkan_debug;
mod vulkan_graphics_device;
mod vulkan_image;
mod vulkan_pipeline;
mod vulkan_swapchain;
mod vulkan_sync;

pub mod lr {
    pub use crate::vulkan_buffer::Buffer as VulkanBuffer;
    pub use crate::vulkan_command_list::CommandList as VulkanCommandList;
    pub use crate::vulkan_graphics_device::VulkanGraphicsDevice;
    pub use crate::vulkan_image::Image as VulkanImage;
    pub use crate::vulkan_pipeline::Pipeline as VulkanPipeline;
    pub use crate::vulkan_swapchain::Swapchain as VulkanSwapchain;
    pub use crate::vulkan_sync::{Fence as VulkanFence, Semaphore as VulkanSemaphore};

    #[cfg(feature = "vulkan-validation")]
    pub use crate::vulkan_debug::{DebugSeverity, ValidationStats, VulkanDebugConfig};
}
