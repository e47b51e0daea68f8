/// Graphics device module - backend-facing traits and descriptor types
///
/// The frame-sync core never touches a graphics API directly. Every native
/// object it needs (recorders, fences, images, buffers, swapchain) is reached
/// through the object-safe traits declared here.

pub mod graphics_device;
pub mod image;
pub mod buffer;
pub mod fence;
pub mod pipeline;
pub mod swapchain;
pub mod command_list;

pub use graphics_device::*;
pub use image::*;
pub use buffer::*;
pub use fence::*;
pub use pipeline::*;
pub use swapchain::*;
pub use command_list::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
