/// Swapchain trait - for window presentation

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{Image, Semaphore, TextureFormat};

/// Swapchain for presenting rendered images to a window
///
/// Manages a set of images that are presented to the screen in sequence.
/// Image state tracking is left to the caller.
pub trait Swapchain: Send + Sync {
    /// Get the number of images in the swapchain
    fn image_count(&self) -> usize;

    /// Image at the given index
    fn image(&self, index: u32) -> Option<Arc<dyn Image>>;

    /// Width and height of the swapchain images in pixels
    fn extent(&self) -> (u32, u32);

    /// Get the pixel format of the swapchain images
    fn format(&self) -> TextureFormat;

    /// Acquire the next available swapchain image index
    ///
    /// # Arguments
    ///
    /// * `signal` - Semaphore signaled once the image may be written
    fn acquire_next_image(&mut self, signal: &dyn Semaphore) -> Result<u32>;

    /// Present an image to the screen
    ///
    /// # Arguments
    ///
    /// * `image_index` - Index of the image to present (from acquire_next_image)
    /// * `wait` - Semaphores the presentation engine waits on
    fn present(&mut self, image_index: u32, wait: &[Arc<dyn Semaphore>]) -> Result<()>;

    /// Recreate the swapchain (e.g., after window resize)
    ///
    /// # Arguments
    ///
    /// * `width` - New width in pixels
    /// * `height` - New height in pixels
    fn recreate(&mut self, width: u32, height: u32) -> Result<()>;
}
