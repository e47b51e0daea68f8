/// GraphicsDevice trait - factory and submission interface of a backend

use std::any::Any;
use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferDesc, CommandList, Fence, Image, ImageDesc, Semaphore, Swapchain,
};
use crate::sync::PipelineStages;

/// Semaphore wait with the stages that must not start before it is signaled
#[derive(Clone)]
pub struct SemaphoreWait {
    pub semaphore: Arc<dyn Semaphore>,
    pub stages: PipelineStages,
}

/// One queue submission
pub struct SubmitInfo<'a> {
    /// Finished command list to execute
    pub command_list: &'a dyn CommandList,
    /// Fence signaled when execution completes
    pub fence: Option<&'a dyn Fence>,
    /// Semaphores to wait on before execution
    pub wait_semaphores: &'a [SemaphoreWait],
    /// Semaphores signaled when execution completes
    pub signal_semaphores: &'a [Arc<dyn Semaphore>],
}

/// Graphics device trait
///
/// Implemented by backends (e.g. VulkanGraphicsDevice). All creation methods
/// return owned handles; destruction happens on drop.
pub trait GraphicsDevice: Send + Sync {
    /// Backend name, for logs
    fn name(&self) -> &str;

    /// Allocate a native command recorder
    fn create_command_list(&self) -> Result<Box<dyn CommandList>>;

    /// Create a fence, optionally already signaled
    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>>;

    /// Create a binary semaphore
    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>>;

    /// Create a device-local image
    fn create_image(&self, desc: &ImageDesc) -> Result<Arc<dyn Image>>;

    /// Create a buffer
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Submit a finished command list to the graphics queue
    fn submit(&self, info: &SubmitInfo<'_>) -> Result<()>;

    /// Swapchain of the device's surface, if it has one
    fn swapchain(&self) -> Option<&dyn Swapchain>;

    /// Mutable swapchain access (acquire, present, recreate)
    fn swapchain_mut(&mut self) -> Option<&mut dyn Swapchain>;

    /// Block until the device has finished all submitted work
    fn wait_idle(&self) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}
