/// Queue - submission and presentation wrapper
///
/// Submits finished command buffers with their fence and the semaphores that
/// order rendering against presentation.

use std::sync::Arc;

use crate::engine_bail_state;
use crate::engine_trace;
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, Semaphore, SemaphoreWait, SubmitInfo};
use crate::sync::PipelineStages;
use crate::command::CommandBuffer;

/// Graphics queue
#[derive(Debug, Default)]
pub struct Queue {
    submissions: u64,
    presentations: u64,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage at which a swapchain-acquire semaphore is waited on
    ///
    /// The swapchain image barrier must include it in its source stages.
    pub const ACQUIRE_WAIT_STAGES: PipelineStages = PipelineStages::COLOR_ATTACHMENT_OUTPUT;

    /// Wait entry for a swapchain-acquire semaphore
    pub fn acquire_wait(semaphore: Arc<dyn Semaphore>) -> SemaphoreWait {
        SemaphoreWait { semaphore, stages: Self::ACQUIRE_WAIT_STAGES }
    }

    /// Submit a finished command buffer
    ///
    /// The buffer's fence is signaled when the GPU has executed it.
    pub fn submit(
        &mut self,
        device: &dyn GraphicsDevice,
        command_buffer: &CommandBuffer,
        wait_semaphores: &[SemaphoreWait],
        signal_semaphores: &[Arc<dyn Semaphore>],
    ) -> Result<()> {
        if command_buffer.is_recording() {
            engine_bail_state!(
                "lr::Queue",
                "Cannot submit a command buffer that is still recording"
            );
        }
        device.submit(&SubmitInfo {
            command_list: command_buffer.command_list(),
            fence: Some(command_buffer.fence()),
            wait_semaphores,
            signal_semaphores,
        })?;
        self.submissions += 1;
        engine_trace!(
            "lr::Queue",
            "Submitted command buffer (waits={}, signals={})",
            wait_semaphores.len(),
            signal_semaphores.len()
        );
        Ok(())
    }

    /// Present a swapchain image once `wait_semaphores` are signaled
    pub fn present(
        &mut self,
        device: &mut dyn GraphicsDevice,
        image_index: u32,
        wait_semaphores: &[Arc<dyn Semaphore>],
    ) -> Result<()> {
        let Some(swapchain) = device.swapchain_mut() else {
            engine_bail_state!("lr::Queue", "Cannot present: device has no swapchain");
        };
        swapchain.present(image_index, wait_semaphores)?;
        self.presentations += 1;
        Ok(())
    }

    /// Block until the device is idle
    pub fn wait_idle(&self, device: &dyn GraphicsDevice) -> Result<()> {
        device.wait_idle()
    }

    pub fn submission_count(&self) -> u64 {
        self.submissions
    }

    pub fn presentation_count(&self) -> u64 {
        self.presentations
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
