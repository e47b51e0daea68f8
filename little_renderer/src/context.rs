/// GraphicsContext - explicit owner of the device and per-frame sync state
///
/// Created once by the application and passed down to whatever records
/// frames. Owns the command buffer pool, the queue, the swapchain image
/// textures and the acquire/present semaphores. Nothing here is global.

use std::sync::Arc;

use crate::command::{CommandBuffer, CommandBufferManager, Queue};
use crate::config::Config;
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, Semaphore};
use crate::render_graph::FrameInfo;
use crate::resource::Texture;
use crate::sync::ResourceState;
use crate::{engine_bail_state, engine_info, engine_warn};

pub struct GraphicsContext {
    config: Config,
    manager: CommandBufferManager,
    queue: Queue,
    swapchain_textures: Vec<Arc<Texture>>,
    /// Signaled by acquire, indexed by frame slot
    acquire_semaphores: Vec<Arc<dyn Semaphore>>,
    /// Signaled by the frame's submission, indexed by image
    present_semaphores: Vec<Arc<dyn Semaphore>>,
    image_index: Option<u32>,
    frame_count: u64,
    /// Declared last: every object above holds native handles of this device
    device: Box<dyn GraphicsDevice>,
}

impl GraphicsContext {
    /// Take ownership of `device` and set up per-image sync objects
    pub fn new(device: Box<dyn GraphicsDevice>, config: Config) -> Result<Self> {
        let manager = CommandBufferManager::new(&config);
        let mut context = Self {
            config,
            manager,
            queue: Queue::new(),
            swapchain_textures: Vec::new(),
            acquire_semaphores: Vec::new(),
            present_semaphores: Vec::new(),
            image_index: None,
            frame_count: 0,
            device,
        };
        context.create_swapchain_resources()?;
        engine_info!(
            "lr::GraphicsContext",
            "Graphics context ready on '{}' ({} swapchain images)",
            context.device.name(),
            context.swapchain_textures.len()
        );
        Ok(context)
    }

    fn create_swapchain_resources(&mut self) -> Result<()> {
        self.swapchain_textures.clear();
        self.acquire_semaphores.clear();
        self.present_semaphores.clear();

        let Some(swapchain) = self.device.swapchain() else {
            return Ok(());
        };
        let count = swapchain.image_count();
        let mut textures = Vec::with_capacity(count);
        for i in 0..count as u32 {
            if let Some(image) = swapchain.image(i) {
                let name = format!("swapchain{}", i);
                textures.push(Arc::new(Texture::from_image(&name, image, ResourceState::Undefined)));
            }
        }
        self.swapchain_textures = textures;

        for _ in 0..count {
            self.acquire_semaphores.push(self.device.create_semaphore()?);
            self.present_semaphores.push(self.device.create_semaphore()?);
        }
        Ok(())
    }

    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> &mut dyn GraphicsDevice {
        self.device.as_mut()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn command_buffer_manager(&self) -> &CommandBufferManager {
        &self.manager
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Index acquired for the current frame, if any
    pub fn current_image_index(&self) -> Option<u32> {
        self.image_index
    }

    pub fn swapchain_textures(&self) -> &[Arc<Texture>] {
        &self.swapchain_textures
    }

    /// Swapchain extent, or the configured surface size when headless
    pub fn surface_extent(&self) -> (u32, u32) {
        match self.device.swapchain() {
            Some(swapchain) => swapchain.extent(),
            None => (self.config.surface_width, self.config.surface_height),
        }
    }

    // ===== COMMAND BUFFERS =====

    pub fn active_command_buffer(&mut self) -> Result<&mut CommandBuffer> {
        self.manager.active_command_buffer(self.device.as_ref())
    }

    pub fn upload_command_buffer(&mut self) -> Result<&mut CommandBuffer> {
        self.manager.upload_command_buffer(self.device.as_ref())
    }

    pub fn submit_upload_command_buffer(&mut self) -> Result<()> {
        self.manager.submit_upload_command_buffer(self.device.as_ref(), &mut self.queue)
    }

    /// Active command buffer together with this frame's target inputs
    pub fn frame(&mut self) -> Result<(&mut CommandBuffer, FrameInfo<'_>)> {
        let cmd = self.manager.active_command_buffer(self.device.as_ref())?;
        let frame = FrameInfo { image_index: self.image_index, swapchain_textures: &self.swapchain_textures };
        Ok((cmd, frame))
    }

    // ===== FRAME =====

    fn frame_slot(&self) -> usize {
        (self.frame_count % self.acquire_semaphores.len().max(1) as u64) as usize
    }

    /// Acquire the next swapchain image for this frame
    ///
    /// Repeated calls before `present` return the same index.
    pub fn acquire_next_image(&mut self) -> Result<u32> {
        if let Some(index) = self.image_index {
            return Ok(index);
        }
        let slot = self.frame_slot();
        let Some(semaphore) = self.acquire_semaphores.get(slot).cloned() else {
            engine_bail_state!("lr::GraphicsContext", "acquire_next_image called on a headless context");
        };
        let Some(swapchain) = self.device.swapchain_mut() else {
            engine_bail_state!("lr::GraphicsContext", "acquire_next_image called on a headless context");
        };
        let index = swapchain.acquire_next_image(semaphore.as_ref())?;
        self.image_index = Some(index);
        Ok(index)
    }

    /// Submit the frame and present the acquired image
    ///
    /// The image is moved to `Present`, the active buffer waits on the
    /// acquire semaphore and signals the present semaphore, which the
    /// presentation waits on.
    pub fn present(&mut self) -> Result<()> {
        let Some(index) = self.image_index else {
            engine_bail_state!("lr::GraphicsContext", "present called without an acquired swapchain image");
        };
        let slot = self.frame_slot();
        let (Some(texture), Some(acquire), Some(present)) = (
            self.swapchain_textures.get(index as usize).cloned(),
            self.acquire_semaphores.get(slot).cloned(),
            self.present_semaphores.get(index as usize).cloned(),
        ) else {
            engine_bail_state!("lr::GraphicsContext", "Swapchain image {} is out of range", index);
        };

        let cmd = self.manager.active_command_buffer(self.device.as_ref())?;
        cmd.add_transition(texture.update_layout_and_barrier(ResourceState::Present));
        self.manager.submit_active_command_buffer(
            self.device.as_ref(),
            &mut self.queue,
            &[Queue::acquire_wait(acquire)],
            &[present.clone()],
        )?;
        self.queue.present(self.device.as_mut(), index, &[present])?;

        self.image_index = None;
        self.frame_count += 1;
        Ok(())
    }

    /// Submit the active buffer without semaphores and block until idle
    pub fn submit(&mut self) -> Result<()> {
        self.manager
            .submit_active_command_buffer(self.device.as_ref(), &mut self.queue, &[], &[])?;
        self.wait()
    }

    /// Block until the device is idle, then recycle every submitted buffer
    pub fn wait(&mut self) -> Result<()> {
        self.queue.wait_idle(self.device.as_ref())?;
        self.manager.reset_command_buffers(true)?;
        Ok(())
    }

    /// Recreate the swapchain and its textures
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.wait()?;
        let Some(swapchain) = self.device.swapchain_mut() else {
            engine_bail_state!("lr::GraphicsContext", "resize called on a headless context");
        };
        swapchain.recreate(width, height)?;
        self.image_index = None;
        self.create_swapchain_resources()?;
        engine_info!("lr::GraphicsContext", "Swapchain resized to {}x{}", width, height);
        Ok(())
    }

    /// Wait for the GPU and release every command buffer
    pub fn destroy(&mut self) -> Result<()> {
        if self.image_index.is_some() {
            engine_warn!("lr::GraphicsContext", "Destroying context with an unpresented swapchain image");
        }
        self.queue.wait_idle(self.device.as_ref())?;
        self.manager.destroy()?;
        self.swapchain_textures.clear();
        self.acquire_semaphores.clear();
        self.present_semaphores.clear();
        self.image_index = None;
        Ok(())
    }
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        if let Err(e) = self.queue.wait_idle(self.device.as_ref()) {
            engine_warn!("lr::GraphicsContext", "wait_idle failed while dropping context: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
