/// Mock graphics device for unit tests (no GPU required)
///
/// Every recorded command is appended to a shared `MockLog`, so tests can
/// assert on command order, emitted barriers and submissions. Fences are
/// signaled on submit unless auto-signal is disabled, in which case tests
/// drive completion explicitly.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::engine_bail;
use crate::error::{Error, Result};
use crate::graphics_device::{
    Buffer, BufferDesc, CommandList, Fence, GraphicsDevice, Image, ImageDesc, IndexType,
    Pipeline, PipelineBindPoint, Rect2D, RenderingInfo, Semaphore, ShaderStages, SubmitInfo,
    Swapchain, TextureFormat, TextureUsage, Viewport,
};
use crate::sync::{AccessFlags, BarrierBatch, ImageLayout, PipelineStages, ResourceState};

// ============================================================================
// Shared log
// ============================================================================

/// One emitted pipeline barrier
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedBarrier {
    pub command_list: usize,
    pub src_stages: PipelineStages,
    pub dst_stages: PipelineStages,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    /// (old, new) state of each image barrier, in order
    pub images: Vec<(ResourceState, ResourceState)>,
    pub buffers: Vec<(ResourceState, ResourceState)>,
    pub memory_count: usize,
}

/// One queue submission
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSubmit {
    pub command_list: usize,
    pub wait_count: usize,
    pub signal_count: usize,
    pub has_fence: bool,
}

/// Everything the mock device observed
#[derive(Debug, Default)]
pub struct MockLog {
    /// Recorded commands, in global order, as "cl<id>:<command>"
    pub commands: Vec<String>,
    pub barriers: Vec<RecordedBarrier>,
    pub submits: Vec<RecordedSubmit>,
}

impl MockLog {
    /// Commands with the command list prefix stripped
    pub fn command_names(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|c| c.split_once(':').map(|(_, name)| name.to_string()).unwrap_or_else(|| c.clone()))
            .collect()
    }

    /// Position of the first command equal to `name` (prefix stripped)
    pub fn position(&self, name: &str) -> Option<usize> {
        self.command_names().iter().position(|c| c == name)
    }

    pub fn count(&self, name: &str) -> usize {
        self.command_names().iter().filter(|c| *c == name).count()
    }
}

pub type SharedLog = Arc<Mutex<MockLog>>;

fn lock(log: &SharedLog) -> MutexGuard<'_, MockLog> {
    log.lock().unwrap_or_else(|e| e.into_inner())
}

// ============================================================================
// Mock Image / Buffer / Pipeline / Semaphore
// ============================================================================

#[derive(Debug)]
pub struct MockImage {
    pub desc: ImageDesc,
    pub name: String,
}

impl MockImage {
    pub fn new(width: u32, height: u32, format: TextureFormat, name: &str) -> Self {
        let usage = if format.is_depth() {
            TextureUsage::DEPTH_STENCIL_ATTACHMENT | TextureUsage::SAMPLED
        } else {
            TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST
        };
        Self { desc: ImageDesc::new_2d(width, height, format, usage), name: name.to_string() }
    }
}

impl Image for MockImage {
    fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct MockBuffer {
    pub size: u64,
    pub data: Mutex<Vec<u8>>,
}

impl MockBuffer {
    pub fn new(size: u64) -> Self {
        Self { size, data: Mutex::new(vec![0; size as usize]) }
    }
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset as usize + data.len();
        if end > self.size as usize {
            engine_bail!("lr::mock", "Buffer update out of range: {} > {}", end, self.size);
        }
        let mut bytes = self.data.lock().unwrap_or_else(|e| e.into_inner());
        bytes[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct MockPipeline {
    pub bind_point: PipelineBindPoint,
}

impl MockPipeline {
    pub fn new(bind_point: PipelineBindPoint) -> Self {
        Self { bind_point }
    }
}

impl Pipeline for MockPipeline {
    fn bind_point(&self) -> PipelineBindPoint {
        self.bind_point
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct MockSemaphore;

impl Semaphore for MockSemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Fence
// ============================================================================

/// Fence state shared between a fence and its device
#[derive(Debug, Default)]
pub struct MockFenceState {
    pub signaled: AtomicBool,
    pub wait_count: AtomicUsize,
}

#[derive(Debug)]
pub struct MockFence {
    pub state: Arc<MockFenceState>,
}

impl MockFence {
    pub fn signal(&self) {
        self.state.signaled.store(true, Ordering::SeqCst);
    }
}

impl Fence for MockFence {
    fn is_signaled(&self) -> Result<bool> {
        Ok(self.state.signaled.load(Ordering::SeqCst))
    }

    /// Simulates the GPU finishing the work
    fn wait(&self) -> Result<()> {
        self.state.wait_count.fetch_add(1, Ordering::SeqCst);
        self.signal();
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        self.state.signaled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock CommandList
// ============================================================================

#[derive(Debug)]
pub struct MockCommandList {
    pub id: usize,
    pub log: SharedLog,
}

impl MockCommandList {
    fn push(&self, command: impl Into<String>) -> Result<()> {
        lock(&self.log).commands.push(format!("cl{}:{}", self.id, command.into()));
        Ok(())
    }
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        self.push("begin")
    }

    fn end(&mut self) -> Result<()> {
        self.push("end")
    }

    fn reset(&mut self) -> Result<()> {
        self.push("reset")
    }

    fn pipeline_barrier(&mut self, batch: &BarrierBatch<'_>) -> Result<()> {
        let mut src_access = AccessFlags::empty();
        let mut dst_access = AccessFlags::empty();
        for b in batch.image_barriers {
            src_access |= b.src_access;
            dst_access |= b.dst_access;
        }
        for b in batch.buffer_barriers {
            src_access |= b.src_access;
            dst_access |= b.dst_access;
        }
        for b in batch.memory_barriers {
            src_access |= b.src_access;
            dst_access |= b.dst_access;
        }
        lock(&self.log).barriers.push(RecordedBarrier {
            command_list: self.id,
            src_stages: batch.src_stages,
            dst_stages: batch.dst_stages,
            src_access,
            dst_access,
            images: batch.image_barriers.iter().map(|b| (b.old_state, b.new_state)).collect(),
            buffers: batch.buffer_barriers.iter().map(|b| (b.old_state, b.new_state)).collect(),
            memory_count: batch.memory_barriers.len(),
        });
        self.push("barrier")
    }

    fn clear_color_image(&mut self, _image: &Arc<dyn Image>, layout: ImageLayout, _color: [f32; 4]) -> Result<()> {
        self.push(format!("clear_color {:?}", layout))
    }

    fn begin_rendering(&mut self, info: &RenderingInfo) -> Result<()> {
        self.push(format!(
            "begin_rendering {}x{} colors={} depth={}",
            info.render_area.width,
            info.render_area.height,
            info.color_attachments.len(),
            info.depth_attachment.is_some()
        ))
    }

    fn end_rendering(&mut self) -> Result<()> {
        self.push("end_rendering")
    }

    fn set_viewport(&mut self, _viewport: Viewport) -> Result<()> {
        self.push("set_viewport")
    }

    fn set_scissor(&mut self, _scissor: Rect2D) -> Result<()> {
        self.push("set_scissor")
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.push(format!("bind_pipeline {:?}", pipeline.bind_point()))
    }

    fn push_constants(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        _stages: ShaderStages,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        self.push(format!("push_constants {}+{}", offset, data.len()))
    }

    fn bind_vertex_buffer(&mut self, _buffer: &Arc<dyn Buffer>, _offset: u64) -> Result<()> {
        self.push("bind_vertex_buffer")
    }

    fn bind_index_buffer(&mut self, _buffer: &Arc<dyn Buffer>, _offset: u64, _index_type: IndexType) -> Result<()> {
        self.push("bind_index_buffer")
    }

    fn draw(&mut self, vertex_count: u32, _first_vertex: u32) -> Result<()> {
        self.push(format!("draw {}", vertex_count))
    }

    fn draw_indexed(&mut self, index_count: u32, _first_index: u32, _vertex_offset: i32) -> Result<()> {
        self.push(format!("draw_indexed {}", index_count))
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.push(format!("dispatch {}x{}x{}", x, y, z))
    }

    fn dispatch_indirect(&mut self, _buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.push(format!("dispatch_indirect {}", offset))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

#[derive(Debug)]
pub struct MockSwapchain {
    pub images: Vec<Arc<MockImage>>,
    pub width: u32,
    pub height: u32,
    pub next_index: u32,
    pub log: SharedLog,
}

impl MockSwapchain {
    pub fn new(image_count: usize, width: u32, height: u32, log: SharedLog) -> Self {
        let images = (0..image_count)
            .map(|i| Arc::new(MockImage::new(width, height, TextureFormat::B8G8R8A8_SRGB, &format!("swapchain{}", i))))
            .collect();
        Self { images, width, height, next_index: 0, log }
    }
}

impl Swapchain for MockSwapchain {
    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn image(&self, index: u32) -> Option<Arc<dyn Image>> {
        self.images.get(index as usize).map(|i| i.clone() as Arc<dyn Image>)
    }

    fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn format(&self) -> TextureFormat {
        TextureFormat::B8G8R8A8_SRGB
    }

    fn acquire_next_image(&mut self, _signal: &dyn Semaphore) -> Result<u32> {
        let index = self.next_index;
        self.next_index = (self.next_index + 1) % self.images.len() as u32;
        lock(&self.log).commands.push(format!("swapchain:acquire {}", index));
        Ok(index)
    }

    fn present(&mut self, image_index: u32, wait: &[Arc<dyn Semaphore>]) -> Result<()> {
        lock(&self.log).commands.push(format!("swapchain:present {} waits={}", image_index, wait.len()));
        Ok(())
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        let count = self.images.len();
        *self = MockSwapchain::new(count, width, height, self.log.clone());
        lock(&self.log).commands.push(format!("swapchain:recreate {}x{}", width, height));
        Ok(())
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

pub struct MockGraphicsDevice {
    pub log: SharedLog,
    pub fences: Mutex<Vec<Arc<MockFenceState>>>,
    /// Fences of submissions the simulated GPU has not completed
    pub in_flight: Mutex<Vec<Arc<MockFenceState>>>,
    /// Signal the submission fence immediately on submit
    pub auto_signal: AtomicBool,
    /// Reject every submission with `DeviceLost`
    pub fail_submit: AtomicBool,
    pub next_command_list: AtomicUsize,
    pub wait_idle_count: AtomicUsize,
    pub swapchain: Option<MockSwapchain>,
}

impl MockGraphicsDevice {
    /// Headless device, fences signaled on submit
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(MockLog::default())),
            fences: Mutex::new(Vec::new()),
            in_flight: Mutex::new(Vec::new()),
            auto_signal: AtomicBool::new(true),
            fail_submit: AtomicBool::new(false),
            next_command_list: AtomicUsize::new(0),
            wait_idle_count: AtomicUsize::new(0),
            swapchain: None,
        }
    }

    /// Device with a swapchain of `image_count` images
    pub fn with_swapchain(image_count: usize, width: u32, height: u32) -> Self {
        let mut device = Self::new();
        device.swapchain = Some(MockSwapchain::new(image_count, width, height, device.log.clone()));
        device
    }

    pub fn set_auto_signal(&self, enabled: bool) {
        self.auto_signal.store(enabled, Ordering::SeqCst);
    }

    pub fn set_fail_submit(&self, enabled: bool) {
        self.fail_submit.store(enabled, Ordering::SeqCst);
    }

    /// Simulate the GPU completing every submission
    pub fn signal_all_fences(&self) {
        for fence in self.in_flight.lock().unwrap_or_else(|e| e.into_inner()).drain(..) {
            fence.signaled.store(true, Ordering::SeqCst);
        }
    }

    /// Total blocking fence waits over every fence of this device
    pub fn fence_wait_count(&self) -> usize {
        self.fences
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|f| f.wait_count.load(Ordering::SeqCst))
            .sum()
    }

    pub fn log(&self) -> MutexGuard<'_, MockLog> {
        lock(&self.log)
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn name(&self) -> &str {
        "mock"
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        let id = self.next_command_list.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockCommandList { id, log: self.log.clone() }))
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>> {
        let state = Arc::new(MockFenceState::default());
        state.signaled.store(signaled, Ordering::SeqCst);
        self.fences.lock().unwrap_or_else(|e| e.into_inner()).push(state.clone());
        Ok(Box::new(MockFence { state }))
    }

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>> {
        Ok(Arc::new(MockSemaphore))
    }

    fn create_image(&self, desc: &ImageDesc) -> Result<Arc<dyn Image>> {
        Ok(Arc::new(MockImage { desc: desc.clone(), name: String::new() }))
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        Ok(Arc::new(MockBuffer::new(desc.size)))
    }

    fn submit(&self, info: &SubmitInfo<'_>) -> Result<()> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(Error::DeviceLost);
        }
        let command_list = match info.command_list.as_any().downcast_ref::<MockCommandList>() {
            Some(list) => list.id,
            None => engine_bail!("lr::mock", "Submitted command list is not a MockCommandList"),
        };
        lock(&self.log).submits.push(RecordedSubmit {
            command_list,
            wait_count: info.wait_semaphores.len(),
            signal_count: info.signal_semaphores.len(),
            has_fence: info.fence.is_some(),
        });
        if let Some(mock) = info.fence.and_then(|f| f.as_any().downcast_ref::<MockFence>()) {
            if self.auto_signal.load(Ordering::SeqCst) {
                mock.signal();
            } else {
                self.in_flight.lock().unwrap_or_else(|e| e.into_inner()).push(mock.state.clone());
            }
        }
        Ok(())
    }

    fn swapchain(&self) -> Option<&dyn Swapchain> {
        self.swapchain.as_ref().map(|s| s as &dyn Swapchain)
    }

    fn swapchain_mut(&mut self) -> Option<&mut dyn Swapchain> {
        self.swapchain.as_mut().map(|s| s as &mut dyn Swapchain)
    }

    fn wait_idle(&self) -> Result<()> {
        self.wait_idle_count.fetch_add(1, Ordering::SeqCst);
        self.signal_all_fences();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
