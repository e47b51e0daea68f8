/// CommandBuffer - one recordable unit of GPU work
///
/// Owns the native recorder, the completion fence and at most one pending
/// `Transition`. Transitions added while recording are merged into the
/// pending one and emitted as a single barrier at the next flush point
/// (`begin_rendering`, `dispatch`, explicit flush or `end`).

use std::sync::Arc;

use crate::engine_bail_state;
use crate::engine_trace;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, CommandList, Fence, GraphicsDevice, Image, IndexType, Pipeline, Rect2D,
    RenderingInfo, ShaderStages, Viewport,
};
use crate::sync::{ImageLayout, Transition};

pub struct CommandBuffer {
    recorder: Box<dyn CommandList>,
    fence: Box<dyn Fence>,
    /// Kept across flushes so its allocations are reused
    pending: Option<Transition>,
    recording: bool,
}

impl CommandBuffer {
    /// Allocate a recorder and an unsignaled fence
    pub fn new(device: &dyn GraphicsDevice) -> Result<Self> {
        Ok(Self {
            recorder: device.create_command_list()?,
            fence: device.create_fence(false)?,
            pending: None,
            recording: false,
        })
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn fence(&self) -> &dyn Fence {
        self.fence.as_ref()
    }

    pub fn command_list(&self) -> &dyn CommandList {
        self.recorder.as_ref()
    }

    fn ensure_recording(&self, operation: &str) -> Result<()> {
        if !self.recording {
            engine_bail_state!(
                "lr::CommandBuffer",
                "{} called on a command buffer that is not recording",
                operation
            );
        }
        Ok(())
    }

    /// Start recording
    pub fn begin(&mut self) -> Result<()> {
        if self.recording {
            engine_bail_state!(
                "lr::CommandBuffer",
                "begin called on a command buffer that is already recording"
            );
        }
        self.recorder.begin()?;
        self.recording = true;
        Ok(())
    }

    /// Flush pending transitions and stop recording
    pub fn end(&mut self) -> Result<()> {
        self.ensure_recording("end")?;
        self.flush_transitions()?;
        self.recorder.end()?;
        self.recording = false;
        Ok(())
    }

    /// Adopt or merge a transition
    ///
    /// `None` (a no-op state change) is ignored.
    pub fn add_transition(&mut self, transition: Option<Transition>) {
        let Some(transition) = transition else {
            return;
        };
        match self.pending.as_mut() {
            Some(pending) => pending.merge(transition),
            None => self.pending = Some(transition),
        }
    }

    /// True when a non-empty transition is waiting to be flushed
    pub fn has_pending_transition(&self) -> bool {
        self.pending.as_ref().is_some_and(|t| !t.is_empty())
    }

    pub fn pending_transition(&self) -> Option<&Transition> {
        self.pending.as_ref().filter(|t| !t.is_empty())
    }

    /// Emit the pending transition as one pipeline barrier
    ///
    /// Returns true if a barrier was recorded.
    pub fn flush_transitions(&mut self) -> Result<bool> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(false);
        };
        if !pending.build() {
            return Ok(false);
        }
        if !self.recording {
            engine_bail_state!(
                "lr::CommandBuffer",
                "flush_transitions called on a command buffer that is not recording"
            );
        }

        if let Some(batch) = pending.batch() {
            engine_trace!(
                "lr::CommandBuffer",
                "Barrier: {} image(s), {} buffer(s), {:?} -> {:?}",
                batch.image_barriers.len(),
                batch.buffer_barriers.len(),
                batch.src_stages,
                batch.dst_stages
            );
            self.recorder.pipeline_barrier(&batch)?;
        }
        pending.reset();
        Ok(true)
    }

    /// Recycle the buffer once its fence has signaled
    ///
    /// Returns false if the GPU is still executing it and `wait` is false.
    /// With `wait`, blocks until the fence signals and returns true.
    pub fn reset(&mut self, wait: bool) -> Result<bool> {
        if !self.fence.is_signaled()? {
            if !wait {
                return Ok(false);
            }
            self.fence.wait()?;
        }
        self.recycle()?;
        Ok(true)
    }

    /// Throw away recorded work that never reached the GPU
    pub fn discard(&mut self) -> Result<()> {
        self.recycle()
    }

    fn recycle(&mut self) -> Result<()> {
        self.fence.reset()?;
        self.recorder.reset()?;
        if let Some(pending) = self.pending.as_mut() {
            pending.reset();
        }
        self.recording = false;
        Ok(())
    }

    // ===== RECORDING =====

    /// Clear a color image in its current layout
    pub fn clear_color_image(
        &mut self,
        image: &Arc<dyn Image>,
        layout: ImageLayout,
        color: [f32; 4],
    ) -> Result<()> {
        self.ensure_recording("clear_color_image")?;
        self.recorder.clear_color_image(image, layout, color)
    }

    /// Flush pending transitions, then begin dynamic rendering
    pub fn begin_rendering(&mut self, info: &RenderingInfo) -> Result<()> {
        self.ensure_recording("begin_rendering")?;
        self.flush_transitions()?;
        self.recorder.begin_rendering(info)
    }

    pub fn end_rendering(&mut self) -> Result<()> {
        self.ensure_recording("end_rendering")?;
        self.recorder.end_rendering()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.ensure_recording("set_viewport")?;
        self.recorder.set_viewport(viewport)
    }

    pub fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.ensure_recording("set_scissor")?;
        self.recorder.set_scissor(scissor)
    }

    pub fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.ensure_recording("bind_pipeline")?;
        self.recorder.bind_pipeline(pipeline)
    }

    /// Push a plain-old-data value as push constants
    pub fn push_constants<T: bytemuck::Pod>(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        stages: ShaderStages,
        offset: u32,
        value: &T,
    ) -> Result<()> {
        self.ensure_recording("push_constants")?;
        self.recorder.push_constants(pipeline, stages, offset, bytemuck::bytes_of(value))
    }

    pub fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.ensure_recording("bind_vertex_buffer")?;
        self.recorder.bind_vertex_buffer(buffer, offset)
    }

    pub fn bind_index_buffer(
        &mut self,
        buffer: &Arc<dyn Buffer>,
        offset: u64,
        index_type: IndexType,
    ) -> Result<()> {
        self.ensure_recording("bind_index_buffer")?;
        self.recorder.bind_index_buffer(buffer, offset, index_type)
    }

    pub fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.ensure_recording("draw")?;
        self.recorder.draw(vertex_count, first_vertex)
    }

    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        first_index: u32,
        vertex_offset: i32,
    ) -> Result<()> {
        self.ensure_recording("draw_indexed")?;
        self.recorder.draw_indexed(index_count, first_index, vertex_offset)
    }

    /// Flush pending transitions, then dispatch
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.ensure_recording("dispatch")?;
        self.flush_transitions()?;
        self.recorder.dispatch(x, y, z)
    }

    pub fn dispatch_indirect(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.ensure_recording("dispatch_indirect")?;
        self.flush_transitions()?;
        self.recorder.dispatch_indirect(buffer, offset)
    }
}

#[cfg(test)]
#[path = "command_buffer_tests.rs"]
mod tests;
