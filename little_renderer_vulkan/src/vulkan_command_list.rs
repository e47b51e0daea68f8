/// CommandList - Vulkan implementation of the CommandList trait
///
/// Rasterization uses dynamic rendering (Vulkan 1.3), so no render pass or
/// framebuffer objects exist: attachments are passed at `begin_rendering`.

use ash::vk;
use little_renderer::lr::device::{
    Buffer as LrBuffer, CommandList as LrCommandList, Image as LrImage, IndexType,
    Pipeline as LrPipeline, Rect2D, RenderingAttachment, RenderingInfo, ShaderStages, Viewport,
};
use little_renderer::lr::sync::{BarrierBatch, ImageLayout};
use little_renderer::lr::Result;
use little_renderer::{engine_bail, engine_err};
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_buffer::vk_buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_convert::{
    access_to_vk, bind_point_to_vk, clear_value_to_vk, index_type_to_vk, layout_to_vk,
    load_op_to_vk, rect_to_vk, shader_stages_to_vk, stages_to_vk, store_op_to_vk,
    subresource_range_to_vk, viewport_to_vk,
};
use crate::vulkan_image::vk_image;
use crate::vulkan_pipeline::vk_pipeline;

/// Vulkan command list implementation
///
/// One primary command buffer from its own resettable pool.
pub struct CommandList {
    ctx: Arc<GpuContext>,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    is_recording: bool,
    in_rendering: bool,
}

impl CommandList {
    pub fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = ctx.device.create_command_pool(&pool_info, None)
                .map_err(|e| engine_err!("lr::vulkan", "Failed to create command pool: {:?}", e))?;

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = match ctx.device.allocate_command_buffers(&allocate_info) {
                Ok(buffers) => buffers[0],
                Err(e) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    return Err(engine_err!("lr::vulkan", "Failed to allocate command buffer: {:?}", e));
                }
            };

            Ok(Self {
                ctx,
                command_pool,
                command_buffer,
                is_recording: false,
                in_rendering: false,
            })
        }
    }

    /// Get the underlying Vulkan command buffer
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    fn ensure_recording(&self, what: &str) -> Result<()> {
        if !self.is_recording {
            engine_bail!("lr::vulkan", "{}: command list is not recording", what);
        }
        Ok(())
    }

    fn attachment_info(attachment: &RenderingAttachment) -> Result<vk::RenderingAttachmentInfo<'static>> {
        let (_, view) = vk_image(attachment.image.as_ref())?;
        Ok(vk::RenderingAttachmentInfo::default()
            .image_view(view)
            .image_layout(layout_to_vk(attachment.layout))
            .load_op(load_op_to_vk(attachment.load_op))
            .store_op(store_op_to_vk(attachment.store_op))
            .clear_value(clear_value_to_vk(attachment.clear_value)))
    }
}

impl LrCommandList for CommandList {
    fn begin(&mut self) -> Result<()> {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { self.ctx.device.begin_command_buffer(self.command_buffer, &begin_info) }
            .map_err(|e| engine_err!("lr::vulkan", "Failed to begin command buffer: {:?}", e))?;
        self.is_recording = true;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.ensure_recording("end")?;
        if self.in_rendering {
            engine_bail!("lr::vulkan", "end called inside a rendering scope");
        }
        unsafe { self.ctx.device.end_command_buffer(self.command_buffer) }
            .map_err(|e| engine_err!("lr::vulkan", "Failed to end command buffer: {:?}", e))?;
        self.is_recording = false;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        unsafe {
            self.ctx.device.reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
        }
        .map_err(|e| engine_err!("lr::vulkan", "Failed to reset command buffer: {:?}", e))?;
        self.is_recording = false;
        self.in_rendering = false;
        Ok(())
    }

    fn pipeline_barrier(&mut self, batch: &BarrierBatch<'_>) -> Result<()> {
        self.ensure_recording("pipeline_barrier")?;

        let memory_barriers: Vec<vk::MemoryBarrier> = batch
            .memory_barriers
            .iter()
            .map(|b| {
                vk::MemoryBarrier::default()
                    .src_access_mask(access_to_vk(b.src_access))
                    .dst_access_mask(access_to_vk(b.dst_access))
            })
            .collect();

        let mut buffer_barriers = Vec::with_capacity(batch.buffer_barriers.len());
        for b in batch.buffer_barriers {
            buffer_barriers.push(
                vk::BufferMemoryBarrier::default()
                    .src_access_mask(access_to_vk(b.src_access))
                    .dst_access_mask(access_to_vk(b.dst_access))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .buffer(vk_buffer(b.buffer.as_ref())?)
                    .offset(b.offset)
                    .size(b.size),
            );
        }

        let mut image_barriers = Vec::with_capacity(batch.image_barriers.len());
        for b in batch.image_barriers {
            let (image, _) = vk_image(b.image.as_ref())?;
            image_barriers.push(
                vk::ImageMemoryBarrier::default()
                    .old_layout(layout_to_vk(b.old_layout))
                    .new_layout(layout_to_vk(b.new_layout))
                    .src_access_mask(access_to_vk(b.src_access))
                    .dst_access_mask(access_to_vk(b.dst_access))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(image)
                    .subresource_range(subresource_range_to_vk(&b.range)),
            );
        }

        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                self.command_buffer,
                stages_to_vk(batch.src_stages),
                stages_to_vk(batch.dst_stages),
                vk::DependencyFlags::empty(),
                &memory_barriers,
                &buffer_barriers,
                &image_barriers,
            );
        }
        Ok(())
    }

    fn clear_color_image(&mut self, image: &Arc<dyn LrImage>, layout: ImageLayout, color: [f32; 4]) -> Result<()> {
        self.ensure_recording("clear_color_image")?;
        let (vk_img, _) = vk_image(image.as_ref())?;
        let range = subresource_range_to_vk(&image.desc().full_range());
        unsafe {
            self.ctx.device.cmd_clear_color_image(
                self.command_buffer,
                vk_img,
                layout_to_vk(layout),
                &vk::ClearColorValue { float32: color },
                &[range],
            );
        }
        Ok(())
    }

    fn begin_rendering(&mut self, info: &RenderingInfo) -> Result<()> {
        self.ensure_recording("begin_rendering")?;
        if self.in_rendering {
            engine_bail!("lr::vulkan", "begin_rendering called inside a rendering scope");
        }

        let color_attachments = info
            .color_attachments
            .iter()
            .map(Self::attachment_info)
            .collect::<Result<Vec<_>>>()?;
        let depth_attachment = info.depth_attachment.as_ref().map(Self::attachment_info).transpose()?;

        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(rect_to_vk(info.render_area))
            .layer_count(1)
            .color_attachments(&color_attachments);
        if let Some(depth) = depth_attachment.as_ref() {
            rendering_info = rendering_info.depth_attachment(depth);
        }

        unsafe {
            self.ctx.device.cmd_begin_rendering(self.command_buffer, &rendering_info);
        }
        self.in_rendering = true;
        Ok(())
    }

    fn end_rendering(&mut self) -> Result<()> {
        if !self.in_rendering {
            engine_bail!("lr::vulkan", "end_rendering called outside a rendering scope");
        }
        unsafe {
            self.ctx.device.cmd_end_rendering(self.command_buffer);
        }
        self.in_rendering = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.ensure_recording("set_viewport")?;
        unsafe {
            self.ctx.device.cmd_set_viewport(self.command_buffer, 0, &[viewport_to_vk(viewport)]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.ensure_recording("set_scissor")?;
        unsafe {
            self.ctx.device.cmd_set_scissor(self.command_buffer, 0, &[rect_to_vk(scissor)]);
        }
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn LrPipeline>) -> Result<()> {
        self.ensure_recording("bind_pipeline")?;
        let vk_pipe = vk_pipeline(pipeline.as_ref())?;
        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                self.command_buffer,
                bind_point_to_vk(vk_pipe.bind_point()),
                vk_pipe.pipeline,
            );
        }
        Ok(())
    }

    fn push_constants(
        &mut self,
        pipeline: &Arc<dyn LrPipeline>,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        self.ensure_recording("push_constants")?;
        let vk_pipe = vk_pipeline(pipeline.as_ref())?;
        unsafe {
            self.ctx.device.cmd_push_constants(
                self.command_buffer,
                vk_pipe.layout,
                shader_stages_to_vk(stages),
                offset,
                data,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn LrBuffer>, offset: u64) -> Result<()> {
        self.ensure_recording("bind_vertex_buffer")?;
        let vk_buf = vk_buffer(buffer.as_ref())?;
        unsafe {
            self.ctx.device.cmd_bind_vertex_buffers(self.command_buffer, 0, &[vk_buf], &[offset]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn LrBuffer>, offset: u64, index_type: IndexType) -> Result<()> {
        self.ensure_recording("bind_index_buffer")?;
        let vk_buf = vk_buffer(buffer.as_ref())?;
        unsafe {
            self.ctx.device.cmd_bind_index_buffer(self.command_buffer, vk_buf, offset, index_type_to_vk(index_type));
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.ensure_recording("draw")?;
        unsafe {
            self.ctx.device.cmd_draw(self.command_buffer, vertex_count, 1, first_vertex, 0);
        }
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.ensure_recording("draw_indexed")?;
        unsafe {
            self.ctx.device.cmd_draw_indexed(self.command_buffer, index_count, 1, first_index, vertex_offset, 0);
        }
        Ok(())
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.ensure_recording("dispatch")?;
        unsafe {
            self.ctx.device.cmd_dispatch(self.command_buffer, x, y, z);
        }
        Ok(())
    }

    fn dispatch_indirect(&mut self, buffer: &Arc<dyn LrBuffer>, offset: u64) -> Result<()> {
        self.ensure_recording("dispatch_indirect")?;
        let vk_buf = vk_buffer(buffer.as_ref())?;
        unsafe {
            self.ctx.device.cmd_dispatch_indirect(self.command_buffer, vk_buf, offset);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        unsafe {
            // Destroying the pool frees its command buffer
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
