/// CommandList trait - native command recorder

use std::any::Any;
use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{Buffer, Image, Pipeline, ShaderStages};
use crate::sync::{BarrierBatch, ImageLayout};

/// Native command recorder owned by one CommandBuffer
///
/// Commands are recorded between `begin` and `end`, then executed through
/// `GraphicsDevice::submit`.
pub trait CommandList: Send + Sync {
    /// Begin recording commands
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Discard recorded commands
    fn reset(&mut self) -> Result<()>;

    /// Record one pipeline barrier holding every barrier of the batch
    fn pipeline_barrier(&mut self, batch: &BarrierBatch<'_>) -> Result<()>;

    /// Clear a color image outside of rendering
    ///
    /// # Arguments
    ///
    /// * `image` - Image to clear
    /// * `layout` - Layout the image is currently in
    /// * `color` - RGBA clear color
    fn clear_color_image(&mut self, image: &Arc<dyn Image>, layout: ImageLayout, color: [f32; 4]) -> Result<()>;

    /// Begin dynamic rendering into the given attachments
    fn begin_rendering(&mut self, info: &RenderingInfo) -> Result<()>;

    /// End dynamic rendering
    fn end_rendering(&mut self) -> Result<()>;

    /// Set the viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Set the scissor rectangle
    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Bind a pipeline at its own bind point
    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    /// Push constants to the bound pipeline
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Pipeline whose layout declares the range
    /// * `stages` - Shader stages that will access the push constants
    /// * `offset` - Offset in bytes into push constant range
    /// * `data` - Data to push
    fn push_constants(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    ) -> Result<()>;

    /// Bind a vertex buffer at binding 0
    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    /// Bind an index buffer
    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()>;

    /// Draw vertices
    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()>;

    /// Draw indexed vertices
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()>;

    /// Dispatch compute work groups
    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()>;

    /// Dispatch compute work groups read from a buffer
    fn dispatch_indirect(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-extent viewport with depth range 0..1
    pub fn from_extent(width: u32, height: u32) -> Self {
        Self { x: 0.0, y: 0.0, width: width as f32, height: height as f32, min_depth: 0.0, max_depth: 1.0 }
    }
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn from_extent(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}

/// Index element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

/// What happens to attachment contents when rendering begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentLoadOp {
    Load,
    Clear,
    DontCare,
}

/// What happens to attachment contents when rendering ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentStoreOp {
    Store,
    DontCare,
}

/// One attachment of a dynamic rendering scope
#[derive(Clone)]
pub struct RenderingAttachment {
    pub image: Arc<dyn Image>,
    /// Layout the image is in while rendering
    pub layout: ImageLayout,
    pub load_op: AttachmentLoadOp,
    pub store_op: AttachmentStoreOp,
    pub clear_value: ClearValue,
}

/// Parameters of `CommandList::begin_rendering`
#[derive(Clone)]
pub struct RenderingInfo {
    pub render_area: Rect2D,
    pub color_attachments: Vec<RenderingAttachment>,
    pub depth_attachment: Option<RenderingAttachment>,
}
