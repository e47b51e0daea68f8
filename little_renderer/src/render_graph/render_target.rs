/// Render target of a renderpass.
///
/// Graphics and surface targets own attachments and open a dynamic rendering
/// scope. Compute and ray tracing passes get a null target that only flushes
/// pending transitions.

use std::sync::Arc;

use crate::command::{CommandBuffer, Queue};
use crate::engine_bail_state;
use crate::error::Result;
use crate::graphics_device::{
    AttachmentLoadOp, AttachmentStoreOp, ClearValue, Rect2D, RenderingAttachment, RenderingInfo,
    Viewport,
};
use crate::resource::Texture;
use crate::sync::ResourceState;

/// Closed set of pass and target variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTargetType {
    /// Offscreen rasterization into owned attachments
    Graphics,
    /// Rasterization into the current swapchain image
    Surface,
    Compute,
    RayTracing,
}

impl RenderTargetType {
    /// Compute and ray tracing passes render into nothing
    pub fn is_null(&self) -> bool {
        matches!(self, RenderTargetType::Compute | RenderTargetType::RayTracing)
    }
}

/// One color or depth attachment
#[derive(Debug, Clone)]
pub struct Attachment {
    pub texture: Arc<Texture>,
    pub load_op: AttachmentLoadOp,
    pub store_op: AttachmentStoreOp,
    pub clear_value: ClearValue,
}

impl Attachment {
    pub fn new(texture: Arc<Texture>, load_op: AttachmentLoadOp, store_op: AttachmentStoreOp, clear_value: ClearValue) -> Self {
        Self { texture, load_op, store_op, clear_value }
    }

    fn rendering_attachment(&self) -> RenderingAttachment {
        RenderingAttachment {
            image: self.texture.image().clone(),
            layout: self.texture.state().layout(),
            load_op: self.load_op,
            store_op: self.store_op,
            clear_value: self.clear_value,
        }
    }
}

/// Per-frame inputs of a render target
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo<'a> {
    /// Acquired swapchain image, if any
    pub image_index: Option<u32>,
    pub swapchain_textures: &'a [Arc<Texture>],
}

impl FrameInfo<'static> {
    /// Frame without a swapchain
    pub fn offscreen() -> Self {
        FrameInfo { image_index: None, swapchain_textures: &[] }
    }
}

impl<'a> FrameInfo<'a> {
    /// Texture of the acquired swapchain image
    pub fn swapchain_texture(&self) -> Option<&'a Arc<Texture>> {
        self.image_index.and_then(|i| self.swapchain_textures.get(i as usize))
    }
}

#[derive(Debug)]
pub struct RenderTarget {
    kind: RenderTargetType,
    width: u32,
    height: u32,
    color_attachments: Vec<Attachment>,
    depth_attachment: Option<Attachment>,
    /// Ops applied to the swapchain image of a surface target
    surface_load_op: AttachmentLoadOp,
    surface_clear: ClearValue,
}

impl RenderTarget {
    pub fn new(kind: RenderTargetType, width: u32, height: u32) -> Self {
        Self {
            kind,
            width,
            height,
            color_attachments: Vec::new(),
            depth_attachment: None,
            surface_load_op: AttachmentLoadOp::Clear,
            surface_clear: ClearValue::Color([0.0, 0.0, 0.0, 1.0]),
        }
    }

    pub fn kind(&self) -> RenderTargetType {
        self.kind
    }

    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn color_attachments(&self) -> &[Attachment] {
        &self.color_attachments
    }

    pub fn depth_attachment(&self) -> Option<&Attachment> {
        self.depth_attachment.as_ref()
    }

    pub fn add_color_attachment(&mut self, attachment: Attachment) -> Result<()> {
        if self.kind.is_null() {
            engine_bail_state!("lr::RenderTarget", "{:?} targets have no attachments", self.kind);
        }
        if attachment.texture.is_depth() {
            engine_bail_state!("lr::RenderTarget", "Texture '{}' is a depth texture", attachment.texture.name());
        }
        self.color_attachments.push(attachment);
        Ok(())
    }

    pub fn set_depth_attachment(&mut self, attachment: Attachment) -> Result<()> {
        if self.kind.is_null() {
            engine_bail_state!("lr::RenderTarget", "{:?} targets have no attachments", self.kind);
        }
        if !attachment.texture.is_depth() {
            engine_bail_state!("lr::RenderTarget", "Texture '{}' is not a depth texture", attachment.texture.name());
        }
        self.depth_attachment = Some(attachment);
        Ok(())
    }

    /// Load op and clear value for the swapchain image of a surface target
    pub fn set_surface_ops(&mut self, load_op: AttachmentLoadOp, clear: ClearValue) {
        self.surface_load_op = load_op;
        self.surface_clear = clear;
    }

    /// Apply attachment transitions and open the target
    pub fn begin(&self, cmd: &mut CommandBuffer, frame: &FrameInfo<'_>) -> Result<()> {
        if self.kind.is_null() {
            cmd.flush_transitions()?;
            return Ok(());
        }

        let mut colors = Vec::with_capacity(self.color_attachments.len() + 1);
        let mut render_area = Rect2D::from_extent(self.width, self.height);

        if self.kind == RenderTargetType::Surface {
            let Some(texture) = frame.swapchain_texture() else {
                engine_bail_state!("lr::RenderTarget", "Surface target used without an acquired swapchain image");
            };
            let mut acquire = texture.update_layout_and_barrier(ResourceState::ColorAttachment);
            if let Some(transition) = acquire.as_mut() {
                transition.add_src_stages(Queue::ACQUIRE_WAIT_STAGES);
            }
            cmd.add_transition(acquire);
            let (width, height) = texture.extent();
            render_area = Rect2D::from_extent(width, height);
            colors.push(Attachment::new(
                texture.clone(),
                self.surface_load_op,
                AttachmentStoreOp::Store,
                self.surface_clear,
            ));
        }

        for attachment in &self.color_attachments {
            cmd.add_transition(attachment.texture.update_layout_and_barrier(ResourceState::ColorAttachment));
        }
        if let Some(depth) = &self.depth_attachment {
            cmd.add_transition(depth.texture.update_layout_and_barrier(ResourceState::DepthStencilAttachment));
        }
        cmd.flush_transitions()?;

        colors.extend(self.color_attachments.iter().cloned());
        let info = RenderingInfo {
            render_area,
            color_attachments: colors.iter().map(Attachment::rendering_attachment).collect(),
            depth_attachment: self.depth_attachment.as_ref().map(Attachment::rendering_attachment),
        };
        cmd.begin_rendering(&info)?;
        cmd.set_viewport(Viewport::from_extent(render_area.width, render_area.height))?;
        cmd.set_scissor(render_area)?;
        Ok(())
    }

    /// Close the target
    pub fn end(&self, cmd: &mut CommandBuffer) -> Result<()> {
        if self.kind.is_null() {
            return Ok(());
        }
        cmd.end_rendering()
    }
}
