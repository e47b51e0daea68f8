/// Renderpass - one orderable unit of GPU work
///
/// A renderpass owns a render target, the drawables it records and three
/// declaration lists: transitions applied before the pass, transitions
/// applied after it, and textures cleared before the target begins. The pass
/// infers nothing; every hazard is declared by its owner.

use std::sync::Arc;

use crate::command::CommandBuffer;
use crate::error::Result;
use crate::graphics_device::{AttachmentLoadOp, AttachmentStoreOp, ClearValue, GraphicsDevice};
use crate::render_graph::{Attachment, Drawable, FrameInfo, ObjectId, RenderTarget, RenderTargetType};
use crate::resource::{Texture, TrackedResource};
use crate::sync::{ImageLayout, ResourceState};
use crate::{engine_bail_state, engine_debug, engine_trace};

/// Declared state change of a resource
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub resource: TrackedResource,
    pub state: ResourceState,
}

/// Texture cleared before the target begins
#[derive(Debug, Clone)]
pub struct ClearRequest {
    pub texture: Arc<Texture>,
    pub color: [f32; 4],
}

pub struct Renderpass {
    name: String,
    kind: RenderTargetType,
    target: Option<RenderTarget>,
    objects: Vec<Box<dyn Drawable>>,
    begin_transitions: Vec<TransitionRequest>,
    end_transitions: Vec<TransitionRequest>,
    clears: Vec<ClearRequest>,
    built: bool,
}

impl Renderpass {
    /// Unbuilt pass without a target (internal: only via RenderGraph)
    pub(crate) fn new(name: &str, kind: RenderTargetType) -> Self {
        Self {
            name: name.to_string(),
            kind,
            target: None,
            objects: Vec::new(),
            begin_transitions: Vec::new(),
            end_transitions: Vec::new(),
            clears: Vec::new(),
            built: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn kind(&self) -> RenderTargetType {
        self.kind
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    // ===== TARGET =====

    /// Create the variant's target, replacing any previous one
    pub fn init_render_target(&mut self, width: u32, height: u32) -> &mut RenderTarget {
        self.target.insert(RenderTarget::new(self.kind, width, height))
    }

    pub fn render_target(&self) -> Option<&RenderTarget> {
        self.target.as_ref()
    }

    pub fn render_target_mut(&mut self) -> Option<&mut RenderTarget> {
        self.target.as_mut()
    }

    fn target_for(&mut self, texture: &Texture) -> &mut RenderTarget {
        let (width, height) = texture.extent();
        let kind = self.kind;
        self.target.get_or_insert_with(|| RenderTarget::new(kind, width, height))
    }

    /// Attach a color texture; creates the target at the texture size if needed
    pub fn add_color_attachment(
        &mut self,
        texture: &Arc<Texture>,
        load_op: AttachmentLoadOp,
        store_op: AttachmentStoreOp,
        clear_color: [f32; 4],
    ) -> Result<()> {
        let attachment = Attachment::new(texture.clone(), load_op, store_op, ClearValue::Color(clear_color));
        self.target_for(texture).add_color_attachment(attachment)
    }

    /// Attach a depth texture; creates the target at the texture size if needed
    pub fn set_depth_attachment(
        &mut self,
        texture: &Arc<Texture>,
        load_op: AttachmentLoadOp,
        store_op: AttachmentStoreOp,
        depth: f32,
        stencil: u32,
    ) -> Result<()> {
        let attachment = Attachment::new(texture.clone(), load_op, store_op, ClearValue::DepthStencil { depth, stencil });
        self.target_for(texture).set_depth_attachment(attachment)
    }

    // ===== DECLARATIONS =====

    /// Move `resource` to `state` before the pass records anything
    pub fn add_begin_transition(&mut self, resource: impl Into<TrackedResource>, state: ResourceState) {
        self.begin_transitions.push(TransitionRequest { resource: resource.into(), state });
    }

    /// Move `resource` to `state` after the pass; left pending for the next consumer
    pub fn add_end_transition(&mut self, resource: impl Into<TrackedResource>, state: ResourceState) {
        self.end_transitions.push(TransitionRequest { resource: resource.into(), state });
    }

    /// Clear `texture` to `color` before the target begins
    pub fn add_clear_color_texture(&mut self, texture: &Arc<Texture>, color: [f32; 4]) {
        self.clears.push(ClearRequest { texture: texture.clone(), color });
    }

    pub fn begin_transitions(&self) -> &[TransitionRequest] {
        &self.begin_transitions
    }

    pub fn end_transitions(&self) -> &[TransitionRequest] {
        &self.end_transitions
    }

    pub fn clears(&self) -> &[ClearRequest] {
        &self.clears
    }

    // ===== OBJECTS =====

    /// Register a drawable; objects draw in registration order
    pub fn generate_object(&mut self, drawable: impl Drawable + 'static) -> ObjectId {
        self.objects.push(Box::new(drawable));
        ObjectId(self.objects.len() - 1)
    }

    pub fn object(&self, id: ObjectId) -> Option<&dyn Drawable> {
        self.objects.get(id.0).map(|o| o.as_ref())
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut (dyn Drawable + 'static)> {
        self.objects.get_mut(id.0).map(|o| o.as_mut())
    }

    pub fn objects(&self) -> impl Iterator<Item = &dyn Drawable> + '_ {
        self.objects.iter().map(|o| o.as_ref())
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    // ===== LIFECYCLE =====

    /// Prepare CPU-side data of every object
    pub fn pre_build(&mut self) -> Result<()> {
        for object in &mut self.objects {
            object.pre_build()?;
        }
        Ok(())
    }

    /// Finalize the target and build every object against it
    ///
    /// A pass without a target gets one of `default_extent`.
    pub fn build(&mut self, device: &dyn GraphicsDevice, default_extent: (u32, u32)) -> Result<()> {
        let kind = self.kind;
        let target = self
            .target
            .get_or_insert_with(|| RenderTarget::new(kind, default_extent.0, default_extent.1));
        for object in &mut self.objects {
            object.build(target, device)?;
        }
        self.built = true;
        engine_debug!(
            "lr::Renderpass",
            "Built {:?} renderpass '{}' ({} objects)",
            self.kind,
            self.name,
            self.objects.len()
        );
        Ok(())
    }

    /// Record the pass into `cmd`
    ///
    /// Fixed order: begin transitions, clears (after a flush), target begin,
    /// objects in registration order, target end, end transitions. End
    /// transitions stay pending so they merge with the next pass's begin
    /// transitions into one barrier.
    pub fn render(&mut self, cmd: &mut CommandBuffer, frame: &FrameInfo<'_>) -> Result<()> {
        if !self.built {
            engine_bail_state!("lr::Renderpass", "Renderpass '{}' rendered before build", self.name);
        }
        let Some(target) = self.target.as_ref() else {
            engine_bail_state!("lr::Renderpass", "Renderpass '{}' has no render target", self.name);
        };
        engine_trace!("lr::Renderpass", "Rendering '{}'", self.name);

        for request in &self.begin_transitions {
            cmd.add_transition(request.resource.update_layout_and_barrier(request.state));
        }

        if !self.clears.is_empty() {
            for clear in &self.clears {
                // Clears need a transfer-capable layout
                if !matches!(clear.texture.state().layout(), ImageLayout::General | ImageLayout::TransferDstOptimal) {
                    cmd.add_transition(clear.texture.update_layout_and_barrier(ResourceState::TransferDst));
                }
            }
            cmd.flush_transitions()?;
            for clear in &self.clears {
                cmd.clear_color_image(clear.texture.image(), clear.texture.state().layout(), clear.color)?;
            }
        }

        target.begin(cmd, frame)?;
        for object in &mut self.objects {
            object.draw(cmd)?;
        }
        target.end(cmd)?;

        for request in &self.end_transitions {
            cmd.add_transition(request.resource.update_layout_and_barrier(request.state));
        }
        Ok(())
    }

    /// Destroy objects, then the target
    pub fn destroy(&mut self) {
        for object in &mut self.objects {
            object.destroy();
        }
        self.objects.clear();
        self.target = None;
        self.built = false;
    }
}

#[cfg(test)]
#[path = "renderpass_tests.rs"]
mod tests;
