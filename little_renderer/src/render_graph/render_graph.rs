/// Render graph - ordered renderpasses plus one optional surface pass.
///
/// Execution order is registration order. That is the graph's only
/// scheduling decision; producer passes must be registered before their
/// consumers.

use rustc_hash::FxHashMap;

use crate::command::CommandBuffer;
use crate::context::GraphicsContext;
use crate::error::Result;
use crate::graphics_device::GraphicsDevice;
use crate::render_graph::{FrameInfo, RenderTargetType, Renderpass};
use crate::{engine_bail_state, engine_debug};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassSlot {
    Offscreen(usize),
    Surface,
}

#[derive(Default)]
pub struct RenderGraph {
    offscreen: Vec<Renderpass>,
    surface: Option<Renderpass>,
    index: FxHashMap<String, PassSlot>,
    built: bool,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pass at the end of the execution order
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the name is taken, or if `kind` is
    /// `Surface` and a surface pass already exists.
    pub fn allocate_renderpass(&mut self, name: &str, kind: RenderTargetType) -> Result<&mut Renderpass> {
        if self.index.contains_key(name) {
            engine_bail_state!("lr::RenderGraph", "Renderpass '{}' already exists", name);
        }

        if kind == RenderTargetType::Surface {
            if let Some(existing) = &self.surface {
                engine_bail_state!(
                    "lr::RenderGraph",
                    "Cannot register surface pass '{}': '{}' is already the surface pass",
                    name,
                    existing.name()
                );
            }
            self.built = false;
            self.index.insert(name.to_string(), PassSlot::Surface);
            engine_debug!("lr::RenderGraph", "Allocated surface renderpass '{}'", name);
            return Ok(self.surface.insert(Renderpass::new(name, kind)));
        }

        self.built = false;
        self.index.insert(name.to_string(), PassSlot::Offscreen(self.offscreen.len()));
        self.offscreen.push(Renderpass::new(name, kind));
        engine_debug!("lr::RenderGraph", "Allocated {:?} renderpass '{}'", kind, name);
        let last = self.offscreen.len() - 1;
        Ok(&mut self.offscreen[last])
    }

    /// Rename a pass, keeping its position
    pub fn rename_renderpass(&mut self, name: &str, new_name: &str) -> Result<()> {
        if self.index.contains_key(new_name) {
            engine_bail_state!("lr::RenderGraph", "Renderpass '{}' already exists", new_name);
        }
        let Some(slot) = self.index.remove(name) else {
            engine_bail_state!("lr::RenderGraph", "Renderpass '{}' not found", name);
        };
        self.index.insert(new_name.to_string(), slot);
        if let Some(pass) = self.slot_mut(slot) {
            pass.set_name(new_name);
        }
        Ok(())
    }

    fn slot_mut(&mut self, slot: PassSlot) -> Option<&mut Renderpass> {
        match slot {
            PassSlot::Offscreen(i) => self.offscreen.get_mut(i),
            PassSlot::Surface => self.surface.as_mut(),
        }
    }

    pub fn renderpass(&self, name: &str) -> Option<&Renderpass> {
        match *self.index.get(name)? {
            PassSlot::Offscreen(i) => self.offscreen.get(i),
            PassSlot::Surface => self.surface.as_ref(),
        }
    }

    pub fn renderpass_mut(&mut self, name: &str) -> Option<&mut Renderpass> {
        let slot = *self.index.get(name)?;
        self.slot_mut(slot)
    }

    pub fn surface_renderpass(&self) -> Option<&Renderpass> {
        self.surface.as_ref()
    }

    pub fn surface_renderpass_mut(&mut self) -> Option<&mut Renderpass> {
        self.surface.as_mut()
    }

    /// Offscreen passes in execution order
    pub fn offscreen_renderpasses(&self) -> impl Iterator<Item = &Renderpass> + '_ {
        self.offscreen.iter()
    }

    pub fn has_offscreen_renderpass(&self) -> bool {
        !self.offscreen.is_empty()
    }

    pub fn has_surface_renderpass(&self) -> bool {
        self.surface.is_some()
    }

    /// Offscreen passes plus the surface pass
    pub fn renderpass_count(&self) -> usize {
        self.offscreen.len() + usize::from(self.surface.is_some())
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    // ===== LIFECYCLE =====

    /// Pre-build and build every pass: offscreen in order, then the surface
    ///
    /// Passes without a target get one of `default_extent`.
    pub fn build_with(&mut self, device: &dyn GraphicsDevice, default_extent: (u32, u32)) -> Result<()> {
        for pass in self.offscreen.iter_mut().chain(self.surface.iter_mut()) {
            pass.pre_build()?;
            pass.build(device, default_extent)?;
        }
        self.built = true;
        engine_debug!("lr::RenderGraph", "Built render graph ({} passes)", self.renderpass_count());
        Ok(())
    }

    /// Build against the context's device and surface extent
    pub fn build(&mut self, ctx: &GraphicsContext) -> Result<()> {
        self.build_with(ctx.device(), ctx.surface_extent())
    }

    /// Record every offscreen pass, in registration order
    pub fn record(&mut self, cmd: &mut CommandBuffer, frame: &FrameInfo<'_>) -> Result<()> {
        if !self.built {
            engine_bail_state!("lr::RenderGraph", "Render graph rendered before build");
        }
        for pass in &mut self.offscreen {
            pass.render(cmd, frame)?;
        }
        Ok(())
    }

    /// Record the surface pass
    pub fn record_surface(&mut self, cmd: &mut CommandBuffer, frame: &FrameInfo<'_>) -> Result<()> {
        if !self.built {
            engine_bail_state!("lr::RenderGraph", "Render graph rendered before build");
        }
        let Some(surface) = self.surface.as_mut() else {
            engine_bail_state!("lr::RenderGraph", "render_surface called without a surface renderpass");
        };
        surface.render(cmd, frame)
    }

    /// Record every offscreen pass into the context's active buffer
    pub fn render(&mut self, ctx: &mut GraphicsContext) -> Result<()> {
        let (cmd, frame) = ctx.frame()?;
        self.record(cmd, &frame)
    }

    /// Record the surface pass into the context's active buffer
    pub fn render_surface(&mut self, ctx: &mut GraphicsContext) -> Result<()> {
        let (cmd, frame) = ctx.frame()?;
        self.record_surface(cmd, &frame)
    }

    /// Tear down all offscreen passes, then the surface pass
    pub fn destroy(&mut self) {
        for pass in self.offscreen.iter_mut().rev() {
            pass.destroy();
        }
        if let Some(surface) = self.surface.as_mut() {
            surface.destroy();
        }
        self.offscreen.clear();
        self.surface = None;
        self.index.clear();
        self.built = false;
    }

    /// Remove a pass by name
    pub fn remove_renderpass(&mut self, name: &str) -> Result<()> {
        let Some(slot) = self.index.remove(name) else {
            engine_bail_state!("lr::RenderGraph", "Renderpass '{}' not found", name);
        };
        match slot {
            PassSlot::Surface => {
                if let Some(mut pass) = self.surface.take() {
                    pass.destroy();
                }
            }
            PassSlot::Offscreen(i) => {
                let mut pass = self.offscreen.remove(i);
                pass.destroy();
                for slot in self.index.values_mut() {
                    if let PassSlot::Offscreen(j) = slot {
                        if *j > i {
                            *j -= 1;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "render_graph_tests.rs"]
mod tests;
