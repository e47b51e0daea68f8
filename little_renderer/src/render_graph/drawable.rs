/// Drawable - an object a renderpass draws every frame

use crate::command::CommandBuffer;
use crate::error::Result;
use crate::graphics_device::GraphicsDevice;
use crate::render_graph::RenderTarget;

/// Index of an object within its renderpass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) usize);

impl ObjectId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Drawable object capability
///
/// Mesh data, materials and pipeline state live behind this trait; the
/// render graph only sequences the calls.
pub trait Drawable: Send {
    /// Prepare CPU-side data
    fn pre_build(&mut self) -> Result<()> {
        Ok(())
    }

    /// Create GPU-side data (pipelines, buffers) against the pass target
    fn build(&mut self, _target: &RenderTarget, _device: &dyn GraphicsDevice) -> Result<()> {
        Ok(())
    }

    /// Record draw or dispatch commands
    fn draw(&mut self, cmd: &mut CommandBuffer) -> Result<()>;

    /// Release GPU-side data
    fn destroy(&mut self) {}
}
