/*!
# Little Renderer

Frame synchronization and pass scheduling core for explicit GPU APIs.

The crate tracks the synchronization state of every GPU resource, batches
the barriers needed to move resources between states, pools command buffers
behind fences and executes an ordered list of renderpasses each frame. The
graphics API itself sits behind object-safe traits; the Vulkan backend lives
in `little_renderer_vulkan`.

## Architecture

- **ResourceState**: closed set of resource usages, each with a constant
  layout/stage/access record
- **Transition**: barrier batch accumulated between two recording points
- **CommandBuffer**: recorder plus fence plus pending transitions
- **CommandBufferManager**: pool handing out the active and upload buffers
- **Queue**: submission and presentation
- **Renderpass / RenderTarget**: one unit of GPU work and what it renders into
- **RenderGraph**: ordered renderpasses plus one surface pass
- **GraphicsContext**: explicit owner of the device and per-frame state

Everything is reached through the `lr` namespace:

```no_run
use little_renderer::lr;

fn frame(ctx: &mut lr::GraphicsContext, graph: &mut lr::render::RenderGraph) -> lr::Result<()> {
    ctx.acquire_next_image()?;
    graph.render(ctx)?;
    graph.render_surface(ctx)?;
    ctx.present()
}
```
*/

// Internal modules
mod error;
mod engine;
pub mod log;
mod config;
pub mod sync;
pub mod graphics_device;
pub mod command;
pub mod resource;
pub mod render_graph;
mod context;

// Main lr namespace module
pub mod lr {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton (logger)
    pub use crate::engine::Engine;

    pub use crate::config::Config;
    pub use crate::context::GraphicsContext;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{format_entry, DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // Resource states and barrier batching
    pub mod sync {
        pub use crate::sync::*;
    }

    // Backend-facing traits
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Command buffers, pool and queue
    pub mod command {
        pub use crate::command::*;
    }

    // State-tracked resources
    pub mod resource {
        pub use crate::resource::*;
    }

    // Renderpasses and the render graph
    pub mod render {
        pub use crate::render_graph::*;
    }
}

// Re-export math library at crate root
pub use glam;
