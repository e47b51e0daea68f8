//! Render graph module
//!
//! A render graph is an ordered list of renderpasses plus at most one
//! surface pass. Passes execute in registration order; the resources they
//! share are synchronized by the transitions each pass declares.

mod render_target;
mod drawable;
mod renderpass;
mod render_graph;

pub use render_target::{Attachment, FrameInfo, RenderTarget, RenderTargetType};
pub use drawable::{Drawable, ObjectId};
pub use renderpass::{ClearRequest, Renderpass, TransitionRequest};
pub use render_graph::RenderGraph;
