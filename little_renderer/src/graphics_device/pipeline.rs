/// Pipeline trait - opaque bindable pipeline handle

use std::any::Any;

use bitflags::bitflags;

/// Pipeline kind, selects the bind point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineBindPoint {
    Graphics,
    Compute,
    RayTracing,
}

bitflags! {
    /// Shader stages visible to push constants
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStages: u32 {
        const VERTEX = 0x01;
        const FRAGMENT = 0x10;
        const COMPUTE = 0x20;
        const RAYGEN = 0x100;
        const MISS = 0x800;
        const CLOSEST_HIT = 0x400;
    }
}

/// Pipeline resource trait
///
/// Pipeline state construction belongs to the backend or the application;
/// the core only binds pipelines.
pub trait Pipeline: Send + Sync {
    fn bind_point(&self) -> PipelineBindPoint;

    fn as_any(&self) -> &dyn Any;
}
