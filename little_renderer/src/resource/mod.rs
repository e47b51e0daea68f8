/// Resource module - GPU resources whose synchronization state is tracked

pub mod texture;
pub mod storage_buffer;
pub mod tracked_resource;

pub use texture::*;
pub use storage_buffer::*;
pub use tracked_resource::*;
