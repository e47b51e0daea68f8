/// Command module - command buffers, pooling and queue submission

pub mod command_buffer;
pub mod command_buffer_manager;
pub mod queue;

pub use command_buffer::*;
pub use command_buffer_manager::*;
pub use queue::*;
