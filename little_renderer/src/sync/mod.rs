/// Synchronization module - resource state table and barrier batching

pub mod resource_state;
pub mod transition;

pub use resource_state::*;
pub use transition::*;
