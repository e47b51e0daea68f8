/// Fence and Semaphore traits - GPU synchronization primitives

use std::any::Any;

use crate::error::Result;

/// GPU to CPU completion signal
pub trait Fence: Send + Sync {
    /// Non-blocking status query
    fn is_signaled(&self) -> Result<bool>;

    /// Block until signaled. There is no timeout.
    fn wait(&self) -> Result<()>;

    /// Return to the unsignaled state
    fn reset(&self) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// GPU to GPU ordering signal
pub trait Semaphore: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}
