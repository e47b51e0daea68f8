//! Error types for the Little Renderer core
//!
//! This module defines the error type used throughout the frame-sync core,
//! including backend failures, resource misuse and invalid call sequences.

use std::fmt;

/// Result type for Little Renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Little Renderer errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan call failure, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, pipeline, etc.)
    InvalidResource(String),

    /// Initialization failed (device, swapchain, subsystems)
    InitializationFailed(String),

    /// Operation called in a state that does not allow it
    /// (rendering an unbuilt pass, recording into an idle buffer, ...)
    InvalidState(String),

    /// The GPU device was lost; there is no recovery path
    DeviceLost,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::DeviceLost => write!(f, "GPU device lost"),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR and evaluate to `Error::BackendError` with the same message
///
/// # Example
///
/// ```no_run
/// # use little_renderer::engine_err;
/// let err = engine_err!("lr::vulkan", "Failed to create fence: {}", 42);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::lr::Error::BackendError(message)
    }};
}

/// Log an ERROR and return `Err(Error::BackendError)` from the current function
///
/// # Example
///
/// ```no_run
/// # use little_renderer::engine_bail;
/// fn create() -> little_renderer::lr::Result<()> {
///     engine_bail!("lr::RenderGraph", "Renderpass '{}' already exists", "main");
/// }
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

/// Log an ERROR and return `Err(Error::InvalidState)` from the current function
///
/// Used for call-sequence violations that the caller can fix (rendering an
/// unbuilt pass, registering a second surface pass, ...).
#[macro_export]
macro_rules! engine_bail_state {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        return Err($crate::lr::Error::InvalidState(message));
    }};
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
