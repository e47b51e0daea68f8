/// Core configuration

/// Graphics context configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Command buffers allocated each time the ready pool runs dry
    pub initial_command_buffers: usize,
    /// Submitted buffers allowed in flight before a reset blocks
    pub max_in_flight_command_buffers: usize,
    /// Initial surface width in pixels
    pub surface_width: u32,
    /// Initial surface height in pixels
    pub surface_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Little Renderer".to_string(),
            app_version: (0, 0, 1),
            enable_validation: cfg!(debug_assertions),
            initial_command_buffers: 10,
            max_in_flight_command_buffers: 5,
            surface_width: 1280,
            surface_height: 720,
        }
    }
}
