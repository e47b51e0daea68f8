/// Vulkan debug messenger - routes validation layer messages to the engine logger
///
/// Only compiled with the `vulkan-validation` feature. Each device owns its
/// messenger and the state the callback reads, so nothing here is global.

use ash::vk;
use colored::*;
use little_renderer::lr::{Error, Result};
use little_renderer::{engine_debug, engine_error, engine_info, engine_warn};
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Minimum severity forwarded to the logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    ErrorsOnly,
    ErrorsAndWarnings,
    All,
}

/// Validation messenger configuration
#[derive(Debug, Clone)]
pub struct VulkanDebugConfig {
    pub severity: DebugSeverity,
    /// Abort the process on the first validation error
    pub break_on_error: bool,
}

impl Default for VulkanDebugConfig {
    fn default() -> Self {
        Self {
            severity: DebugSeverity::ErrorsAndWarnings,
            break_on_error: false,
        }
    }
}

/// Counts of forwarded validation messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

/// State read by the callback through its user-data pointer
pub(crate) struct DebugState {
    config: Mutex<VulkanDebugConfig>,
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
    /// Occurrences per message text
    seen: Mutex<FxHashMap<String, u32>>,
}

impl DebugState {
    fn new(config: VulkanDebugConfig) -> Self {
        Self {
            config: Mutex::new(config),
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
            seen: Mutex::new(FxHashMap::default()),
        }
    }

    fn stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn config(&self) -> VulkanDebugConfig {
        self.config.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn track(&self, message: &str) -> u32 {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        let count = seen.entry(message.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn duplicate_count(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|&&count| count > 1)
            .count()
    }
}

/// Debug messenger owned by a graphics device
pub(crate) struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
    /// Boxed so the pointer handed to Vulkan stays stable
    state: Box<DebugState>,
}

impl DebugMessenger {
    pub(crate) fn new(entry: &ash::Entry, instance: &ash::Instance, config: VulkanDebugConfig) -> Result<Self> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let state = Box::new(DebugState::new(config));

        // Everything is reported; the callback filters by the current config
        let severity_flags = vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
            | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE;

        let state_ptr = state.as_ref() as *const DebugState as *mut std::ffi::c_void;
        let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(severity_flags)
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vulkan_debug_callback))
            .user_data(state_ptr);

        let messenger = unsafe { loader.create_debug_utils_messenger(&info, None) }.map_err(|e| {
            engine_error!("lr::vulkan", "Failed to create debug messenger: {:?}", e);
            Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
        })?;

        Ok(Self { loader, messenger, state })
    }

    pub(crate) fn stats(&self) -> ValidationStats {
        self.state.stats()
    }

    pub(crate) fn set_config(&self, config: VulkanDebugConfig) {
        *self.state.config.lock().unwrap_or_else(|e| e.into_inner()) = config;
    }

    /// Print a colored summary of the forwarded messages
    pub(crate) fn print_report(&self) {
        let stats = self.stats();
        if stats.total() == 0 {
            println!("\n{}", "No validation messages".green().bold());
            return;
        }

        println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());
        if stats.errors > 0 {
            println!("  {} {}", "Errors:".red().bold(), stats.errors);
        }
        if stats.warnings > 0 {
            println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
        }
        if stats.info > 0 {
            println!("  {} {}", "Info:".cyan(), stats.info);
        }
        if stats.verbose > 0 {
            println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
        }
        println!("  {} {}", "Total:".white().bold(), stats.total());

        let duplicates = self.state.duplicate_count();
        if duplicates > 0 {
            println!("\n  {} message(s) appeared multiple times", duplicates);
        }
        println!("{}\n", "====================================".bright_blue().bold());
    }

    /// Destroy the messenger; must run before the instance is destroyed
    pub(crate) fn destroy(&mut self) {
        unsafe {
            self.loader.destroy_debug_utils_messenger(self.messenger, None);
        }
        self.messenger = vk::DebugUtilsMessengerEXT::null();
    }
}

unsafe fn c_str_or<'a>(ptr: *const std::ffi::c_char, fallback: &'a str) -> std::borrow::Cow<'a, str> {
    if ptr.is_null() {
        std::borrow::Cow::Borrowed(fallback)
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy()
    }
}

/// Vulkan debug messenger callback
unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || p_user_data.is_null() {
        return vk::FALSE;
    }
    let state = unsafe { &*(p_user_data as *const DebugState) };
    let config = state.config();
    let forwarded = match config.severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
            | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
    };
    if !forwarded.intersects(message_severity) {
        return vk::FALSE;
    }
    let callback_data = unsafe { &*p_callback_data };
    let message_id = unsafe { c_str_or(callback_data.p_message_id_name, "Unknown") };
    let message = unsafe { c_str_or(callback_data.p_message, "No message") };

    let type_str = if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    };

    let occurrences = state.track(&message);
    let repeat = if occurrences > 1 {
        format!(" [x{}]", occurrences)
    } else {
        String::new()
    };

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        state.errors.fetch_add(1, Ordering::Relaxed);
        engine_error!("lr::vulkan::validation", "[{}]{} {}: {}", type_str, repeat, message_id, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        state.warnings.fetch_add(1, Ordering::Relaxed);
        engine_warn!("lr::vulkan::validation", "[{}]{} {}: {}", type_str, repeat, message_id, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        state.info.fetch_add(1, Ordering::Relaxed);
        engine_info!("lr::vulkan::validation", "[{}]{} {}: {}", type_str, repeat, message_id, message);
    } else {
        state.verbose.fetch_add(1, Ordering::Relaxed);
        engine_debug!("lr::vulkan::validation", "[{}]{} {}: {}", type_str, repeat, message_id, message);
    }

    if config.break_on_error && message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        eprintln!(
            "\n{}\n  Context: {} [{}]\n",
            "BREAK ON VALIDATION ERROR - Aborting execution".red().bold(),
            message_id.yellow(),
            type_str.cyan()
        );
        std::process::abort();
    }

    vk::FALSE
}
