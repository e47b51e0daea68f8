/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Owns the instance, the logical device, the allocator and (for windowed
/// devices) the swapchain. Every native object created through it keeps an
/// `Arc<GpuContext>` and must be dropped before the device.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use little_renderer::lr::device::{
    Buffer as LrBuffer, BufferDesc, CommandList as LrCommandList, Fence as LrFence,
    GraphicsDevice, Image as LrImage, ImageDesc, Pipeline as LrPipeline, PipelineBindPoint,
    Semaphore as LrSemaphore, SubmitInfo, Swapchain as LrSwapchain,
};
use little_renderer::lr::{Config, Error, Result};
use little_renderer::{engine_debug, engine_err, engine_error, engine_info, engine_warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use std::any::Any;
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_command_list::CommandList;
use crate::vulkan_context::GpuContext;
use crate::vulkan_convert::stages_to_vk;
use crate::vulkan_image::Image;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_sync::{vk_fence, vk_semaphore, Fence, Semaphore};

#[cfg(feature = "vulkan-validation")]
use crate::vulkan_debug::{DebugMessenger, ValidationStats, VulkanDebugConfig};

/// Vulkan graphics device
pub struct VulkanGraphicsDevice {
    _entry: ash::Entry,
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    device_name: String,
    /// Raw device handle, also stored in the context; destroyed in `drop`
    device: ash::Device,
    /// Released before the device is destroyed
    ctx: ManuallyDrop<Arc<GpuContext>>,
    swapchain: Option<Swapchain>,
    #[cfg(feature = "vulkan-validation")]
    debug_messenger: Option<DebugMessenger>,
}

/// Window handles needed to create a surface
struct WindowHandles {
    display: RawDisplayHandle,
    window: RawWindowHandle,
}

impl VulkanGraphicsDevice {
    /// Create a device presenting to `window`
    ///
    /// The swapchain starts at `config.surface_width` x `config.surface_height`
    /// unless the surface dictates its own extent.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: &Config) -> Result<Self> {
        let display = window.display_handle().map_err(|e| {
            engine_error!("lr::vulkan", "Failed to get display handle: {}", e);
            Error::InitializationFailed(format!("Failed to get display handle: {}", e))
        })?;
        let window = window.window_handle().map_err(|e| {
            engine_error!("lr::vulkan", "Failed to get window handle: {}", e);
            Error::InitializationFailed(format!("Failed to get window handle: {}", e))
        })?;
        Self::create(
            Some(WindowHandles { display: display.as_raw(), window: window.as_raw() }),
            config,
        )
    }

    /// Create a device without a surface (compute, offscreen rendering)
    pub fn new_headless(config: &Config) -> Result<Self> {
        Self::create(None, config)
    }

    fn create(handles: Option<WindowHandles>, config: &Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_error!("lr::vulkan", "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let app_name = CString::new(config.app_name.as_str()).unwrap_or_default();
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Little Renderer")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let mut extension_names = match &handles {
                Some(handles) => ash_window::enumerate_required_extensions(handles.display)
                    .map_err(|e| {
                        engine_error!("lr::vulkan", "Failed to get required extensions: {}", e);
                        Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
                    })?
                    .to_vec(),
                None => Vec::new(),
            };

            let validation = config.enable_validation && cfg!(feature = "vulkan-validation");
            if config.enable_validation && !validation {
                engine_warn!(
                    "lr::vulkan",
                    "Validation requested but the 'vulkan-validation' feature is disabled"
                );
            }
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }
            let layer_names = if validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                engine_error!("lr::vulkan", "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            #[cfg(feature = "vulkan-validation")]
            let debug_messenger = if validation {
                Some(DebugMessenger::new(&entry, &instance, VulkanDebugConfig::default())?)
            } else {
                None
            };

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
            let surface = match &handles {
                Some(handles) => Some(
                    ash_window::create_surface(&entry, &instance, handles.display, handles.window, None)
                        .map_err(|e| {
                            engine_error!("lr::vulkan", "Failed to create surface: {:?}", e);
                            Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
                        })?,
                ),
                None => None,
            };

            // Pick Physical Device
            let physical_device = instance
                .enumerate_physical_devices()
                .map_err(|e| {
                    engine_error!("lr::vulkan", "Failed to enumerate physical devices: {:?}", e);
                    Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
                })?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    engine_error!("lr::vulkan", "No Vulkan-capable GPU found");
                    Error::InitializationFailed("No Vulkan-capable GPU found".to_string())
                })?;

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string());

            // Find Queue Families
            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
            let supports_present = |index: u32| match surface {
                Some(surface) => surface_loader
                    .get_physical_device_surface_support(physical_device, index, surface)
                    .unwrap_or(false),
                None => true,
            };

            // Prefer one family for both graphics and present
            let graphics_families: Vec<u32> = queue_families
                .iter()
                .enumerate()
                .filter(|(_, qf)| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .map(|(i, _)| i as u32)
                .collect();
            let graphics_family_index = graphics_families
                .iter()
                .copied()
                .find(|&i| supports_present(i))
                .or_else(|| graphics_families.first().copied())
                .ok_or_else(|| {
                    engine_error!("lr::vulkan", "No graphics queue family found");
                    Error::InitializationFailed("No graphics queue family found".to_string())
                })?;
            let present_family_index = if supports_present(graphics_family_index) {
                graphics_family_index
            } else {
                (0..queue_families.len() as u32).find(|&i| supports_present(i)).ok_or_else(|| {
                    engine_error!("lr::vulkan", "No present queue family found");
                    Error::InitializationFailed("No present queue family found".to_string())
                })?
            };

            // Create Logical Device
            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_family_index)
                .queue_priorities(&queue_priorities)];
            if present_family_index != graphics_family_index {
                queue_create_infos.push(
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(present_family_index)
                        .queue_priorities(&queue_priorities),
                );
            }

            let device_extension_names = if surface.is_some() {
                vec![ash::khr::swapchain::NAME.as_ptr()]
            } else {
                vec![]
            };

            let mut vulkan13_features = vk::PhysicalDeviceVulkan13Features::default()
                .dynamic_rendering(true)
                .synchronization2(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .push_next(&mut vulkan13_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    engine_error!("lr::vulkan", "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(graphics_family_index, 0);
            let present_queue = device.get_device_queue(present_family_index, 0);

            // Create GPU allocator
            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!("lr::vulkan", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            let ctx = Arc::new(GpuContext::new(
                device.clone(),
                Arc::new(Mutex::new(allocator)),
                graphics_queue,
                graphics_family_index,
            ));

            let swapchain = match surface {
                Some(surface) => Some(Swapchain::new(
                    Arc::clone(&ctx),
                    &instance,
                    physical_device,
                    surface,
                    surface_loader,
                    present_queue,
                    config.surface_width,
                    config.surface_height,
                )?),
                None => None,
            };

            engine_info!(
                "lr::vulkan",
                "Vulkan device '{}' created (graphics family {}, present family {}, {})",
                device_name,
                graphics_family_index,
                present_family_index,
                if swapchain.is_some() { "windowed" } else { "headless" }
            );

            Ok(Self {
                _entry: entry,
                instance,
                physical_device,
                device_name,
                device,
                ctx: ManuallyDrop::new(ctx),
                swapchain,
                #[cfg(feature = "vulkan-validation")]
                debug_messenger,
            })
        }
    }

    /// Raw logical device, for building pipelines and other objects the core
    /// does not model
    pub fn ash_device(&self) -> &ash::Device {
        &self.device
    }

    pub fn ash_instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn graphics_queue_family(&self) -> u32 {
        self.ctx.graphics_queue_family
    }

    /// Hand a pipeline built against `ash_device()` over to the device
    ///
    /// The pipeline and its layout are destroyed when the returned handle
    /// is dropped.
    pub fn wrap_pipeline(
        &self,
        pipeline: vk::Pipeline,
        layout: vk::PipelineLayout,
        bind_point: PipelineBindPoint,
    ) -> Arc<dyn LrPipeline> {
        Arc::new(Pipeline::new(Arc::clone(&self.ctx), pipeline, layout, bind_point))
    }

    /// Validation message counts since creation
    #[cfg(feature = "vulkan-validation")]
    pub fn validation_stats(&self) -> ValidationStats {
        self.debug_messenger.as_ref().map(|m| m.stats()).unwrap_or_default()
    }

    /// Change which validation messages are forwarded to the logger
    #[cfg(feature = "vulkan-validation")]
    pub fn set_validation_config(&self, config: VulkanDebugConfig) {
        if let Some(messenger) = &self.debug_messenger {
            messenger.set_config(config);
        }
    }

    /// Print the validation report to stdout
    #[cfg(feature = "vulkan-validation")]
    pub fn print_validation_report(&self) {
        if let Some(messenger) = &self.debug_messenger {
            messenger.print_report();
        }
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn name(&self) -> &str {
        "vulkan"
    }

    fn create_command_list(&self) -> Result<Box<dyn LrCommandList>> {
        Ok(Box::new(CommandList::new(Arc::clone(&self.ctx))?))
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn LrFence>> {
        Ok(Box::new(Fence::new(Arc::clone(&self.ctx), signaled)?))
    }

    fn create_semaphore(&self) -> Result<Arc<dyn LrSemaphore>> {
        Ok(Arc::new(Semaphore::new(Arc::clone(&self.ctx))?))
    }

    fn create_image(&self, desc: &ImageDesc) -> Result<Arc<dyn LrImage>> {
        Ok(Arc::new(Image::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn LrBuffer>> {
        Ok(Arc::new(Buffer::new(Arc::clone(&self.ctx), desc)?))
    }

    fn submit(&self, info: &SubmitInfo<'_>) -> Result<()> {
        let command_list = info
            .command_list
            .as_any()
            .downcast_ref::<CommandList>()
            .ok_or_else(|| engine_err!("lr::vulkan", "Command list was not created by the Vulkan backend"))?;

        let mut wait_semaphores = Vec::with_capacity(info.wait_semaphores.len());
        let mut wait_stages = Vec::with_capacity(info.wait_semaphores.len());
        for wait in info.wait_semaphores {
            wait_semaphores.push(vk_semaphore(wait.semaphore.as_ref())?);
            wait_stages.push(stages_to_vk(wait.stages));
        }
        let signal_semaphores = info
            .signal_semaphores
            .iter()
            .map(|s| vk_semaphore(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let fence = match info.fence {
            Some(fence) => vk_fence(fence)?,
            None => vk::Fence::null(),
        };

        let command_buffers = [command_list.command_buffer()];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe { self.device.queue_submit(self.ctx.graphics_queue, &[submit_info], fence) }.map_err(|e| {
            if e == vk::Result::ERROR_DEVICE_LOST {
                engine_error!("lr::vulkan", "Device lost during queue submit");
                Error::DeviceLost
            } else {
                engine_err!("lr::vulkan", "Failed to submit command buffer: {:?}", e)
            }
        })
    }

    fn swapchain(&self) -> Option<&dyn LrSwapchain> {
        self.swapchain.as_ref().map(|s| s as &dyn LrSwapchain)
    }

    fn swapchain_mut(&mut self) -> Option<&mut dyn LrSwapchain> {
        self.swapchain.as_mut().map(|s| s as &mut dyn LrSwapchain)
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }.map_err(|e| {
            if e == vk::Result::ERROR_DEVICE_LOST {
                engine_error!("lr::vulkan", "Device lost while waiting idle");
                Error::DeviceLost
            } else {
                engine_err!("lr::vulkan", "Failed to wait for device idle: {:?}", e)
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Swapchain images and surface
            self.swapchain = None;

            // 2. Context: the allocator frees its memory blocks here if no
            //    resource outlived the device
            let ctx = ManuallyDrop::take(&mut self.ctx);
            if Arc::strong_count(&ctx) > 1 {
                engine_warn!(
                    "lr::vulkan",
                    "{} GPU object(s) outlive the device '{}'; their memory is leaked",
                    Arc::strong_count(&ctx) - 1,
                    self.device_name
                );
            }
            drop(ctx);

            // 3. Debug messenger before the instance
            #[cfg(feature = "vulkan-validation")]
            {
                if let Some(mut messenger) = self.debug_messenger.take() {
                    messenger.destroy();
                }
            }

            // 4. Device and instance
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
        engine_debug!("lr::vulkan", "Vulkan device '{}' destroyed", self.device_name);
    }
}

#[cfg(test)]
#[path = "vulkan_graphics_device_tests.rs"]
mod tests;
