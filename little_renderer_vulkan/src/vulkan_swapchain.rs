/// Swapchain - Vulkan implementation of the Swapchain trait
///
/// Owns the surface, the swapchain and views of its images. Acquire and
/// present semaphores are owned by the caller, which also tracks the state
/// of every image.

use ash::vk;
use little_renderer::lr::device::{
    Image as LrImage, ImageDesc, Semaphore as LrSemaphore, Swapchain as LrSwapchain,
    TextureFormat, TextureUsage,
};
use little_renderer::lr::{Error, Result};
use little_renderer::{engine_debug, engine_err, engine_error};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_convert::format_from_vk;
use crate::vulkan_image::Image;
use crate::vulkan_sync::vk_semaphore;

/// Vulkan swapchain implementation
pub struct Swapchain {
    ctx: Arc<GpuContext>,
    physical_device: vk::PhysicalDevice,
    present_queue: vk::Queue,

    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,

    swapchain: vk::SwapchainKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    images: Vec<Arc<Image>>,
    format: vk::SurfaceFormatKHR,
    format_kind: TextureFormat,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain for `surface`
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared GPU context
    /// * `instance` - Vulkan instance (for the swapchain loader)
    /// * `physical_device` - Physical device for capability queries
    /// * `surface` - Window surface, destroyed with the swapchain
    /// * `surface_loader` - Surface loader
    /// * `present_queue` - Queue for presenting
    /// * `width` / `height` - Size used when the surface does not fix one
    pub fn new(
        ctx: Arc<GpuContext>,
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: ash::khr::surface::Instance,
        present_queue: vk::Queue,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let surface_formats = unsafe {
            surface_loader.get_physical_device_surface_formats(physical_device, surface)
        }
        .map_err(|e| {
            engine_error!("lr::vulkan", "Failed to query surface formats: {:?}", e);
            Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
        })?;

        // Prefer an sRGB format the core models
        let format = surface_formats
            .iter()
            .find(|f| f.format == vk::Format::B8G8R8A8_SRGB || f.format == vk::Format::R8G8B8A8_SRGB)
            .or_else(|| surface_formats.iter().find(|f| format_from_vk(f.format).is_some()))
            .copied()
            .ok_or_else(|| {
                engine_error!("lr::vulkan", "No supported surface format");
                Error::InitializationFailed("No supported surface format".to_string())
            })?;
        let format_kind = format_from_vk(format.format).unwrap_or(TextureFormat::B8G8R8A8_SRGB);

        let swapchain_loader = ash::khr::swapchain::Device::new(instance, &ctx.device);

        let mut swapchain = Self {
            ctx,
            physical_device,
            present_queue,
            surface,
            surface_loader,
            swapchain: vk::SwapchainKHR::null(),
            swapchain_loader,
            images: Vec::new(),
            format,
            format_kind,
            extent: vk::Extent2D { width, height },
        };
        swapchain.build(width, height)?;
        Ok(swapchain)
    }

    /// (Re)create the swapchain, retiring the previous one
    fn build(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            let capabilities = self
                .surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
                .map_err(|e| {
                    engine_error!("lr::vulkan", "Failed to get surface capabilities: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
                })?;

            // Choose extent
            let extent = if capabilities.current_extent.width != u32::MAX {
                capabilities.current_extent
            } else {
                vk::Extent2D {
                    width: width.clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
                    height: height.clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
                }
            };

            let image_count = capabilities.min_image_count + 1;
            let image_count = if capabilities.max_image_count > 0 {
                image_count.min(capabilities.max_image_count)
            } else {
                image_count
            };

            let old_swapchain = self.swapchain;
            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(image_count)
                .image_format(self.format.format)
                .image_color_space(self.format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(vk::PresentModeKHR::FIFO)
                .clipped(true)
                .old_swapchain(old_swapchain);

            let swapchain = self.swapchain_loader.create_swapchain(&create_info, None).map_err(|e| {
                engine_error!("lr::vulkan", "Failed to create swapchain: {:?}", e);
                Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
            })?;

            // Views of the old images go before the old swapchain
            self.images.clear();
            if old_swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(old_swapchain, None);
            }
            self.swapchain = swapchain;
            self.extent = extent;

            let raw_images = self.swapchain_loader.get_swapchain_images(swapchain).map_err(|e| {
                engine_error!("lr::vulkan", "Failed to get swapchain images: {:?}", e);
                Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e))
            })?;

            let desc = ImageDesc::new_2d(
                extent.width,
                extent.height,
                self.format_kind,
                TextureUsage::COLOR_ATTACHMENT | TextureUsage::TRANSFER_DST,
            );
            for image in raw_images {
                self.images.push(Arc::new(Image::from_swapchain(self.ctx.clone(), image, desc.clone())?));
            }

            engine_debug!(
                "lr::vulkan",
                "Swapchain created: {}x{}, {} images, {:?}",
                extent.width,
                extent.height,
                self.images.len(),
                self.format.format
            );
            Ok(())
        }
    }
}

impl LrSwapchain for Swapchain {
    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn image(&self, index: u32) -> Option<Arc<dyn LrImage>> {
        self.images.get(index as usize).map(|i| i.clone() as Arc<dyn LrImage>)
    }

    fn extent(&self) -> (u32, u32) {
        (self.extent.width, self.extent.height)
    }

    fn format(&self) -> TextureFormat {
        self.format_kind
    }

    fn acquire_next_image(&mut self, signal: &dyn LrSemaphore) -> Result<u32> {
        let semaphore = vk_semaphore(signal)?;
        unsafe {
            let (image_index, _is_suboptimal) = self
                .swapchain_loader
                .acquire_next_image(self.swapchain, u64::MAX, semaphore, vk::Fence::null())
                .map_err(|e| {
                    if e == vk::Result::ERROR_OUT_OF_DATE_KHR {
                        engine_err!("lr::vulkan", "Swapchain out of date during acquire")
                    } else {
                        engine_err!("lr::vulkan", "Failed to acquire next swapchain image: {:?}", e)
                    }
                })?;
            Ok(image_index)
        }
    }

    fn present(&mut self, image_index: u32, wait: &[Arc<dyn LrSemaphore>]) -> Result<()> {
        let wait_semaphores = wait
            .iter()
            .map(|s| vk_semaphore(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let swapchains = [self.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.swapchain_loader.queue_present(self.present_queue, &present_info) } {
            Ok(_) | Err(vk::Result::SUBOPTIMAL_KHR) => Ok(()),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                Err(engine_err!("lr::vulkan", "Swapchain out of date during present"))
            }
            Err(e) => Err(engine_err!("lr::vulkan", "Failed to present swapchain image: {:?}", e)),
        }
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe { self.ctx.device.device_wait_idle() }
            .map_err(|e| engine_err!("lr::vulkan", "Failed to wait idle before swapchain recreate: {:?}", e))?;
        self.build(width, height)
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();

            // Image views
            self.images.clear();

            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
