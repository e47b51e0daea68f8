/// Image - Vulkan implementation of the Image trait

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use little_renderer::lr::device::{Image as LrImage, ImageDesc};
use little_renderer::lr::{Error, Result};
use little_renderer::{engine_err, engine_error};
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_convert::{aspect_to_vk, format_to_vk, texture_usage_to_vk};

/// Vulkan image with its default view
///
/// Swapchain images are wrapped without an allocation; their memory belongs
/// to the swapchain, only the view is destroyed here.
pub struct Image {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    allocation: Option<Allocation>,
    owns_image: bool,
    desc: ImageDesc,
}

impl Image {
    /// Create a device-local image and its view
    pub fn new(ctx: Arc<GpuContext>, desc: &ImageDesc) -> Result<Self> {
        let create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format_to_vk(desc.format))
            .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: 1 })
            .mip_levels(desc.mip_levels)
            .array_layers(desc.array_layers)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(texture_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        unsafe {
            let image = ctx.device.create_image(&create_info, None)
                .map_err(|e| engine_err!("lr::vulkan", "Failed to create image: {:?}", e))?;
            let requirements = ctx.device.get_image_memory_requirements(image);

            let allocation = {
                let mut allocator = ctx.allocator.lock()
                    .map_err(|_| engine_err!("lr::vulkan", "GPU allocator mutex poisoned"))?;
                allocator.allocate(&AllocationCreateDesc {
                    name: "image",
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
            };
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    engine_error!("lr::vulkan", "Failed to allocate image memory: {:?}", e);
                    return Err(Error::OutOfMemory);
                }
            };

            if let Err(e) = ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                ctx.device.destroy_image(image, None);
                if let Ok(mut allocator) = ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
                return Err(engine_err!("lr::vulkan", "Failed to bind image memory: {:?}", e));
            }

            let view = match Self::create_view(&ctx.device, image, desc) {
                Ok(view) => view,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    if let Ok(mut allocator) = ctx.allocator.lock() {
                        allocator.free(allocation).ok();
                    }
                    return Err(e);
                }
            };

            Ok(Self {
                ctx,
                image,
                view,
                allocation: Some(allocation),
                owns_image: true,
                desc: desc.clone(),
            })
        }
    }

    /// Wrap an image owned elsewhere (swapchain), creating only its view
    pub(crate) fn from_swapchain(ctx: Arc<GpuContext>, image: vk::Image, desc: ImageDesc) -> Result<Self> {
        let view = Self::create_view(&ctx.device, image, &desc)?;
        Ok(Self {
            ctx,
            image,
            view,
            allocation: None,
            owns_image: false,
            desc,
        })
    }

    fn create_view(device: &ash::Device, image: vk::Image, desc: &ImageDesc) -> Result<vk::ImageView> {
        let view_type = if desc.array_layers > 1 {
            vk::ImageViewType::TYPE_2D_ARRAY
        } else {
            vk::ImageViewType::TYPE_2D
        };
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(view_type)
            .format(format_to_vk(desc.format))
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect_to_vk(desc.format.aspect()),
                base_mip_level: 0,
                level_count: desc.mip_levels,
                base_array_layer: 0,
                layer_count: desc.array_layers,
            });
        unsafe { device.create_image_view(&create_info, None) }
            .map_err(|e| engine_err!("lr::vulkan", "Failed to create image view: {:?}", e))
    }
}

impl LrImage for Image {
    fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);

            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the image
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            if self.owns_image {
                self.ctx.device.destroy_image(self.image, None);
            }
        }
    }
}

/// Native image and view of a core image created by this backend
pub(crate) fn vk_image(image: &dyn LrImage) -> Result<(vk::Image, vk::ImageView)> {
    image
        .as_any()
        .downcast_ref::<Image>()
        .map(|i| (i.image, i.view))
        .ok_or_else(|| engine_err!("lr::vulkan", "Image was not created by the Vulkan backend"))
}
