/// Pipeline - Vulkan implementation of the Pipeline trait
///
/// Pipelines are built by the application against the raw device and handed
/// over here; the wrapper binds them and destroys them on drop.

use ash::vk;
use little_renderer::lr::device::{Pipeline as LrPipeline, PipelineBindPoint};
use little_renderer::lr::Result;
use little_renderer::engine_err;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

pub struct Pipeline {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) layout: vk::PipelineLayout,
    bind_point: PipelineBindPoint,
}

impl Pipeline {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        pipeline: vk::Pipeline,
        layout: vk::PipelineLayout,
        bind_point: PipelineBindPoint,
    ) -> Self {
        Self { ctx, pipeline, layout, bind_point }
    }
}

impl LrPipeline for Pipeline {
    fn bind_point(&self) -> PipelineBindPoint {
        self.bind_point
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

pub(crate) fn vk_pipeline(pipeline: &dyn LrPipeline) -> Result<&Pipeline> {
    pipeline
        .as_any()
        .downcast_ref::<Pipeline>()
        .ok_or_else(|| engine_err!("lr::vulkan", "Pipeline was not created by the Vulkan backend"))
}
