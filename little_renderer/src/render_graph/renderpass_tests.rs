//! Unit tests for renderpass.rs and render_target.rs

use std::sync::{Arc, Mutex};

use super::*;
use crate::error::Error;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{ImageDesc, TextureFormat, TextureUsage};

// ============================================================================
// Helpers
// ============================================================================

type Events = Arc<Mutex<Vec<String>>>;

struct TestDrawable {
    label: &'static str,
    vertex_count: u32,
    events: Events,
}

impl TestDrawable {
    fn new(label: &'static str, vertex_count: u32, events: &Events) -> Self {
        Self { label, vertex_count, events: events.clone() }
    }

    fn event(&self, what: &str) {
        self.events.lock().unwrap().push(format!("{}:{}", self.label, what));
    }
}

impl Drawable for TestDrawable {
    fn pre_build(&mut self) -> Result<()> {
        self.event("pre_build");
        Ok(())
    }

    fn build(&mut self, target: &RenderTarget, _device: &dyn GraphicsDevice) -> Result<()> {
        let (w, h) = target.extent();
        self.event(&format!("build {}x{}", w, h));
        Ok(())
    }

    fn draw(&mut self, cmd: &mut CommandBuffer) -> Result<()> {
        cmd.draw(self.vertex_count, 0)
    }

    fn destroy(&mut self) {
        self.event("destroy");
    }
}

struct DispatchDrawable;

impl Drawable for DispatchDrawable {
    fn draw(&mut self, cmd: &mut CommandBuffer) -> Result<()> {
        cmd.dispatch(4, 4, 1)
    }
}

fn texture(device: &MockGraphicsDevice, name: &str, format: TextureFormat) -> Arc<Texture> {
    let usage = if format.is_depth() {
        TextureUsage::DEPTH_STENCIL_ATTACHMENT
    } else {
        TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST
    };
    let desc = ImageDesc::new_2d(256, 128, format, usage);
    Arc::new(Texture::new(device, name, &desc).unwrap())
}

fn recording(device: &MockGraphicsDevice) -> CommandBuffer {
    let mut cmd = CommandBuffer::new(device).unwrap();
    cmd.begin().unwrap();
    cmd
}

// ============================================================================
// TARGET
// ============================================================================

#[test]
fn test_color_attachment_creates_target_at_texture_size() {
    let device = MockGraphicsDevice::new();
    let color = texture(&device, "color", TextureFormat::R8G8B8A8_UNORM);
    let mut pass = Renderpass::new("gbuffer", RenderTargetType::Graphics);
    pass.add_color_attachment(&color, AttachmentLoadOp::Clear, AttachmentStoreOp::Store, [0.0; 4]).unwrap();
    let target = pass.render_target().unwrap();
    assert_eq!(target.extent(), (256, 128));
    assert_eq!(target.color_attachments().len(), 1);
}

#[test]
fn test_depth_texture_rejected_as_color() {
    let device = MockGraphicsDevice::new();
    let depth = texture(&device, "depth", TextureFormat::D32_FLOAT);
    let mut pass = Renderpass::new("p", RenderTargetType::Graphics);
    let result = pass.add_color_attachment(&depth, AttachmentLoadOp::Clear, AttachmentStoreOp::Store, [0.0; 4]);
    assert!(matches!(result, Err(Error::InvalidState(_))));
    pass.set_depth_attachment(&depth, AttachmentLoadOp::Clear, AttachmentStoreOp::DontCare, 1.0, 0).unwrap();
    assert!(pass.render_target().unwrap().depth_attachment().is_some());
}

#[test]
fn test_compute_target_has_no_attachments() {
    let device = MockGraphicsDevice::new();
    let color = texture(&device, "color", TextureFormat::R8G8B8A8_UNORM);
    let mut pass = Renderpass::new("cull", RenderTargetType::Compute);
    let result = pass.add_color_attachment(&color, AttachmentLoadOp::Load, AttachmentStoreOp::Store, [0.0; 4]);
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[test]
fn test_init_render_target() {
    let mut pass = Renderpass::new("p", RenderTargetType::RayTracing);
    let target = pass.init_render_target(640, 480);
    assert_eq!(target.kind(), RenderTargetType::RayTracing);
    assert_eq!(pass.render_target().unwrap().extent(), (640, 480));
}

// ============================================================================
// OBJECTS / LIFECYCLE
// ============================================================================

#[test]
fn test_generate_object_ids() {
    let events = Events::default();
    let mut pass = Renderpass::new("p", RenderTargetType::Graphics);
    let a = pass.generate_object(TestDrawable::new("a", 3, &events));
    let b = pass.generate_object(TestDrawable::new("b", 6, &events));
    assert_eq!(a.index(), 0);
    assert_eq!(b.index(), 1);
    assert!(pass.object(b).is_some());
    assert!(pass.object(ObjectId(7)).is_none());
    assert_eq!(pass.objects().count(), 2);
    assert_eq!(pass.object_count(), 2);
}

#[test]
fn test_build_uses_default_extent() {
    let device = MockGraphicsDevice::new();
    let events = Events::default();
    let mut pass = Renderpass::new("p", RenderTargetType::Graphics);
    pass.generate_object(TestDrawable::new("a", 3, &events));
    pass.pre_build().unwrap();
    pass.build(&device, (800, 600)).unwrap();
    assert!(pass.is_built());
    assert_eq!(*events.lock().unwrap(), vec!["a:pre_build", "a:build 800x600"]);
}

#[test]
fn test_render_before_build_is_invalid_state() {
    let device = MockGraphicsDevice::new();
    let mut pass = Renderpass::new("p", RenderTargetType::Graphics);
    let mut cmd = recording(&device);
    let result = pass.render(&mut cmd, &FrameInfo::offscreen());
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[test]
fn test_destroy_tears_down_objects_and_target() {
    let device = MockGraphicsDevice::new();
    let events = Events::default();
    let mut pass = Renderpass::new("p", RenderTargetType::Graphics);
    pass.generate_object(TestDrawable::new("a", 3, &events));
    pass.build(&device, (64, 64)).unwrap();
    pass.destroy();
    assert!(!pass.is_built());
    assert!(pass.render_target().is_none());
    assert_eq!(pass.object_count(), 0);
    assert!(events.lock().unwrap().contains(&"a:destroy".to_string()));
}

// ============================================================================
// RENDER ORDER
// ============================================================================

#[test]
fn test_render_fixed_order() {
    let device = MockGraphicsDevice::new();
    let events = Events::default();
    let color = texture(&device, "color", TextureFormat::R8G8B8A8_UNORM);
    let history = texture(&device, "history", TextureFormat::R8G8B8A8_UNORM);

    let mut pass = Renderpass::new("main", RenderTargetType::Graphics);
    pass.add_color_attachment(&color, AttachmentLoadOp::Load, AttachmentStoreOp::Store, [0.0; 4]).unwrap();
    pass.add_begin_transition(&history, ResourceState::FragmentShaderReadOnly);
    pass.add_clear_color_texture(&color, [1.0, 0.0, 0.0, 1.0]);
    pass.add_end_transition(&color, ResourceState::FragmentShaderReadOnly);
    pass.generate_object(TestDrawable::new("a", 3, &events));
    pass.generate_object(TestDrawable::new("b", 6, &events));
    pass.build(&device, (256, 128)).unwrap();

    let mut cmd = recording(&device);
    pass.render(&mut cmd, &FrameInfo::offscreen()).unwrap();

    let names = device.log().command_names();
    assert_eq!(
        names,
        vec![
            "begin",
            "barrier",
            "clear_color TransferDstOptimal",
            "barrier",
            "begin_rendering 256x128 colors=1 depth=false",
            "set_viewport",
            "set_scissor",
            "draw 3",
            "draw 6",
            "end_rendering",
        ]
    );

    // First barrier: history to shader read and color to transfer dst, merged
    let log = device.log();
    assert_eq!(log.barriers[0].images.len(), 2);
    assert_eq!(
        log.barriers[1].images,
        vec![(ResourceState::TransferDst, ResourceState::ColorAttachment)]
    );
    drop(log);

    // End transition is pending, not flushed
    assert!(cmd.has_pending_transition());
    assert_eq!(color.state(), ResourceState::FragmentShaderReadOnly);
}

#[test]
fn test_compute_pass_flushes_without_rendering() {
    let device = MockGraphicsDevice::new();
    let buffer = Arc::new(
        crate::resource::StorageBuffer::new(
            &device,
            "args",
            &crate::graphics_device::BufferDesc {
                size: 64,
                usage: crate::graphics_device::BufferUsage::STORAGE,
                host_visible: false,
            },
        )
        .unwrap(),
    );
    let mut pass = Renderpass::new("cull", RenderTargetType::Compute);
    pass.add_begin_transition(&buffer, ResourceState::ComputeShaderWrite);
    pass.add_end_transition(&buffer, ResourceState::IndirectRead);
    pass.generate_object(DispatchDrawable);
    pass.build(&device, (1, 1)).unwrap();

    let mut cmd = recording(&device);
    pass.render(&mut cmd, &FrameInfo::offscreen()).unwrap();
    assert_eq!(device.log().command_names(), vec!["begin", "barrier", "dispatch 4x4x1"]);
    assert!(cmd.has_pending_transition());
}

#[test]
fn test_surface_target_without_image_is_invalid_state() {
    let device = MockGraphicsDevice::new();
    let mut pass = Renderpass::new("present", RenderTargetType::Surface);
    pass.build(&device, (64, 64)).unwrap();
    let mut cmd = recording(&device);
    let result = pass.render(&mut cmd, &FrameInfo::offscreen());
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[test]
fn test_surface_target_renders_into_swapchain_image() {
    let device = MockGraphicsDevice::new();
    let swapchain = vec![
        texture(&device, "sc0", TextureFormat::B8G8R8A8_SRGB),
        texture(&device, "sc1", TextureFormat::B8G8R8A8_SRGB),
    ];
    let mut pass = Renderpass::new("present", RenderTargetType::Surface);
    pass.build(&device, (256, 128)).unwrap();

    let mut cmd = recording(&device);
    let frame = FrameInfo { image_index: Some(1), swapchain_textures: &swapchain };
    pass.render(&mut cmd, &frame).unwrap();

    assert_eq!(swapchain[1].state(), ResourceState::ColorAttachment);
    assert_eq!(swapchain[0].state(), ResourceState::Undefined);
    assert!(device
        .log()
        .command_names()
        .contains(&"begin_rendering 256x128 colors=1 depth=false".to_string()));
}

#[test]
fn test_swapchain_barrier_waits_for_acquire_stage() {
    let device = MockGraphicsDevice::new();
    let swapchain = vec![texture(&device, "sc0", TextureFormat::B8G8R8A8_SRGB)];
    let mut pass = Renderpass::new("present", RenderTargetType::Surface);
    pass.build(&device, (256, 128)).unwrap();

    let mut cmd = recording(&device);
    let frame = FrameInfo { image_index: Some(0), swapchain_textures: &swapchain };
    pass.render(&mut cmd, &frame).unwrap();

    let log = device.log();
    let barrier = log
        .barriers
        .iter()
        .find(|b| b.images.contains(&(ResourceState::Undefined, ResourceState::ColorAttachment)))
        .expect("swapchain image barrier");
    assert!(barrier.src_stages.intersects(crate::command::Queue::ACQUIRE_WAIT_STAGES));
}
