//! Unit tests for command_buffer_manager.rs

use std::sync::Arc;

use super::*;
use crate::error::Error;
use crate::graphics_device::mock_graphics_device::{MockGraphicsDevice, MockImage};
use crate::graphics_device::{Image, TextureFormat};
use crate::sync::{ResourceState, Transition};

fn manager() -> CommandBufferManager {
    CommandBufferManager::with_limits(10, 5)
}

fn submit_frame(manager: &mut CommandBufferManager, device: &MockGraphicsDevice, queue: &mut Queue) {
    manager.active_command_buffer(device).unwrap().draw(3, 0).unwrap();
    manager.submit_active_command_buffer(device, queue, &[], &[]).unwrap();
}

// ============================================================================
// POOL GROWTH
// ============================================================================

#[test]
fn test_new_pool_is_empty() {
    let manager = CommandBufferManager::new(&Config::default());
    assert_eq!(manager.total_count(), 0);
    assert_eq!(manager.max_in_flight(), 5);
}

#[test]
fn test_first_request_grows_pool() {
    let device = MockGraphicsDevice::new();
    let mut manager = manager();
    manager.active_command_buffer(&device).unwrap();
    assert_eq!(manager.total_count(), 10);
    assert_eq!(manager.ready_count(), 9);
    assert!(manager.has_active_command_buffer());
}

#[test]
fn test_pool_grows_again_when_ready_runs_dry() {
    let device = MockGraphicsDevice::new();
    device.set_auto_signal(false);
    let mut manager = CommandBufferManager::with_limits(2, 100);
    let mut queue = Queue::new();
    for _ in 0..3 {
        submit_frame(&mut manager, &device, &mut queue);
    }
    assert_eq!(manager.total_count(), 4);
    assert_eq!(manager.submitted_count(), 3);
}

// ============================================================================
// ACTIVE / UPLOAD
// ============================================================================

#[test]
fn test_active_is_idempotent() {
    let device = MockGraphicsDevice::new();
    let mut manager = manager();
    let first = manager.active_command_buffer(&device).unwrap() as *const CommandBuffer;
    let second = manager.active_command_buffer(&device).unwrap() as *const CommandBuffer;
    assert_eq!(first, second);
    assert_eq!(device.log().count("begin"), 1);
}

#[test]
fn test_active_and_upload_are_disjoint() {
    let device = MockGraphicsDevice::new();
    let mut manager = manager();
    let active = manager.active_command_buffer(&device).unwrap() as *const CommandBuffer;
    let upload = manager.upload_command_buffer(&device).unwrap() as *const CommandBuffer;
    assert_ne!(active, upload);
    assert_eq!(manager.ready_count(), 8);
}

#[test]
fn test_buffers_are_begun() {
    let device = MockGraphicsDevice::new();
    let mut manager = manager();
    assert!(manager.active_command_buffer(&device).unwrap().is_recording());
    assert!(manager.upload_command_buffer(&device).unwrap().is_recording());
}

// ============================================================================
// SUBMISSION
// ============================================================================

#[test]
fn test_submit_without_active_is_invalid_state() {
    let device = MockGraphicsDevice::new();
    let mut manager = manager();
    let mut queue = Queue::new();
    let result = manager.submit_active_command_buffer(&device, &mut queue, &[], &[]);
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[test]
fn test_upload_submitted_before_active() {
    let device = MockGraphicsDevice::new();
    device.set_auto_signal(false);
    let mut manager = manager();
    let mut queue = Queue::new();

    manager.active_command_buffer(&device).unwrap().draw(3, 0).unwrap();
    manager.upload_command_buffer(&device).unwrap().dispatch(1, 1, 1).unwrap();
    let sem = device.create_semaphore().unwrap();
    manager
        .submit_active_command_buffer(&device, &mut queue, &[Queue::acquire_wait(sem.clone())], &[sem])
        .unwrap();

    let log = device.log();
    assert_eq!(log.submits.len(), 2);
    // cl0 is active, cl1 is upload
    assert_eq!(log.submits[0].command_list, 1);
    assert_eq!(log.submits[0].wait_count, 0);
    assert_eq!(log.submits[1].command_list, 0);
    assert_eq!(log.submits[1].wait_count, 1);
    assert_eq!(log.submits[1].signal_count, 1);
    drop(log);

    assert!(!manager.has_active_command_buffer());
    assert!(!manager.has_upload_command_buffer());
    assert_eq!(manager.submitted_count(), 2);
}

#[test]
fn test_submit_ends_buffer() {
    let device = MockGraphicsDevice::new();
    let mut manager = manager();
    let mut queue = Queue::new();
    submit_frame(&mut manager, &device, &mut queue);
    assert_eq!(device.log().command_names(), vec!["begin", "draw 3", "end"]);
}

#[test]
fn test_submit_flushes_pending_transition() {
    let device = MockGraphicsDevice::new();
    let mut manager = manager();
    let mut queue = Queue::new();
    let image: Arc<dyn Image> = Arc::new(MockImage::new(8, 8, TextureFormat::R8G8B8A8_UNORM, "img"));
    let range = image.desc().full_range();
    let transition = Transition::for_image(image, range, ResourceState::ColorAttachment, ResourceState::FragmentShaderReadOnly);

    manager.active_command_buffer(&device).unwrap().add_transition(transition);
    manager.submit_active_command_buffer(&device, &mut queue, &[], &[]).unwrap();
    assert_eq!(device.log().barriers.len(), 1);
}

#[test]
fn test_submit_upload_alone() {
    let device = MockGraphicsDevice::new();
    let mut manager = manager();
    let mut queue = Queue::new();
    manager.upload_command_buffer(&device).unwrap();
    manager.submit_upload_command_buffer(&device, &mut queue).unwrap();
    assert_eq!(queue.submission_count(), 1);
    assert!(!manager.has_upload_command_buffer());
    // auto-signaled, so recycled right away
    assert_eq!(manager.submitted_count(), 0);
}

// ============================================================================
// FENCE-GATED REUSE
// ============================================================================

#[test]
fn test_unsignaled_buffer_is_not_recycled() {
    let device = MockGraphicsDevice::new();
    device.set_auto_signal(false);
    let mut manager = manager();
    let mut queue = Queue::new();
    submit_frame(&mut manager, &device, &mut queue);

    assert_eq!(manager.reset_command_buffers(false).unwrap(), 0);
    assert_eq!(manager.submitted_count(), 1);
    assert_eq!(manager.ready_count(), 9);

    device.signal_all_fences();
    assert_eq!(manager.reset_command_buffers(false).unwrap(), 1);
    assert_eq!(manager.submitted_count(), 0);
    assert_eq!(manager.ready_count(), 10);
    assert_eq!(device.fence_wait_count(), 0);
}

#[test]
fn test_recycling_stops_at_first_unsignaled() {
    let device = MockGraphicsDevice::new();
    device.set_auto_signal(false);
    let mut manager = manager();
    let mut queue = Queue::new();
    submit_frame(&mut manager, &device, &mut queue);
    device.signal_all_fences();
    submit_frame(&mut manager, &device, &mut queue);
    // First was recycled during the second submit
    assert_eq!(manager.submitted_count(), 1);
    assert_eq!(manager.reset_command_buffers(false).unwrap(), 0);
}

#[test]
fn test_force_wait_drains_submitted() {
    let device = MockGraphicsDevice::new();
    device.set_auto_signal(false);
    let mut manager = manager();
    let mut queue = Queue::new();
    submit_frame(&mut manager, &device, &mut queue);
    submit_frame(&mut manager, &device, &mut queue);

    assert_eq!(manager.reset_command_buffers(true).unwrap(), 2);
    assert_eq!(device.fence_wait_count(), 2);
    assert_eq!(manager.submitted_count(), 0);
}

// ============================================================================
// IN-FLIGHT BOUND
// ============================================================================

#[test]
fn test_in_flight_bound_forces_wait() {
    let device = MockGraphicsDevice::new();
    device.set_auto_signal(false);
    let mut manager = manager();
    let mut queue = Queue::new();

    for _ in 0..5 {
        submit_frame(&mut manager, &device, &mut queue);
    }
    assert_eq!(manager.submitted_count(), 5);
    assert_eq!(device.fence_wait_count(), 0);

    // Sixth submission exceeds the limit of five: only the oldest is waited on
    submit_frame(&mut manager, &device, &mut queue);
    assert_eq!(device.fence_wait_count(), 1);
    assert_eq!(manager.submitted_count(), 5);

    submit_frame(&mut manager, &device, &mut queue);
    assert_eq!(device.fence_wait_count(), 2);
    assert_eq!(manager.submitted_count(), 5);
}

#[test]
fn test_reset_over_limit_blocks() {
    let device = MockGraphicsDevice::new();
    device.set_auto_signal(false);
    let mut manager = CommandBufferManager::with_limits(10, 1);
    let mut queue = Queue::new();
    manager.active_command_buffer(&device).unwrap();
    manager.upload_command_buffer(&device).unwrap();
    // Two buffers submitted by one call, limit is one: the trailing reset
    // waits on the upload buffer only
    manager.submit_active_command_buffer(&device, &mut queue, &[], &[]).unwrap();
    assert_eq!(device.fence_wait_count(), 1);
    assert_eq!(manager.submitted_count(), 1);
}

#[test]
fn test_failed_submit_returns_buffer_to_ready() {
    let device = MockGraphicsDevice::new();
    let mut manager = manager();
    let mut queue = Queue::new();
    manager.active_command_buffer(&device).unwrap().draw(3, 0).unwrap();

    device.set_fail_submit(true);
    let result = manager.submit_active_command_buffer(&device, &mut queue, &[], &[]);
    assert!(matches!(result, Err(Error::DeviceLost)));
    assert!(!manager.has_active_command_buffer());
    assert_eq!(manager.submitted_count(), 0);
    assert_eq!(manager.ready_count(), 10);
    assert_eq!(manager.total_count(), 10);

    // The discarded buffer records again from scratch
    device.set_fail_submit(false);
    submit_frame(&mut manager, &device, &mut queue);
    assert_eq!(queue.submission_count(), 1);
    assert_eq!(manager.total_count(), 10);
}

// ============================================================================
// DESTROY
// ============================================================================

#[test]
fn test_destroy_waits_and_clears() {
    let device = MockGraphicsDevice::new();
    device.set_auto_signal(false);
    let mut manager = manager();
    let mut queue = Queue::new();
    submit_frame(&mut manager, &device, &mut queue);
    manager.destroy().unwrap();
    assert_eq!(device.fence_wait_count(), 1);
    assert_eq!(manager.total_count(), 0);
    assert_eq!(manager.ready_count(), 0);
}
