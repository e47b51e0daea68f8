/// CommandBufferManager - fence-gated pool of command buffers
///
/// Buffers live in a slot arena and move between four logical sets:
///
/// - `ready`: reset, available for recording
/// - `active`: the frame's main recording buffer (at most one)
/// - `upload`: the buffer for resource uploads (at most one)
/// - `submitted`: FIFO of buffers the GPU may still be executing
///
/// A submitted buffer returns to `ready` only once its fence has signaled.

use std::collections::VecDeque;
use std::sync::Arc;

use slotmap::{new_key_type, SlotMap};

use crate::command::{CommandBuffer, Queue};
use crate::config::Config;
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, Semaphore, SemaphoreWait};
use crate::{engine_bail_state, engine_debug, engine_err, engine_trace, engine_warn};

new_key_type! {
    /// Stable handle of a CommandBuffer slot
    pub struct CommandBufferKey;
}

/// Which in-use slot a request refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Active,
    Upload,
}

pub struct CommandBufferManager {
    buffers: SlotMap<CommandBufferKey, CommandBuffer>,
    ready: VecDeque<CommandBufferKey>,
    active: Option<CommandBufferKey>,
    upload: Option<CommandBufferKey>,
    submitted: VecDeque<CommandBufferKey>,
    /// Buffers allocated each time `ready` runs dry
    growth: usize,
    /// Submitted buffers allowed before a reset blocks
    max_in_flight: usize,
}

impl CommandBufferManager {
    /// Empty pool; buffers are allocated on first use
    pub fn new(config: &Config) -> Self {
        Self::with_limits(
            config.initial_command_buffers,
            config.max_in_flight_command_buffers,
        )
    }

    pub fn with_limits(growth: usize, max_in_flight: usize) -> Self {
        Self {
            buffers: SlotMap::with_key(),
            ready: VecDeque::new(),
            active: None,
            upload: None,
            submitted: VecDeque::new(),
            growth: growth.max(1),
            max_in_flight,
        }
    }

    fn grow(&mut self, device: &dyn GraphicsDevice) -> Result<()> {
        for _ in 0..self.growth {
            let key = self.buffers.insert(CommandBuffer::new(device)?);
            self.ready.push_back(key);
        }
        engine_debug!(
            "lr::CommandBufferManager",
            "Allocated {} command buffers ({} total)",
            self.growth,
            self.buffers.len()
        );
        Ok(())
    }

    fn slot(&mut self, slot: Slot) -> &mut Option<CommandBufferKey> {
        match slot {
            Slot::Active => &mut self.active,
            Slot::Upload => &mut self.upload,
        }
    }

    /// Cached key of `slot`, or a freshly begun buffer popped from `ready`
    fn acquire(&mut self, device: &dyn GraphicsDevice, slot: Slot) -> Result<CommandBufferKey> {
        if let Some(key) = *self.slot(slot) {
            return Ok(key);
        }

        if self.ready.is_empty() {
            self.grow(device)?;
        }
        let Some(key) = self.ready.pop_front() else {
            return Err(engine_err!(
                "lr::CommandBufferManager",
                "Command buffer pool is empty after growth"
            ));
        };
        match self.buffers.get_mut(key) {
            Some(cmd) => cmd.begin()?,
            None => {
                return Err(engine_err!(
                    "lr::CommandBufferManager",
                    "Ready queue holds a stale key"
                ));
            }
        }
        *self.slot(slot) = Some(key);

        debug_assert!(
            self.active.is_none() || self.active != self.upload,
            "active and upload buffers must be disjoint"
        );
        Ok(key)
    }

    /// The frame's recording buffer, begun on first request
    ///
    /// Repeated calls return the same buffer until it is submitted.
    pub fn active_command_buffer(
        &mut self,
        device: &dyn GraphicsDevice,
    ) -> Result<&mut CommandBuffer> {
        let key = self.acquire(device, Slot::Active)?;
        self.buffers
            .get_mut(key)
            .ok_or_else(|| {
                engine_err!("lr::CommandBufferManager", "Active command buffer slot is stale")
            })
    }

    /// The upload buffer, begun on first request
    pub fn upload_command_buffer(
        &mut self,
        device: &dyn GraphicsDevice,
    ) -> Result<&mut CommandBuffer> {
        let key = self.acquire(device, Slot::Upload)?;
        self.buffers
            .get_mut(key)
            .ok_or_else(|| {
                engine_err!("lr::CommandBufferManager", "Upload command buffer slot is stale")
            })
    }

    pub fn has_active_command_buffer(&self) -> bool {
        self.active.is_some()
    }

    pub fn has_upload_command_buffer(&self) -> bool {
        self.upload.is_some()
    }

    /// End and submit the buffer held in `slot`, then queue it as submitted
    ///
    /// On failure the buffer is discarded back to `ready`.
    fn submit_slot(
        &mut self,
        device: &dyn GraphicsDevice,
        queue: &mut Queue,
        slot: Slot,
        wait_semaphores: &[SemaphoreWait],
        signal_semaphores: &[Arc<dyn Semaphore>],
    ) -> Result<()> {
        let Some(key) = self.slot(slot).take() else {
            return Ok(());
        };
        let Some(cmd) = self.buffers.get_mut(key) else {
            return Err(engine_err!(
                "lr::CommandBufferManager",
                "{:?} command buffer slot is stale",
                slot
            ));
        };

        let submitted = match cmd.end() {
            Ok(()) => queue.submit(device, cmd, wait_semaphores, signal_semaphores),
            Err(err) => Err(err),
        };
        if let Err(err) = submitted {
            engine_warn!(
                "lr::CommandBufferManager",
                "{:?} command buffer was not submitted, discarding its commands",
                slot
            );
            cmd.discard()?;
            self.ready.push_back(key);
            return Err(err);
        }

        self.submitted.push_back(key);
        Ok(())
    }

    /// Submit the upload buffer on its own, if one is recording
    pub fn submit_upload_command_buffer(
        &mut self,
        device: &dyn GraphicsDevice,
        queue: &mut Queue,
    ) -> Result<()> {
        self.submit_slot(device, queue, Slot::Upload, &[], &[])?;
        self.reset_command_buffers(false)?;
        Ok(())
    }

    /// Submit the active buffer
    ///
    /// A pending upload buffer is submitted first, without semaphores. The
    /// active buffer waits on `wait_semaphores` and signals
    /// `signal_semaphores`. Completed buffers are recycled afterwards,
    /// blocking if too many are in flight.
    pub fn submit_active_command_buffer(
        &mut self,
        device: &dyn GraphicsDevice,
        queue: &mut Queue,
        wait_semaphores: &[SemaphoreWait],
        signal_semaphores: &[Arc<dyn Semaphore>],
    ) -> Result<()> {
        if self.active.is_none() {
            engine_bail_state!(
                "lr::CommandBufferManager",
                "submit_active_command_buffer called with no active command buffer"
            );
        }

        self.submit_slot(device, queue, Slot::Upload, &[], &[])?;
        self.submit_slot(device, queue, Slot::Active, wait_semaphores, signal_semaphores)?;
        self.reset_command_buffers(false)?;
        Ok(())
    }

    /// Recycle completed buffers in submission order
    ///
    /// Stops at the first buffer whose fence has not signaled. With
    /// `force_wait` every fence is waited on; otherwise only while more than
    /// the in-flight limit are submitted. Returns the number of recycled
    /// buffers.
    pub fn reset_command_buffers(&mut self, force_wait: bool) -> Result<usize> {
        if !force_wait && self.submitted.len() > self.max_in_flight {
            engine_trace!(
                "lr::CommandBufferManager",
                "{} command buffers in flight, waiting",
                self.submitted.len()
            );
        }

        let mut recycled = 0;
        while let Some(&key) = self.submitted.front() {
            // Only the excess over the limit is waited on.
            let wait = force_wait || self.submitted.len() > self.max_in_flight;
            let Some(cmd) = self.buffers.get_mut(key) else {
                return Err(engine_err!(
                    "lr::CommandBufferManager",
                    "Submitted queue holds a stale key"
                ));
            };
            if !cmd.reset(wait)? {
                break;
            }
            self.submitted.pop_front();
            self.ready.push_back(key);
            recycled += 1;
        }
        Ok(recycled)
    }

    /// Wait for every submitted buffer, then drop the whole pool
    pub fn destroy(&mut self) -> Result<()> {
        if self.active.is_some() || self.upload.is_some() {
            engine_warn!(
                "lr::CommandBufferManager",
                "Destroying pool with unsubmitted command buffers"
            );
        }
        self.reset_command_buffers(true)?;
        self.active = None;
        self.upload = None;
        self.ready.clear();
        self.buffers.clear();
        Ok(())
    }

    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.len()
    }

    /// Every buffer owned by the pool, whatever its set
    pub fn total_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}

#[cfg(test)]
#[path = "command_buffer_manager_tests.rs"]
mod tests;
