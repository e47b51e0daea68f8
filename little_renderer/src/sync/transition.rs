//! Mergeable batch of pending pipeline barriers
//!
//! A `Transition` accumulates image, buffer and global memory barriers
//! computed from `ResourceState` pairs. It is merged into the pending
//! transition of a `CommandBuffer` and emitted as a single pipeline barrier
//! when the buffer flushes.

use std::fmt;
use std::sync::Arc;

use crate::graphics_device::{Buffer, Image, ImageSubresourceRange};
use crate::sync::{AccessFlags, ImageLayout, PipelineStage, PipelineStages, ResourceState};

/// Layout and access change of one image subresource range
#[derive(Clone)]
pub struct ImageBarrier {
    pub image: Arc<dyn Image>,
    pub range: ImageSubresourceRange,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    /// States the barrier was computed from
    pub old_state: ResourceState,
    pub new_state: ResourceState,
}

impl fmt::Debug for ImageBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBarrier")
            .field("old_state", &self.old_state)
            .field("new_state", &self.new_state)
            .field("src_access", &self.src_access)
            .field("dst_access", &self.dst_access)
            .finish_non_exhaustive()
    }
}

/// Access change of a whole buffer
#[derive(Clone)]
pub struct BufferBarrier {
    pub buffer: Arc<dyn Buffer>,
    pub offset: u64,
    pub size: u64,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub old_state: ResourceState,
    pub new_state: ResourceState,
}

impl fmt::Debug for BufferBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferBarrier")
            .field("old_state", &self.old_state)
            .field("new_state", &self.new_state)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Global memory dependency not tied to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryBarrier {
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
}

/// Finalized view of a Transition handed to `CommandList::pipeline_barrier`
#[derive(Debug, Clone, Copy)]
pub struct BarrierBatch<'a> {
    pub src_stages: PipelineStages,
    pub dst_stages: PipelineStages,
    pub memory_barriers: &'a [MemoryBarrier],
    pub image_barriers: &'a [ImageBarrier],
    pub buffer_barriers: &'a [BufferBarrier],
}

/// Batch of pending barriers
///
/// The four mask fields are the union over every barrier added or merged in.
/// `build` finalizes the stage masks that are actually emitted.
#[derive(Debug, Clone)]
pub struct Transition {
    image_barriers: Vec<ImageBarrier>,
    buffer_barriers: Vec<BufferBarrier>,
    memory_barriers: Vec<MemoryBarrier>,
    src_stages: PipelineStages,
    dst_stages: PipelineStages,
    src_access: AccessFlags,
    dst_access: AccessFlags,
    earliest: PipelineStage,
    built: Option<(PipelineStages, PipelineStages)>,
}

impl Default for Transition {
    fn default() -> Self {
        Self::new()
    }
}

/// Source and destination halves of a state change, or None for a no-op
fn barrier_masks(
    old_state: ResourceState,
    new_state: ResourceState,
) -> Option<(PipelineStages, AccessFlags, PipelineStages, AccessFlags)> {
    if old_state == new_state {
        return None;
    }

    let old = old_state.info();
    let new = new_state.info();

    // Leaving a read state needs no availability operation.
    let (src_stages, src_access) = if old_state.is_write() {
        (old.stage_out, old.access_out)
    } else {
        (PipelineStages::empty(), AccessFlags::empty())
    };

    Some((src_stages, src_access, new.stage_in, new.access_in))
}

impl Transition {
    /// Create an empty transition
    pub fn new() -> Self {
        Self {
            image_barriers: Vec::new(),
            buffer_barriers: Vec::new(),
            memory_barriers: Vec::new(),
            src_stages: PipelineStages::empty(),
            dst_stages: PipelineStages::empty(),
            src_access: AccessFlags::empty(),
            dst_access: AccessFlags::empty(),
            earliest: PipelineStage::InvalidEnum,
            built: None,
        }
    }

    /// Single-image transition, or None when the states are equal
    pub fn for_image(
        image: Arc<dyn Image>,
        range: ImageSubresourceRange,
        old_state: ResourceState,
        new_state: ResourceState,
    ) -> Option<Self> {
        let mut transition = Self::new();
        transition
            .compute_image_barrier(image, range, old_state, new_state)
            .then_some(transition)
    }

    /// Single-buffer transition, or None when the states are equal
    pub fn for_buffer(
        buffer: Arc<dyn Buffer>,
        old_state: ResourceState,
        new_state: ResourceState,
    ) -> Option<Self> {
        let mut transition = Self::new();
        transition
            .compute_buffer_barrier(buffer, old_state, new_state)
            .then_some(transition)
    }

    fn accumulate(
        &mut self,
        new_state: ResourceState,
        src_stages: PipelineStages,
        src_access: AccessFlags,
        dst_stages: PipelineStages,
        dst_access: AccessFlags,
    ) {
        self.src_stages |= src_stages;
        self.dst_stages |= dst_stages;
        self.src_access |= src_access;
        self.dst_access |= dst_access;
        self.earliest = self.earliest.min(new_state.info().barrier_index);
        self.built = None;
    }

    /// Also wait on work in `stages` before the barrier's destination
    ///
    /// Chains the barrier after a semaphore wait performed at `stages`.
    pub fn add_src_stages(&mut self, stages: PipelineStages) {
        self.src_stages |= stages;
        self.built = None;
    }

    /// Append an image barrier for `old_state -> new_state`
    ///
    /// Returns false and appends nothing when the states are equal.
    pub fn compute_image_barrier(
        &mut self,
        image: Arc<dyn Image>,
        range: ImageSubresourceRange,
        old_state: ResourceState,
        new_state: ResourceState,
    ) -> bool {
        let Some((src_stages, src_access, dst_stages, dst_access)) =
            barrier_masks(old_state, new_state)
        else {
            return false;
        };

        self.image_barriers.push(ImageBarrier {
            image,
            range,
            old_layout: old_state.layout(),
            new_layout: new_state.layout(),
            src_access,
            dst_access,
            old_state,
            new_state,
        });
        self.accumulate(new_state, src_stages, src_access, dst_stages, dst_access);
        true
    }

    /// Append a whole-buffer barrier for `old_state -> new_state`
    pub fn compute_buffer_barrier(
        &mut self,
        buffer: Arc<dyn Buffer>,
        old_state: ResourceState,
        new_state: ResourceState,
    ) -> bool {
        let Some((src_stages, src_access, dst_stages, dst_access)) =
            barrier_masks(old_state, new_state)
        else {
            return false;
        };

        let size = buffer.size();
        self.buffer_barriers.push(BufferBarrier {
            buffer,
            offset: 0,
            size,
            src_access,
            dst_access,
            old_state,
            new_state,
        });
        self.accumulate(new_state, src_stages, src_access, dst_stages, dst_access);
        true
    }

    /// Append a global memory barrier for `old_state -> new_state`
    pub fn compute_memory_barrier(&mut self, old_state: ResourceState, new_state: ResourceState) -> bool {
        let Some((src_stages, src_access, dst_stages, dst_access)) =
            barrier_masks(old_state, new_state)
        else {
            return false;
        };

        self.memory_barriers.push(MemoryBarrier { src_access, dst_access });
        self.accumulate(new_state, src_stages, src_access, dst_stages, dst_access);
        true
    }

    /// Append every barrier of `other` and union its masks
    pub fn merge(&mut self, other: Transition) {
        self.image_barriers.extend(other.image_barriers);
        self.buffer_barriers.extend(other.buffer_barriers);
        self.memory_barriers.extend(other.memory_barriers);
        self.src_stages |= other.src_stages;
        self.dst_stages |= other.dst_stages;
        self.src_access |= other.src_access;
        self.dst_access |= other.dst_access;
        self.earliest = self.earliest.min(other.earliest);
        self.built = None;
    }

    /// Finalize the barrier for emission
    ///
    /// Idempotent. Returns false if there is nothing to emit. Empty stage
    /// masks become TOP_OF_PIPE (source) and BOTTOM_OF_PIPE (destination).
    pub fn build(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }

        if self.built.is_none() {
            let src = if self.src_stages.is_empty() {
                PipelineStages::TOP_OF_PIPE
            } else {
                self.src_stages
            };
            let dst = if self.dst_stages.is_empty() {
                PipelineStages::BOTTOM_OF_PIPE
            } else {
                self.dst_stages
            };
            self.built = Some((src, dst));
        }
        true
    }

    /// Barrier batch to record; None until `build` has succeeded
    pub fn batch(&self) -> Option<BarrierBatch<'_>> {
        let (src_stages, dst_stages) = self.built?;
        Some(BarrierBatch {
            src_stages,
            dst_stages,
            memory_barriers: &self.memory_barriers,
            image_barriers: &self.image_barriers,
            buffer_barriers: &self.buffer_barriers,
        })
    }

    /// Clear accumulated barriers, keeping allocations for reuse
    pub fn reset(&mut self) {
        self.image_barriers.clear();
        self.buffer_barriers.clear();
        self.memory_barriers.clear();
        self.src_stages = PipelineStages::empty();
        self.dst_stages = PipelineStages::empty();
        self.src_access = AccessFlags::empty();
        self.dst_access = AccessFlags::empty();
        self.earliest = PipelineStage::InvalidEnum;
        self.built = None;
    }

    pub fn is_empty(&self) -> bool {
        self.image_barriers.is_empty() && self.buffer_barriers.is_empty() && self.memory_barriers.is_empty()
    }

    pub fn has_image_barriers(&self) -> bool {
        !self.image_barriers.is_empty()
    }

    pub fn has_buffer_barriers(&self) -> bool {
        !self.buffer_barriers.is_empty()
    }

    pub fn has_memory_barriers(&self) -> bool {
        !self.memory_barriers.is_empty()
    }

    pub fn image_barriers(&self) -> &[ImageBarrier] {
        &self.image_barriers
    }

    pub fn buffer_barriers(&self) -> &[BufferBarrier] {
        &self.buffer_barriers
    }

    pub fn memory_barriers(&self) -> &[MemoryBarrier] {
        &self.memory_barriers
    }

    pub fn src_stages(&self) -> PipelineStages {
        self.src_stages
    }

    pub fn dst_stages(&self) -> PipelineStages {
        self.dst_stages
    }

    pub fn src_access(&self) -> AccessFlags {
        self.src_access
    }

    pub fn dst_access(&self) -> AccessFlags {
        self.dst_access
    }

    /// Earliest barrier index over every destination state
    ///
    /// `PipelineStage::InvalidEnum` when empty.
    pub fn earliest_barrier_index(&self) -> PipelineStage {
        self.earliest
    }

    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }
}

#[cfg(test)]
#[path = "transition_tests.rs"]
mod tests;
