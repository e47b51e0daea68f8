/// StorageBuffer - a shader-visible buffer together with its `ResourceState`

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{Buffer, BufferDesc, GraphicsDevice};
use crate::sync::{ResourceState, Transition};

pub struct StorageBuffer {
    name: String,
    buffer: Arc<dyn Buffer>,
    state: AtomicU8,
}

impl StorageBuffer {
    /// Create the backing buffer; it starts as compute shader read
    pub fn new(device: &dyn GraphicsDevice, name: &str, desc: &BufferDesc) -> Result<Self> {
        let buffer = device.create_buffer(desc)?;
        Ok(Self::from_buffer(name, buffer))
    }

    pub fn from_buffer(name: &str, buffer: Arc<dyn Buffer>) -> Self {
        Self {
            name: name.to_string(),
            buffer,
            state: AtomicU8::new(ResourceState::ComputeShaderReadOnly as u8),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }

    pub fn size(&self) -> u64 {
        self.buffer.size()
    }

    pub fn state(&self) -> ResourceState {
        ResourceState::ALL[self.state.load(Ordering::Acquire) as usize]
    }

    pub fn set_state(&self, state: ResourceState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Move to `new_state`, returning a whole-buffer barrier
    ///
    /// Image layouts of the states are irrelevant here.
    pub fn update_layout_and_barrier(&self, new_state: ResourceState) -> Option<Transition> {
        let old_state = self.state();
        if old_state == new_state {
            return None;
        }
        self.set_state(new_state);
        Transition::for_buffer(self.buffer.clone(), old_state, new_state)
    }

    /// Write host data into the buffer
    pub fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.buffer.update(offset, data)
    }
}

impl std::fmt::Debug for StorageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageBuffer")
            .field("name", &self.name)
            .field("size", &self.size())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
#[path = "storage_buffer_tests.rs"]
mod tests;
