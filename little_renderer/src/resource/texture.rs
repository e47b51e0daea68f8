/// Texture - an image together with its current `ResourceState`
///
/// Textures are shared between renderpasses through `Arc<Texture>`. The state
/// is stored atomically so any holder can request a transition; recording is
/// single-threaded, so there is never a concurrent writer.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::engine_trace;
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, Image, ImageDesc, ImageSubresourceRange};
use crate::sync::{ResourceState, Transition};

pub struct Texture {
    name: String,
    image: Arc<dyn Image>,
    state: AtomicU8,
}

impl Texture {
    /// Create the backing image; the texture starts `Undefined`
    pub fn new(device: &dyn GraphicsDevice, name: &str, desc: &ImageDesc) -> Result<Self> {
        let image = device.create_image(desc)?;
        engine_trace!("lr::Texture", "Created texture '{}' ({}x{} {:?})", name, desc.width, desc.height, desc.format);
        Ok(Self::from_image(name, image, ResourceState::Undefined))
    }

    /// Wrap an existing image (e.g. a swapchain image) in a known state
    pub fn from_image(name: &str, image: Arc<dyn Image>, state: ResourceState) -> Self {
        Self { name: name.to_string(), image, state: AtomicU8::new(state as u8) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &Arc<dyn Image> {
        &self.image
    }

    pub fn desc(&self) -> &ImageDesc {
        self.image.desc()
    }

    pub fn extent(&self) -> (u32, u32) {
        (self.desc().width, self.desc().height)
    }

    pub fn is_depth(&self) -> bool {
        self.desc().format.is_depth()
    }

    pub fn full_range(&self) -> ImageSubresourceRange {
        self.desc().full_range()
    }

    /// Current logical state
    pub fn state(&self) -> ResourceState {
        ResourceState::ALL[self.state.load(Ordering::Acquire) as usize]
    }

    /// Adopt a state reached outside of tracked transitions
    pub fn set_state(&self, state: ResourceState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Move to `new_state`, returning the barrier that gets there
    ///
    /// Returns None when the texture is already in `new_state`.
    pub fn update_layout_and_barrier(&self, new_state: ResourceState) -> Option<Transition> {
        let old_state = self.state();
        if old_state == new_state {
            return None;
        }
        self.set_state(new_state);
        Transition::for_image(self.image.clone(), self.full_range(), old_state, new_state)
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("name", &self.name)
            .field("desc", self.desc())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
