/// TrackedResource - a texture or storage buffer named in a transition declaration

use std::sync::Arc;

use crate::resource::{StorageBuffer, Texture};
use crate::sync::{ResourceState, Transition};

#[derive(Debug, Clone)]
pub enum TrackedResource {
    Texture(Arc<Texture>),
    StorageBuffer(Arc<StorageBuffer>),
}

impl TrackedResource {
    pub fn name(&self) -> &str {
        match self {
            TrackedResource::Texture(t) => t.name(),
            TrackedResource::StorageBuffer(b) => b.name(),
        }
    }

    pub fn state(&self) -> ResourceState {
        match self {
            TrackedResource::Texture(t) => t.state(),
            TrackedResource::StorageBuffer(b) => b.state(),
        }
    }

    pub fn update_layout_and_barrier(&self, new_state: ResourceState) -> Option<Transition> {
        match self {
            TrackedResource::Texture(t) => t.update_layout_and_barrier(new_state),
            TrackedResource::StorageBuffer(b) => b.update_layout_and_barrier(new_state),
        }
    }
}

impl From<Arc<Texture>> for TrackedResource {
    fn from(texture: Arc<Texture>) -> Self {
        TrackedResource::Texture(texture)
    }
}

impl From<&Arc<Texture>> for TrackedResource {
    fn from(texture: &Arc<Texture>) -> Self {
        TrackedResource::Texture(texture.clone())
    }
}

impl From<Arc<StorageBuffer>> for TrackedResource {
    fn from(buffer: Arc<StorageBuffer>) -> Self {
        TrackedResource::StorageBuffer(buffer)
    }
}

impl From<&Arc<StorageBuffer>> for TrackedResource {
    fn from(buffer: &Arc<StorageBuffer>) -> Self {
        TrackedResource::StorageBuffer(buffer.clone())
    }
}
