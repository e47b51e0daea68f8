/// Buffer trait and buffer descriptor

use std::any::Any;

use bitflags::bitflags;

use crate::error::Result;

bitflags! {
    /// Buffer usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferUsage: u32 {
        const TRANSFER_SRC = 0x01;
        const TRANSFER_DST = 0x02;
        const UNIFORM = 0x04;
        const STORAGE = 0x08;
        const INDEX = 0x10;
        const VERTEX = 0x20;
        const INDIRECT = 0x40;
    }
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    /// Usage flags
    pub usage: BufferUsage,
    /// Host-visible memory, writable through `Buffer::update`
    pub host_visible: bool,
}

/// Buffer resource trait
pub trait Buffer: Send + Sync {
    /// Size in bytes
    fn size(&self) -> u64;

    /// Write bytes into a host-visible buffer
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset in bytes
    /// * `data` - Data to write
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}
