//! Buffer allocation
//!
//! Typed arrays and image bitmaps hold raw byte buffers that may be handed
//! across to a native renderer. Every buffer is provisioned and released through
//! a [`BufferAllocator`], so the owning container and the external party agree
//! on who frees what.

mod allocator;

pub use allocator::{
    BYTES_PER_PIXEL, BlockHeader, BufferAllocator, BufferTag, SystemAllocator, default_allocator,
    image_size, set_default_allocator,
};
