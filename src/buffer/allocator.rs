//! Buffer allocator for typed arrays and image bitmaps
//!
//! Memory layout of a [`SystemAllocator`] block:
//! ```text
//! +------------------+
//! |   BlockHeader    |  (one word: tag | payload size)
//! +------------------+  <- pointer handed out
//! |   payload ...    |
//! +------------------+
//! ```
//!
//! The header lets `free_image_bits` recover the layout from the pointer alone.

use std::alloc::{self, Layout};
use std::cell::RefCell;
use std::rc::Rc;

/// Size of a word in bytes (matches pointer size)
const WORD_SIZE: usize = std::mem::size_of::<usize>();

/// Bytes per pixel of every supported image format
pub const BYTES_PER_PIXEL: usize = 4;

/// Number of bits reserved for the buffer tag
const TAG_BITS: u32 = 2;

/// Buffer tags - stored in the low bits of each block header
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTag {
    /// Typed array bytes
    TypedArray = 1,
    /// Image pixel data
    ImageBits = 2,
}

/// Block header preceding every system-allocated buffer
#[repr(C)]
#[derive(Clone, Copy)]
pub struct BlockHeader {
    pub bits: usize,
}

impl BlockHeader {
    /// Create a new block header
    #[inline]
    pub const fn new(tag: BufferTag, size: usize) -> Self {
        BlockHeader {
            bits: (tag as usize) | (size << TAG_BITS),
        }
    }

    /// Get the buffer tag
    #[inline]
    pub const fn tag(&self) -> Option<BufferTag> {
        match self.bits & ((1 << TAG_BITS) - 1) {
            1 => Some(BufferTag::TypedArray),
            2 => Some(BufferTag::ImageBits),
            _ => None,
        }
    }

    /// Get the payload size in bytes (excluding header)
    #[inline]
    pub const fn size(&self) -> usize {
        self.bits >> TAG_BITS
    }
}

/// Number of bytes in a `width` x `height` bitmap, or `None` on overflow
#[inline]
pub fn image_size(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(BYTES_PER_PIXEL)
}

/// Provisioning and release routines for externally visible buffers
///
/// Implementations may return null from the `alloc_*` methods to signal
/// failure. The `free_*` methods are never called with null.
///
/// # Safety
/// Containers build safe slices over what the `alloc_*` methods return, so a
/// non-null result must be valid for reads and writes of the requested size
/// (`len` bytes, or `width * height * BYTES_PER_PIXEL` bytes) and zeroed,
/// and must stay valid until it is passed back to the matching `free_*`
/// method.
///
/// An implementation written without `unsafe impl` is rejected:
/// ```compile_fail
/// struct Bogus;
///
/// impl docvalue::BufferAllocator for Bogus {
///     fn alloc_typed_array(&self, _len: usize) -> *mut u8 {
///         8 as *mut u8
///     }
///     unsafe fn free_typed_array(&self, _data: *mut u8, _len: usize) {}
///     fn alloc_image_bits(&self, _width: u32, _height: u32) -> *mut u8 {
///         8 as *mut u8
///     }
///     unsafe fn free_image_bits(&self, _bits: *mut u8) {}
/// }
/// ```
pub unsafe trait BufferAllocator {
    /// Allocate a zeroed typed-array buffer of `len` bytes
    fn alloc_typed_array(&self, len: usize) -> *mut u8;

    /// Release a typed-array buffer previously obtained from this allocator
    ///
    /// # Safety
    /// `data` must have been returned by `alloc_typed_array(len)` on this
    /// allocator and not released since.
    unsafe fn free_typed_array(&self, data: *mut u8, len: usize);

    /// Allocate a zeroed pixel buffer for a `width` x `height` bitmap
    fn alloc_image_bits(&self, width: u32, height: u32) -> *mut u8;

    /// Release a pixel buffer previously obtained from this allocator
    ///
    /// # Safety
    /// `bits` must have been returned by `alloc_image_bits` on this allocator
    /// and not released since.
    unsafe fn free_image_bits(&self, bits: *mut u8);
}

/// Process allocator backed by the global Rust allocator
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl SystemAllocator {
    #[inline]
    fn layout(size: usize) -> Option<Layout> {
        let total = size.checked_add(WORD_SIZE)?;
        Layout::from_size_align(total, WORD_SIZE).ok()
    }

    fn alloc_block(&self, size: usize, tag: BufferTag) -> *mut u8 {
        // A header that cannot hold the size would corrupt the tag bits
        if size > (usize::MAX >> TAG_BITS) {
            return std::ptr::null_mut();
        }
        let Some(layout) = Self::layout(size) else {
            return std::ptr::null_mut();
        };

        // SAFETY: layout has non-zero size (at least one word for the header)
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            return ptr;
        }

        // SAFETY: ptr is word-aligned and the block holds at least one word
        unsafe {
            (ptr as *mut BlockHeader).write(BlockHeader::new(tag, size));
            ptr.add(WORD_SIZE)
        }
    }

    /// Get the header for an allocated block
    ///
    /// # Safety
    /// `data` must have been returned by this allocator and not yet freed.
    #[inline]
    pub unsafe fn header(data: *mut u8) -> BlockHeader {
        unsafe { *(data.sub(WORD_SIZE) as *const BlockHeader) }
    }

    /// # Safety
    /// `data` must have been returned by this allocator and not yet freed.
    unsafe fn free_block(&self, data: *mut u8, tag: BufferTag) {
        unsafe {
            let header = Self::header(data);
            debug_assert_eq!(header.tag(), Some(tag), "buffer freed through the wrong routine");
            if let Some(layout) = Self::layout(header.size()) {
                alloc::dealloc(data.sub(WORD_SIZE), layout);
            }
        }
    }
}

// SAFETY: blocks come from `alloc_zeroed` with room for the requested payload
unsafe impl BufferAllocator for SystemAllocator {
    fn alloc_typed_array(&self, len: usize) -> *mut u8 {
        self.alloc_block(len, BufferTag::TypedArray)
    }

    unsafe fn free_typed_array(&self, data: *mut u8, len: usize) {
        // SAFETY: caller hands back one of our live blocks
        unsafe {
            debug_assert_eq!(Self::header(data).size(), len);
            self.free_block(data, BufferTag::TypedArray);
        }
    }

    fn alloc_image_bits(&self, width: u32, height: u32) -> *mut u8 {
        match image_size(width, height) {
            Some(size) => self.alloc_block(size, BufferTag::ImageBits),
            None => std::ptr::null_mut(),
        }
    }

    unsafe fn free_image_bits(&self, bits: *mut u8) {
        // SAFETY: caller hands back one of our live blocks
        unsafe { self.free_block(bits, BufferTag::ImageBits) }
    }
}

thread_local! {
    static DEFAULT_ALLOCATOR: RefCell<Rc<dyn BufferAllocator>> =
        RefCell::new(Rc::new(SystemAllocator));
}

/// Allocator used by containers constructed without an explicit one
pub fn default_allocator() -> Rc<dyn BufferAllocator> {
    DEFAULT_ALLOCATOR.with(|a| Rc::clone(&a.borrow()))
}

/// Replace this thread's default allocator, returning the previous one
pub fn set_default_allocator(allocator: Rc<dyn BufferAllocator>) -> Rc<dyn BufferAllocator> {
    DEFAULT_ALLOCATOR.with(|a| a.replace(allocator))
}
