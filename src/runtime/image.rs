//! Image bitmaps
//!
//! Pixel buffers follow the same own-or-externalized rule as typed arrays.
//! Every format uses [`BYTES_PER_PIXEL`](crate::buffer::BYTES_PER_PIXEL) bytes per pixel.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::buffer::{BufferAllocator, default_allocator, image_size};
use crate::error::{Result, ValueError};
use crate::runtime::base::{BaseValue, ValueKind};
use crate::value::Value;

/// Pixel layout of an image buffer
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    Rgba = 0,
    Bgra = 1,
    Argb = 2,
    #[default]
    Invalid = 3,
}

/// Raw pixel bitmap
pub struct Image {
    bits: *mut u8,
    width: u32,
    height: u32,
    format: ImageFormat,
    externalized: bool,
    allocator: Rc<dyn BufferAllocator>,
}

impl Image {
    /// Wrap an existing pixel buffer using this thread's default allocator
    ///
    /// # Safety
    /// `bits` must be null or valid for `width * height * BYTES_PER_PIXEL`
    /// bytes for as long as this image refers to it. Unless `externalized` is
    /// set it must have been allocated by the default allocator.
    pub unsafe fn from_raw_parts(
        bits: *mut u8,
        width: u32,
        height: u32,
        format: ImageFormat,
        externalized: bool,
    ) -> Self {
        unsafe {
            Self::from_raw_parts_in(bits, width, height, format, externalized, default_allocator())
        }
    }

    /// Wrap an existing pixel buffer released through `allocator`
    ///
    /// # Safety
    /// Same contract as [`Image::from_raw_parts`], with `allocator` in place
    /// of the default allocator.
    pub unsafe fn from_raw_parts_in(
        bits: *mut u8,
        width: u32,
        height: u32,
        format: ImageFormat,
        externalized: bool,
        allocator: Rc<dyn BufferAllocator>,
    ) -> Self {
        Image {
            bits,
            width,
            height,
            format,
            externalized,
            allocator,
        }
    }

    /// Create an image with no pixel buffer
    pub fn empty_in(allocator: Rc<dyn BufferAllocator>) -> Self {
        // SAFETY: a null buffer is never read or freed
        unsafe {
            Self::from_raw_parts_in(
                std::ptr::null_mut(),
                0,
                0,
                ImageFormat::Invalid,
                false,
                allocator,
            )
        }
    }

    /// Create an image with a freshly allocated, owned pixel buffer
    pub fn new(width: u32, height: u32, format: ImageFormat) -> Result<Self> {
        Self::new_in(width, height, format, default_allocator())
    }

    pub fn new_in(
        width: u32,
        height: u32,
        format: ImageFormat,
        allocator: Rc<dyn BufferAllocator>,
    ) -> Result<Self> {
        let mut image = Self::empty_in(allocator);
        image.alloc(width, height, format)?;
        Ok(image)
    }

    /// Re-provision the pixel buffer
    ///
    /// An owned, non-null buffer is released first. An externalized buffer is
    /// left alone, so callers must already hold its pointer. Afterwards the
    /// image always owns its buffer.
    pub fn alloc(&mut self, width: u32, height: u32, format: ImageFormat) -> Result<()> {
        if !self.externalized && !self.bits.is_null() {
            log::trace!("image bits released for realloc: {:p}", self.bits);
            // SAFETY: an owned buffer came from this allocator
            unsafe { self.allocator.free_image_bits(self.bits) };
        }

        self.bits = self.allocator.alloc_image_bits(width, height);
        self.width = width;
        self.height = height;
        self.format = format;
        self.externalized = false;

        if self.bits.is_null() {
            let bytes = image_size(width, height).unwrap_or(usize::MAX);
            return Err(ValueError::AllocationFailed { bytes });
        }
        log::trace!("image bits allocated: {:p} ({}x{})", self.bits, width, height);
        Ok(())
    }

    /// Hand release responsibility for the pixel buffer to the caller
    pub fn externalize(&mut self) -> *mut u8 {
        if !self.externalized {
            log::trace!("image bits externalized: {:p}", self.bits);
        }
        self.externalized = true;
        self.bits
    }

    #[inline]
    pub fn bits(&self) -> *mut u8 {
        self.bits
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    #[inline]
    pub fn is_externalized(&self) -> bool {
        self.externalized
    }

    /// Size in bytes of a buffer for the current shape
    ///
    /// `None` when the shape does not fit in memory, which a failed
    /// [`Image::alloc`] can leave behind.
    #[inline]
    pub fn byte_len(&self) -> Option<usize> {
        image_size(self.width, self.height)
    }

    /// View the pixel buffer as bytes
    pub fn as_slice(&self) -> &[u8] {
        match self.byte_len() {
            // SAFETY: construction and alloc guarantee bits covers byte_len()
            Some(len) if !self.bits.is_null() => unsafe {
                std::slice::from_raw_parts(self.bits, len)
            },
            _ => &[],
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self.byte_len() {
            // SAFETY: construction and alloc guarantee bits covers byte_len()
            Some(len) if !self.bits.is_null() => unsafe {
                std::slice::from_raw_parts_mut(self.bits, len)
            },
            _ => &mut [],
        }
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        if !self.externalized && !self.bits.is_null() {
            log::trace!("image bits released: {:p}", self.bits);
            // SAFETY: an owned buffer came from this allocator
            unsafe { self.allocator.free_image_bits(self.bits) };
        }
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("bits", &self.bits)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("externalized", &self.externalized)
            .finish()
    }
}

impl BaseValue for Image {
    fn kind(&self) -> ValueKind {
        ValueKind::Image
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    /// Copy the pixels into a fresh owned buffer
    ///
    /// An image without bits copies its shape and format but stays without
    /// bits, so a failed `alloc` is reproduced rather than retried.
    fn deep_copy(&self) -> Result<Value> {
        let allocator = Rc::clone(&self.allocator);
        if self.bits.is_null() {
            let mut copy = Self::empty_in(allocator);
            copy.width = self.width;
            copy.height = self.height;
            copy.format = self.format;
            return Ok(Value::from_base(copy));
        }
        let mut copy = Self::new_in(self.width, self.height, self.format, allocator)?;
        copy.as_mut_slice().copy_from_slice(self.as_slice());
        Ok(Value::from_base(copy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SystemAllocator;

    #[test]
    fn test_new() {
        let image = Image::new(4, 2, ImageFormat::Rgba).unwrap();
        assert_eq!(image.width(), 4);
        assert_eq!(image.height(), 2);
        assert_eq!(image.format(), ImageFormat::Rgba);
        assert_eq!(image.byte_len(), Some(32));
        assert!(!image.bits().is_null());
        assert!(!image.is_externalized());
    }

    #[test]
    fn test_realloc_updates_shape() {
        let mut image = Image::new(1, 1, ImageFormat::Bgra).unwrap();
        image.as_mut_slice()[0] = 0xFF;

        image.alloc(3, 3, ImageFormat::Argb).unwrap();
        assert_eq!(image.byte_len(), Some(36));
        assert_eq!(image.format(), ImageFormat::Argb);
        assert!(image.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_alloc_clears_externalized() {
        let mut image = Image::new(2, 2, ImageFormat::Rgba).unwrap();
        let old = image.externalize();
        assert!(image.is_externalized());

        image.alloc(2, 2, ImageFormat::Rgba).unwrap();
        assert!(!image.is_externalized());
        assert_ne!(image.bits(), old);

        unsafe { SystemAllocator.free_image_bits(old) };
    }

    #[test]
    fn test_failed_alloc_keeps_shape() {
        let mut image = Image::new(2, 2, ImageFormat::Rgba).unwrap();
        let err = image.alloc(u32::MAX, u32::MAX, ImageFormat::Bgra).unwrap_err();
        assert_eq!(err, ValueError::AllocationFailed { bytes: usize::MAX });

        assert!(image.bits().is_null());
        assert_eq!(image.width(), u32::MAX);
        assert_eq!(image.format(), ImageFormat::Bgra);
        assert!(!image.is_externalized());
        assert_eq!(image.byte_len(), None);
        assert!(image.as_slice().is_empty());
        assert!(image.as_mut_slice().is_empty());

        image.alloc(1, 1, ImageFormat::Rgba).unwrap();
        assert_eq!(image.as_slice().len(), 4);
    }

    #[test]
    fn test_deep_copy_without_bits() {
        let mut image = Image::new(1, 1, ImageFormat::Argb).unwrap();
        assert!(image.alloc(u32::MAX, u32::MAX, ImageFormat::Argb).is_err());

        let copy = image.deep_copy().unwrap();
        let copy = copy.as_image().unwrap();
        assert!(copy.bits().is_null());
        assert_eq!(copy.width(), u32::MAX);
        assert_eq!(copy.format(), ImageFormat::Argb);
        assert!(!copy.is_externalized());
    }

    #[test]
    fn test_empty() {
        let image = Image::empty_in(Rc::new(SystemAllocator));
        assert!(image.bits().is_null());
        assert_eq!(image.format(), ImageFormat::Invalid);
        assert!(image.as_slice().is_empty());
    }

    #[test]
    fn test_deep_copy() {
        let mut image = Image::new(2, 1, ImageFormat::Rgba).unwrap();
        image.as_mut_slice().copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);

        let copy = image.deep_copy().unwrap();
        let copy = copy.as_image().unwrap();
        assert_eq!(copy.as_slice(), image.as_slice());
        assert_ne!(copy.bits(), image.bits());
    }
}
