//! Typed array implementation
//!
//! A typed array wraps a raw byte buffer that is either owned (released
//! through its allocator on drop) or externalized (released by whoever took
//! it over).

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::buffer::{BufferAllocator, default_allocator};
use crate::error::{Result, ValueError};
use crate::runtime::base::{BaseValue, ValueKind};
use crate::value::Value;

/// Raw byte buffer of fixed length
pub struct TypedArray {
    /// Buffer start (may be null for an empty array)
    data: *mut u8,
    /// Length in bytes as allocated
    len: usize,
    /// When set, drop leaves the buffer alone
    externalized: bool,
    /// Routine set that provisioned the buffer
    allocator: Rc<dyn BufferAllocator>,
}

impl TypedArray {
    /// Wrap an existing buffer using this thread's default allocator
    ///
    /// # Safety
    /// `data` must be null or valid for `len` bytes for as long as this array
    /// refers to it. Unless `externalized` is set it must have been allocated
    /// by the default allocator, which will release it on drop.
    pub unsafe fn from_raw_parts(data: *mut u8, len: usize, externalized: bool) -> Self {
        unsafe { Self::from_raw_parts_in(data, len, externalized, default_allocator()) }
    }

    /// Wrap an existing buffer released through `allocator`
    ///
    /// # Safety
    /// Same contract as [`TypedArray::from_raw_parts`], with `allocator` in
    /// place of the default allocator.
    pub unsafe fn from_raw_parts_in(
        data: *mut u8,
        len: usize,
        externalized: bool,
        allocator: Rc<dyn BufferAllocator>,
    ) -> Self {
        TypedArray {
            data,
            len,
            externalized,
            allocator,
        }
    }

    /// Allocate an owned, zeroed buffer of `len` bytes
    pub fn alloc(len: usize) -> Result<Self> {
        Self::alloc_in(len, default_allocator())
    }

    /// Allocate an owned, zeroed buffer of `len` bytes through `allocator`
    pub fn alloc_in(len: usize, allocator: Rc<dyn BufferAllocator>) -> Result<Self> {
        let data = allocator.alloc_typed_array(len);
        if data.is_null() {
            return Err(ValueError::AllocationFailed { bytes: len });
        }
        log::trace!("typed array allocated: {:p} ({} bytes)", data, len);
        // SAFETY: freshly allocated by `allocator` for `len` bytes
        Ok(unsafe { Self::from_raw_parts_in(data, len, false, allocator) })
    }

    /// Allocate an owned buffer holding a copy of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_in(bytes, default_allocator())
    }

    pub fn from_bytes_in(bytes: &[u8], allocator: Rc<dyn BufferAllocator>) -> Result<Self> {
        let mut arr = Self::alloc_in(bytes.len(), allocator)?;
        arr.as_mut_slice().copy_from_slice(bytes);
        Ok(arr)
    }

    /// Get the raw buffer pointer
    #[inline]
    pub fn data(&self) -> *mut u8 {
        self.data
    }

    /// Get the length in bytes
    #[inline]
    pub fn count(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_externalized(&self) -> bool {
        self.externalized
    }

    /// Hand release responsibility to the caller
    ///
    /// The array keeps referring to the buffer but never frees it. The
    /// returned pointer must eventually be released with the allocator's
    /// `free_typed_array` (or whatever the caller's own contract is).
    pub fn externalize(&mut self) -> *mut u8 {
        if !self.externalized {
            log::trace!("typed array externalized: {:p} ({} bytes)", self.data, self.len);
        }
        self.externalized = true;
        self.data
    }

    /// View the buffer as bytes
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        if self.data.is_null() {
            return &[];
        }
        // SAFETY: construction guarantees data is valid for len bytes
        unsafe { std::slice::from_raw_parts(self.data, self.len) }
    }

    /// View the buffer as mutable bytes
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        if self.data.is_null() {
            return &mut [];
        }
        // SAFETY: construction guarantees data is valid for len bytes
        unsafe { std::slice::from_raw_parts_mut(self.data, self.len) }
    }

    /// Read a byte without bounds checking
    ///
    /// # Safety
    /// Caller must ensure `index < self.count()` and the buffer is non-null.
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> u8 {
        unsafe { *self.data.add(index) }
    }

    /// Allocator that releases this buffer
    #[inline]
    pub fn allocator(&self) -> &Rc<dyn BufferAllocator> {
        &self.allocator
    }
}

impl Drop for TypedArray {
    fn drop(&mut self) {
        if !self.externalized && !self.data.is_null() {
            log::trace!("typed array released: {:p} ({} bytes)", self.data, self.len);
            // SAFETY: an owned buffer came from this allocator for `len` bytes
            unsafe { self.allocator.free_typed_array(self.data, self.len) };
        }
    }
}

impl fmt::Debug for TypedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedArray")
            .field("data", &self.data)
            .field("len", &self.len)
            .field("externalized", &self.externalized)
            .finish()
    }
}

impl BaseValue for TypedArray {
    fn kind(&self) -> ValueKind {
        ValueKind::TypedArray
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn deep_copy(&self) -> Result<Value> {
        let copy = Self::from_bytes_in(self.as_slice(), Rc::clone(&self.allocator))?;
        Ok(Value::from_base(copy))
    }
}
