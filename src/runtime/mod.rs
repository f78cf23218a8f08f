//! Runtime support
//!
//! This module contains the concrete kinds a value handle can hold:
//! - Primitive values (boolean, number, narrow and wide strings)
//! - Array and object containers of handles
//! - Typed arrays and image bitmaps over raw buffers
//! - The base value abstraction they all implement

pub mod array;
pub mod base;
pub mod image;
pub mod object;
pub mod primitive;
pub mod typed_array;

pub use array::Array;
pub use base::{BaseValue, ValueKind};
pub use image::{Image, ImageFormat};
pub use object::Object;
pub use primitive::{Primitive, PrimitiveKind};
pub use typed_array::TypedArray;
