//! DocValue - self-describing values for a document/renderer boundary
//!
//! DocValue carries structured data between a scripting layer and a native
//! rendering layer. A [`Value`] handle holds one of:
//! - a primitive (boolean, integer, double, UTF-8 or UTF-16 string)
//! - a fixed-length array of handles
//! - an insertion-ordered object of handles
//! - a typed array over a raw byte buffer
//! - an image bitmap over a raw pixel buffer
//!
//! Raw buffers are either owned by the value (released through a
//! [`BufferAllocator`] on drop) or externalized to a caller who takes over
//! their lifetime.
//!
//! # Example
//! ```
//! use docvalue::Value;
//!
//! let obj = Value::object();
//! *obj.property("answer").unwrap() = Value::from(42);
//! assert!(obj.property("missing").unwrap().is_undefined());
//! assert_eq!(obj.property_names().unwrap(), vec!["answer"]);
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod value;

// Buffer provisioning
pub mod buffer;

// Concrete value kinds
pub mod runtime;

// Utilities
pub mod util;

// Re-export main types
pub use buffer::{BufferAllocator, SystemAllocator};
pub use config::MismatchPolicy;
pub use error::{Result, ValueError};
pub use runtime::{
    Array, BaseValue, Image, ImageFormat, Object, Primitive, PrimitiveKind, TypedArray, ValueKind,
};
pub use util::WideString;
pub use value::Value;
