//! Base value abstraction
//!
//! Every concrete kind a [`Value`](crate::Value) handle can hold implements
//! [`BaseValue`]. The handle stores one `dyn BaseValue` behind a single
//! ownership slot and downcasts through [`BaseValue::as_any`].

use std::any::Any;
use std::fmt;

use crate::error::Result;
use crate::value::Value;

/// Kind identifiers for value handles
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Logically absent
    Undefined = 0,
    /// Explicit null
    Null = 1,
    /// Boolean, number or string
    Primitive = 2,
    /// Fixed-length sequence of handles
    Array = 3,
    /// Raw byte buffer
    TypedArray = 4,
    /// String-keyed mapping of handles
    Object = 5,
    /// Raw pixel bitmap
    Image = 6,
}

impl ValueKind {
    /// Human readable name
    pub const fn name(self) -> &'static str {
        match self {
            ValueKind::Undefined => "undefined",
            ValueKind::Null => "null",
            ValueKind::Primitive => "primitive",
            ValueKind::Array => "array",
            ValueKind::TypedArray => "typed array",
            ValueKind::Object => "object",
            ValueKind::Image => "image",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Common capability of all concrete value kinds
pub trait BaseValue: Any + fmt::Debug {
    /// Kind tag of the concrete type
    fn kind(&self) -> ValueKind;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Produce an independent copy wrapped in a new handle
    ///
    /// Containers copy their handles recursively and buffers are copied into
    /// fresh allocations owned by the copy.
    fn deep_copy(&self) -> Result<Value>;
}

impl dyn BaseValue {
    /// Check if the concrete type is `T`
    #[inline]
    pub fn is<T: BaseValue>(&self) -> bool {
        self.as_any().is::<T>()
    }

    #[inline]
    pub fn downcast_ref<T: BaseValue>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    #[inline]
    pub fn downcast_mut<T: BaseValue>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}
