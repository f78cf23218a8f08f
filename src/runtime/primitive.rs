//! Primitive values
//!
//! A primitive holds exactly one of boolean, integer, double, narrow string or
//! wide string. The kind is fixed at construction.

use std::any::Any;

use crate::config::{MismatchPolicy, mismatch_policy};
use crate::error::{Result, ValueError};
use crate::runtime::base::{BaseValue, ValueKind};
use crate::util::unicode::{WideString, narrow_to_wide, wide_to_narrow};
use crate::value::Value;

/// Primitive kind tags
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean = 0,
    Integer = 1,
    Double = 2,
    /// Narrow (UTF-8) string
    StringA = 3,
    /// Wide (UTF-16) string
    StringW = 4,
}

impl PrimitiveKind {
    /// Human readable name
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Double => "double",
            PrimitiveKind::StringA => "narrow string",
            PrimitiveKind::StringW => "wide string",
        }
    }
}

/// Immutable primitive value
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Bool(bool),
    Int(i32),
    Double(f64),
    StringA(String),
    StringW(WideString),
}

/// Resolve a mismatched conversion according to `policy`
pub(crate) fn mismatch<T>(
    policy: MismatchPolicy,
    expected: &'static str,
    found: &'static str,
    default: T,
) -> Result<T> {
    match policy {
        MismatchPolicy::Strict => {
            log::debug!("strict conversion rejected: wanted {}, have {}", expected, found);
            Err(ValueError::TypeMismatch { expected, found })
        }
        MismatchPolicy::Permissive => Ok(default),
    }
}

impl Primitive {
    /// Get the kind tag
    #[inline]
    pub fn primitive_kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Bool(_) => PrimitiveKind::Boolean,
            Primitive::Int(_) => PrimitiveKind::Integer,
            Primitive::Double(_) => PrimitiveKind::Double,
            Primitive::StringA(_) => PrimitiveKind::StringA,
            Primitive::StringW(_) => PrimitiveKind::StringW,
        }
    }

    // Type checking

    #[inline]
    pub fn is_bool(&self) -> bool {
        matches!(self, Primitive::Bool(_))
    }

    #[inline]
    pub fn is_int(&self) -> bool {
        matches!(self, Primitive::Int(_))
    }

    /// Check if this is a double; integers also qualify
    #[inline]
    pub fn is_double(&self) -> bool {
        matches!(self, Primitive::Double(_) | Primitive::Int(_))
    }

    #[inline]
    pub fn is_string_a(&self) -> bool {
        matches!(self, Primitive::StringA(_))
    }

    #[inline]
    pub fn is_string_w(&self) -> bool {
        matches!(self, Primitive::StringW(_))
    }

    /// Borrow the narrow string without transcoding
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Primitive::StringA(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the wide string without transcoding
    #[inline]
    pub fn as_wide(&self) -> Option<&[u16]> {
        match self {
            Primitive::StringW(w) => Some(w),
            _ => None,
        }
    }

    // Conversions under the thread's current policy

    pub fn to_bool(&self) -> Result<bool> {
        self.to_bool_with(mismatch_policy())
    }

    pub fn to_int(&self) -> Result<i32> {
        self.to_int_with(mismatch_policy())
    }

    pub fn to_double(&self) -> Result<f64> {
        self.to_double_with(mismatch_policy())
    }

    pub fn to_string_a(&self) -> Result<String> {
        self.to_string_a_with(mismatch_policy())
    }

    pub fn to_string_w(&self) -> Result<WideString> {
        self.to_string_w_with(mismatch_policy())
    }

    // Conversions under an explicit policy

    pub fn to_bool_with(&self, policy: MismatchPolicy) -> Result<bool> {
        match self {
            Primitive::Bool(b) => Ok(*b),
            other => mismatch(policy, "boolean", other.primitive_kind().name(), false),
        }
    }

    /// Doubles truncate toward zero, saturating at the `i32` bounds (NaN is 0)
    pub fn to_int_with(&self, policy: MismatchPolicy) -> Result<i32> {
        match self {
            Primitive::Int(i) => Ok(*i),
            Primitive::Double(d) => Ok(*d as i32),
            other => mismatch(policy, "integer", other.primitive_kind().name(), 0),
        }
    }

    pub fn to_double_with(&self, policy: MismatchPolicy) -> Result<f64> {
        match self {
            Primitive::Double(d) => Ok(*d),
            Primitive::Int(i) => Ok(f64::from(*i)),
            other => mismatch(policy, "double", other.primitive_kind().name(), 0.0),
        }
    }

    pub fn to_string_a_with(&self, policy: MismatchPolicy) -> Result<String> {
        match self {
            Primitive::StringA(s) => Ok(s.clone()),
            Primitive::StringW(w) => Ok(wide_to_narrow(w)),
            other => mismatch(policy, "string", other.primitive_kind().name(), String::new()),
        }
    }

    pub fn to_string_w_with(&self, policy: MismatchPolicy) -> Result<WideString> {
        match self {
            Primitive::StringW(w) => Ok(w.clone()),
            Primitive::StringA(s) => Ok(narrow_to_wide(s)),
            other => mismatch(policy, "string", other.primitive_kind().name(), WideString::new()),
        }
    }
}

impl From<bool> for Primitive {
    fn from(value: bool) -> Self {
        Primitive::Bool(value)
    }
}

impl From<i32> for Primitive {
    fn from(value: i32) -> Self {
        Primitive::Int(value)
    }
}

impl From<f64> for Primitive {
    fn from(value: f64) -> Self {
        Primitive::Double(value)
    }
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Primitive::StringA(value.to_owned())
    }
}

impl From<String> for Primitive {
    fn from(value: String) -> Self {
        Primitive::StringA(value)
    }
}

impl From<WideString> for Primitive {
    fn from(value: WideString) -> Self {
        Primitive::StringW(value)
    }
}

impl BaseValue for Primitive {
    fn kind(&self) -> ValueKind {
        ValueKind::Primitive
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn deep_copy(&self) -> Result<Value> {
        Ok(Value::from_base(self.clone()))
    }
}
