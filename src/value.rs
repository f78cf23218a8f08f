//! Value handle
//!
//! A [`Value`] is either undefined, null, or holds exactly one concrete kind
//! implementing [`BaseValue`] behind a shared slot.
//!
//! # Copy semantics
//! Cloning a handle shares the held value: no buffer is duplicated and
//! mutations through one clone are visible through the other.
//! [`Value::deep_copy`] produces an independent value with fresh buffers.
//!
//! Shared handles make it possible to store a container inside itself. Such a
//! cycle is never collected, so its buffers leak; deep copies refuse it with
//! [`ValueError::Cycle`] and `Debug` prints the revisited node as `<cycle ..>`.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::thread::LocalKey;

use crate::config::{MismatchPolicy, mismatch_policy};
use crate::error::{Result, ValueError};
use crate::runtime::primitive::mismatch;
use crate::runtime::{Array, BaseValue, Image, Object, Primitive, TypedArray, ValueKind};
use crate::util::unicode::{WideString, wide_to_narrow};

/// Storage behind a handle
///
/// The kind of a held value never changes, so it is cached next to the cell
/// and stays readable while the cell is mutably borrowed.
#[derive(Clone, Default)]
enum Slot {
    #[default]
    Undefined,
    Null,
    Base(ValueKind, Rc<RefCell<dyn BaseValue>>),
}

type VisitSet = RefCell<HashSet<usize>>;

thread_local! {
    static DEEP_COPYING: VisitSet = RefCell::new(HashSet::new());
    static FORMATTING: VisitSet = RefCell::new(HashSet::new());
}

/// Marks a held value as on the current traversal path until dropped
struct Visit {
    set: &'static LocalKey<VisitSet>,
    key: usize,
}

impl Visit {
    /// Returns `None` if the value is already on the path
    fn enter(
        set: &'static LocalKey<VisitSet>,
        cell: &Rc<RefCell<dyn BaseValue>>,
    ) -> Option<Self> {
        let key = Rc::as_ptr(cell) as *const () as usize;
        set.with(|s| s.borrow_mut().insert(key)).then(|| Visit { set, key })
    }
}

impl Drop for Visit {
    fn drop(&mut self) {
        self.set.with(|s| s.borrow_mut().remove(&self.key));
    }
}

/// Discriminated, shared value handle
///
/// `Value` is `!Send` and `!Sync`; sharing across threads is not supported.
#[derive(Clone, Default)]
pub struct Value(Slot);

impl Value {
    // Constructors

    /// Create an undefined value
    #[inline]
    pub const fn undefined() -> Self {
        Value(Slot::Undefined)
    }

    /// Create a null value
    #[inline]
    pub const fn null() -> Self {
        Value(Slot::Null)
    }

    /// Wrap a concrete kind in a new handle
    pub fn from_base<T: BaseValue>(value: T) -> Self {
        let kind = value.kind();
        let cell: Rc<RefCell<dyn BaseValue>> = Rc::new(RefCell::new(value));
        Value(Slot::Base(kind, cell))
    }

    /// Create an array with `count` undefined slots
    pub fn array(count: usize) -> Self {
        Value::from_base(Array::with_count(count))
    }

    /// Create an array from an ordered list of handles
    pub fn from_array(values: Vec<Value>) -> Self {
        Value::from_base(Array::from_values(values))
    }

    /// Create an empty object
    pub fn object() -> Self {
        Value::from_base(Object::new())
    }

    pub fn typed_array(array: TypedArray) -> Self {
        Value::from_base(array)
    }

    pub fn image(image: Image) -> Self {
        Value::from_base(image)
    }

    // Type checking

    /// Get the kind of the held value
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match &self.0 {
            Slot::Undefined => ValueKind::Undefined,
            Slot::Null => ValueKind::Null,
            Slot::Base(kind, _) => *kind,
        }
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self.0, Slot::Undefined)
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self.0, Slot::Null)
    }

    /// Check if this is null or undefined
    #[inline]
    pub fn is_nullish(&self) -> bool {
        matches!(self.0, Slot::Undefined | Slot::Null)
    }

    pub fn is_primitive(&self) -> bool {
        self.kind() == ValueKind::Primitive
    }

    pub fn is_bool(&self) -> bool {
        self.with_primitive(Primitive::is_bool)
    }

    pub fn is_int(&self) -> bool {
        self.with_primitive(Primitive::is_int)
    }

    /// Check if this is a double; integers also qualify
    pub fn is_double(&self) -> bool {
        self.with_primitive(Primitive::is_double)
    }

    pub fn is_string_a(&self) -> bool {
        self.with_primitive(Primitive::is_string_a)
    }

    pub fn is_string_w(&self) -> bool {
        self.with_primitive(Primitive::is_string_w)
    }

    pub fn is_array(&self) -> bool {
        self.kind() == ValueKind::Array
    }

    pub fn is_typed_array(&self) -> bool {
        self.kind() == ValueKind::TypedArray
    }

    pub fn is_object(&self) -> bool {
        self.kind() == ValueKind::Object
    }

    pub fn is_image(&self) -> bool {
        self.kind() == ValueKind::Image
    }

    fn with_primitive(&self, f: impl FnOnce(&Primitive) -> bool) -> bool {
        self.as_primitive().is_some_and(|p| f(&*p))
    }

    /// Check if both handles refer to the same held value
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (&self.0, &other.0) {
            (Slot::Undefined, Slot::Undefined) | (Slot::Null, Slot::Null) => true,
            (Slot::Base(_, a), Slot::Base(_, b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Number of handles sharing the held value (0 for undefined and null)
    pub fn handle_count(&self) -> usize {
        match &self.0 {
            Slot::Base(_, cell) => Rc::strong_count(cell),
            _ => 0,
        }
    }

    // Downcasting

    fn downcast<T: BaseValue>(&self) -> Option<Ref<'_, T>> {
        match &self.0 {
            Slot::Base(_, cell) => {
                let base = cell.try_borrow().ok()?;
                Ref::filter_map(base, |b| b.downcast_ref::<T>()).ok()
            }
            _ => None,
        }
    }

    fn downcast_mut<T: BaseValue>(&self) -> Option<RefMut<'_, T>> {
        match &self.0 {
            Slot::Base(_, cell) => {
                let base = cell.try_borrow_mut().ok()?;
                RefMut::filter_map(base, |b| b.downcast_mut::<T>()).ok()
            }
            _ => None,
        }
    }

    /// Borrow a held value of kind `T`, reporting why it is unavailable
    fn container_mut<T: BaseValue>(&self, expected: ValueKind) -> Result<RefMut<'_, T>> {
        let kind = self.kind();
        if kind != expected {
            return Err(ValueError::NotAContainer { kind, expected });
        }
        self.downcast_mut::<T>().ok_or(ValueError::Borrowed { kind })
    }

    /// Borrow the held primitive
    pub fn as_primitive(&self) -> Option<Ref<'_, Primitive>> {
        self.downcast()
    }

    pub fn as_array(&self) -> Option<Ref<'_, Array>> {
        self.downcast()
    }

    pub fn as_array_mut(&self) -> Option<RefMut<'_, Array>> {
        self.downcast_mut()
    }

    pub fn as_object(&self) -> Option<Ref<'_, Object>> {
        self.downcast()
    }

    pub fn as_object_mut(&self) -> Option<RefMut<'_, Object>> {
        self.downcast_mut()
    }

    pub fn as_typed_array(&self) -> Option<Ref<'_, TypedArray>> {
        self.downcast()
    }

    pub fn as_typed_array_mut(&self) -> Option<RefMut<'_, TypedArray>> {
        self.downcast_mut()
    }

    pub fn as_image(&self) -> Option<Ref<'_, Image>> {
        self.downcast()
    }

    pub fn as_image_mut(&self) -> Option<RefMut<'_, Image>> {
        self.downcast_mut()
    }

    // Container access

    /// Number of slots of an array, or bytes of a typed array
    pub fn count(&self) -> Result<usize> {
        if let Some(arr) = self.as_array() {
            return Ok(arr.count());
        }
        if let Some(arr) = self.as_typed_array() {
            return Ok(arr.count());
        }
        let kind = self.kind();
        match kind {
            ValueKind::Array | ValueKind::TypedArray => Err(ValueError::Borrowed { kind }),
            _ => Err(ValueError::NotAContainer {
                kind,
                expected: ValueKind::Array,
            }),
        }
    }

    /// Array slot at `index` for in-place mutation
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn at(&self, index: usize) -> Result<RefMut<'_, Value>> {
        let arr = self.container_mut::<Array>(ValueKind::Array)?;
        Ok(RefMut::map(arr, |a| a.get(index)))
    }

    /// Object slot for `name`, materializing an undefined entry if absent
    pub fn property(&self, name: &str) -> Result<RefMut<'_, Value>> {
        let obj = self.container_mut::<Object>(ValueKind::Object)?;
        Ok(RefMut::map(obj, |o| o.get(name)))
    }

    /// Object slot for `name` without creating it
    pub fn find_property(&self, name: &str) -> Option<Ref<'_, Value>> {
        let obj = self.as_object()?;
        Ref::filter_map(obj, |o| o.find(name)).ok()
    }

    /// Snapshot of the defined property names of an object
    pub fn property_names(&self) -> Result<Vec<String>> {
        match self.as_object() {
            Some(obj) => Ok(obj.property_names()),
            None => {
                let kind = self.kind();
                Err(match kind {
                    ValueKind::Object => ValueError::Borrowed { kind },
                    _ => ValueError::NotAContainer {
                        kind,
                        expected: ValueKind::Object,
                    },
                })
            }
        }
    }

    /// Produce an independent copy of the held value
    ///
    /// Values reached twice through different paths are copied twice. A value
    /// that contains itself fails with [`ValueError::Cycle`].
    pub fn deep_copy(&self) -> Result<Value> {
        match &self.0 {
            Slot::Undefined | Slot::Null => Ok(self.clone()),
            Slot::Base(kind, cell) => {
                let Some(_visit) = Visit::enter(&DEEP_COPYING, cell) else {
                    return Err(ValueError::Cycle { kind: *kind });
                };
                let base = cell
                    .try_borrow()
                    .map_err(|_| ValueError::Borrowed { kind: *kind })?;
                base.deep_copy()
            }
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
        match self.as_primitive() {
            Some(p) => p.to_bool_with(policy),
            None => mismatch(policy, "boolean", self.kind().name(), false),
        }
    }

    pub fn to_int_with(&self, policy: MismatchPolicy) -> Result<i32> {
        match self.as_primitive() {
            Some(p) => p.to_int_with(policy),
            None => mismatch(policy, "integer", self.kind().name(), 0),
        }
    }

    pub fn to_double_with(&self, policy: MismatchPolicy) -> Result<f64> {
        match self.as_primitive() {
            Some(p) => p.to_double_with(policy),
            None => mismatch(policy, "double", self.kind().name(), 0.0),
        }
    }

    pub fn to_string_a_with(&self, policy: MismatchPolicy) -> Result<String> {
        match self.as_primitive() {
            Some(p) => p.to_string_a_with(policy),
            None => mismatch(policy, "string", self.kind().name(), String::new()),
        }
    }

    pub fn to_string_w_with(&self, policy: MismatchPolicy) -> Result<WideString> {
        match self.as_primitive() {
            Some(p) => p.to_string_w_with(policy),
            None => mismatch(policy, "string", self.kind().name(), WideString::new()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::from_base(Primitive::Bool(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::from_base(Primitive::Int(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::from_base(Primitive::Double(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::from_base(Primitive::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::from_base(Primitive::StringA(value))
    }
}

impl From<WideString> for Value {
    fn from(value: WideString) -> Self {
        Value::from_base(Primitive::StringW(value))
    }
}

impl From<Primitive> for Value {
    fn from(value: Primitive) -> Self {
        Value::from_base(value)
    }
}

impl From<Array> for Value {
    fn from(value: Array) -> Self {
        Value::from_base(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::from_base(value)
    }
}

impl From<TypedArray> for Value {
    fn from(value: TypedArray) -> Self {
        Value::from_base(value)
    }
}

impl From<Image> for Value {
    fn from(value: Image) -> Self {
        Value::from_base(value)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Slot::Undefined => write!(f, "Undefined"),
            Slot::Null => write!(f, "Null"),
            Slot::Base(kind, cell) => {
                let Some(_visit) = Visit::enter(&FORMATTING, cell) else {
                    return write!(f, "<cycle {}>", kind);
                };
                match cell.try_borrow() {
                    Ok(base) => fmt::Debug::fmt(&*base, f),
                    Err(_) => write!(f, "<borrowed {}>", kind),
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = self.as_primitive() {
            return match &*p {
                Primitive::Bool(b) => write!(f, "{}", b),
                Primitive::Int(i) => write!(f, "{}", i),
                Primitive::Double(d) => write!(f, "{}", d),
                Primitive::StringA(s) => f.write_str(s),
                Primitive::StringW(w) => f.write_str(&wide_to_narrow(w)),
            };
        }
        match self.kind() {
            ValueKind::Undefined => write!(f, "undefined"),
            ValueKind::Null => write!(f, "null"),
            kind => write!(f, "[{}]", kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ImageFormat;

    const STRICT: MismatchPolicy = MismatchPolicy::Strict;
    const PERMISSIVE: MismatchPolicy = MismatchPolicy::Permissive;

    #[test]
    fn test_undefined() {
        let v = Value::undefined();
        assert!(v.is_undefined());
        assert!(!v.is_null());
        assert!(v.is_nullish());
        assert_eq!(v.kind(), ValueKind::Undefined);
        assert!(Value::default().is_undefined());
    }

    #[test]
    fn test_null() {
        let v = Value::null();
        assert!(v.is_null());
        assert!(!v.is_undefined());
        assert!(v.is_nullish());
        assert_eq!(v.handle_count(), 0);
    }

    #[test]
    fn test_primitive_queries() {
        let b = Value::from(true);
        assert!(b.is_primitive());
        assert!(b.is_bool());
        assert!(!b.is_int());

        let i = Value::from(7);
        assert!(i.is_int());
        assert!(i.is_double());
        assert_eq!(i.to_double_with(STRICT), Ok(7.0));

        let s = Value::from("abc");
        assert!(s.is_string_a());
        assert!(!s.is_string_w());
        assert!(Value::from(vec![0x61u16]).is_string_w());
    }

    #[test]
    fn test_container_mismatch_policy() {
        let arr = Value::array(2);
        assert_eq!(
            arr.to_int_with(STRICT),
            Err(ValueError::TypeMismatch {
                expected: "integer",
                found: "array"
            })
        );
        assert_eq!(arr.to_int_with(PERMISSIVE), Ok(0));
        assert_eq!(Value::undefined().to_string_a_with(PERMISSIVE), Ok(String::new()));
        assert!(Value::null().to_bool_with(STRICT).is_err());
    }

    #[test]
    #[cfg(feature = "strict")]
    fn test_default_policy_strict() {
        assert_eq!(
            Value::array(1).to_bool(),
            Err(ValueError::TypeMismatch {
                expected: "boolean",
                found: "array"
            })
        );
        assert!(Value::from("x").to_int().is_err());
    }

    #[test]
    #[cfg(not(feature = "strict"))]
    fn test_default_policy_permissive() {
        assert_eq!(Value::array(1).to_bool(), Ok(false));
        assert_eq!(Value::from("x").to_int(), Ok(0));
    }

    #[test]
    fn test_clone_shares() {
        let obj = Value::object();
        let alias = obj.clone();
        *alias.property("k").unwrap() = Value::from(1);

        assert!(obj.ptr_eq(&alias));
        assert_eq!(obj.handle_count(), 2);
        assert_eq!(obj.property_names().unwrap(), vec!["k"]);
    }

    #[test]
    fn test_deep_copy_detaches() {
        let obj = Value::object();
        *obj.property("k").unwrap() = Value::from(1);

        let copy = obj.deep_copy().unwrap();
        *copy.property("extra").unwrap() = Value::from(2);

        assert!(!obj.ptr_eq(&copy));
        assert_eq!(obj.property_names().unwrap(), vec!["k"]);
        assert_eq!(copy.property_names().unwrap(), vec!["k", "extra"]);
    }

    #[test]
    fn test_deep_copy_rejects_cycle() {
        let obj = Value::object();
        *obj.property("self").unwrap() = obj.clone();
        assert_eq!(
            obj.deep_copy().err(),
            Some(ValueError::Cycle {
                kind: ValueKind::Object
            })
        );

        let arr = Value::array(1);
        let inner = Value::from_array(vec![arr.clone()]);
        *arr.at(0).unwrap() = inner;
        assert_eq!(
            arr.deep_copy().err(),
            Some(ValueError::Cycle {
                kind: ValueKind::Array
            })
        );

        // Break the cycles so the handles are released
        obj.as_object_mut().unwrap().remove("self");
        *arr.at(0).unwrap() = Value::undefined();
        assert!(obj.deep_copy().is_ok());
        assert!(arr.deep_copy().is_ok());
    }

    #[test]
    fn test_deep_copy_shared_child_is_not_a_cycle() {
        let child = Value::from_array(vec![Value::from(1)]);
        let parent = Value::from_array(vec![child.clone(), child.clone()]);

        let copy = parent.deep_copy().unwrap();
        let copy = copy.as_array().unwrap();
        assert!(!copy[0].ptr_eq(&child));
        assert!(!copy[0].ptr_eq(&copy[1]));
        assert_eq!(copy[1].at(0).unwrap().to_int(), Ok(1));
    }

    #[test]
    fn test_debug_cycle() {
        let obj = Value::object();
        *obj.property("self").unwrap() = obj.clone();
        let text = format!("{:?}", obj);
        assert!(text.contains("<cycle object>"), "{}", text);

        obj.as_object_mut().unwrap().remove("self");
        assert!(!format!("{:?}", obj).contains("<cycle"));
    }

    #[test]
    fn test_array_access() {
        let arr = Value::array(3);
        assert_eq!(arr.count(), Ok(3));
        *arr.at(0).unwrap() = Value::from("x");

        assert!(arr.at(0).unwrap().is_string_a());
        assert!(arr.at(1).unwrap().is_undefined());
        assert!(arr.is_array());
    }

    #[test]
    fn test_not_a_container() {
        let v = Value::from(1.5);
        assert_eq!(
            v.at(0).err(),
            Some(ValueError::NotAContainer {
                kind: ValueKind::Primitive,
                expected: ValueKind::Array
            })
        );
        assert!(v.property("a").is_err());
        assert!(v.property_names().is_err());
        assert!(v.count().is_err());
        assert!(v.find_property("a").is_none());
    }

    #[test]
    fn test_borrowed() {
        let obj = Value::object();
        let guard = obj.as_object_mut().unwrap();
        assert_eq!(obj.kind(), ValueKind::Object);
        assert_eq!(
            obj.property("a").err(),
            Some(ValueError::Borrowed {
                kind: ValueKind::Object
            })
        );
        drop(guard);
        assert!(obj.property("a").is_ok());
    }

    #[test]
    fn test_find_property() {
        let obj = Value::object();
        assert!(obj.find_property("a").is_none());
        assert!(obj.as_object().unwrap().find("a").is_none());

        assert!(obj.property("a").unwrap().is_undefined());
        assert!(obj.find_property("a").is_some());
        assert!(obj.property_names().unwrap().is_empty());
    }

    #[test]
    fn test_buffers() {
        let ta = Value::typed_array(TypedArray::from_bytes(&[1, 2]).unwrap());
        assert!(ta.is_typed_array());
        assert_eq!(ta.count(), Ok(2));
        assert_eq!(ta.as_typed_array().unwrap().as_slice(), &[1, 2]);

        let img = Value::image(Image::new(2, 2, ImageFormat::Bgra).unwrap());
        assert!(img.is_image());
        assert_eq!(img.as_image().unwrap().width(), 2);
        img.as_image_mut().unwrap().alloc(1, 1, ImageFormat::Rgba).unwrap();
        assert_eq!(img.as_image().unwrap().byte_len(), Some(4));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::undefined().to_string(), "undefined");
        assert_eq!(Value::null().to_string(), "null");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from(42).to_string(), "42");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        assert_eq!(Value::from("hi").to_string(), "hi");
        assert_eq!(Value::array(0).to_string(), "[array]");
        assert_eq!(Value::object().to_string(), "[object]");
    }

    #[test]
    fn test_debug() {
        assert_eq!(format!("{:?}", Value::undefined()), "Undefined");
        assert_eq!(format!("{:?}", Value::from(3)), "Int(3)");
    }
}
