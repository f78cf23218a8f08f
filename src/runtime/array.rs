//! Array container
//!
//! Arrays hold a fixed number of value handles. The length is set at
//! construction and never changes afterwards.

use std::any::Any;
use std::ops::{Index, IndexMut};

use crate::error::Result;
use crate::runtime::base::{BaseValue, ValueKind};
use crate::value::Value;

/// Fixed-length sequence of value handles
#[derive(Debug, Default)]
pub struct Array {
    /// Element storage
    elements: Vec<Value>,
}

impl Array {
    /// Create an array with `count` undefined slots
    pub fn with_count(count: usize) -> Self {
        let mut elements = Vec::with_capacity(count);
        elements.resize_with(count, Value::undefined);
        Array { elements }
    }

    /// Create an array from an ordered list of handles
    pub fn from_values(values: Vec<Value>) -> Self {
        Array { elements: values }
    }

    /// Get the number of slots
    #[inline]
    pub fn count(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Get the slot at `index` for in-place mutation
    ///
    /// # Panics
    /// Panics if `index >= self.count()`.
    #[inline]
    pub fn get(&mut self, index: usize) -> &mut Value {
        &mut self.elements[index]
    }

    /// Get the slot at `index`, returns None if out of range
    #[inline]
    pub fn try_get(&self, index: usize) -> Option<&Value> {
        self.elements.get(index)
    }

    #[inline]
    pub fn try_get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.elements.get_mut(index)
    }

    /// Get an iterator over the slots
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.elements.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Value> {
        self.elements.iter_mut()
    }
}

impl From<Vec<Value>> for Array {
    fn from(values: Vec<Value>) -> Self {
        Array::from_values(values)
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Array::from_values(iter.into_iter().collect())
    }
}

impl Index<usize> for Array {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.elements[index]
    }
}

impl IndexMut<usize> for Array {
    fn index_mut(&mut self, index: usize) -> &mut Value {
        &mut self.elements[index]
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl BaseValue for Array {
    fn kind(&self) -> ValueKind {
        ValueKind::Array
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn deep_copy(&self) -> Result<Value> {
        let elements = self
            .elements
            .iter()
            .map(Value::deep_copy)
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::from_base(Array { elements }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_count() {
        let arr = Array::with_count(5);
        assert_eq!(arr.count(), 5);
        assert!(arr.iter().all(Value::is_undefined));
    }

    #[test]
    fn test_empty() {
        let arr = Array::with_count(0);
        assert!(arr.is_empty());
        assert!(arr.try_get(0).is_none());
    }

    #[test]
    fn test_from_values() {
        let arr = Array::from_values(vec![Value::from(1), Value::from("two"), Value::null()]);
        assert_eq!(arr.count(), 3);
        assert_eq!(arr[0].to_int(), Ok(1));
        assert!(arr[1].is_string_a());
        assert!(arr[2].is_null());
    }

    #[test]
    fn test_get_mutates_in_place() {
        let mut arr = Array::with_count(2);
        *arr.get(1) = Value::from(true);

        assert!(arr[0].is_undefined());
        assert_eq!(arr[1].to_bool(), Ok(true));
        assert_eq!(arr.count(), 2);
    }

    #[test]
    #[should_panic]
    fn test_get_out_of_range() {
        let mut arr = Array::with_count(1);
        arr.get(1);
    }

    #[test]
    fn test_collect() {
        let arr: Array = (0..4i32).map(Value::from).collect();
        assert_eq!(arr.count(), 4);
        assert_eq!(arr.try_get(3).map(|v| v.to_int()), Some(Ok(3)));
    }

    #[test]
    fn test_deep_copy_detaches() {
        let inner = Value::from_array(vec![Value::from(1)]);
        let arr = Array::from_values(vec![inner.clone()]);

        let copy = arr.deep_copy().unwrap();
        let copy = copy.as_array().unwrap();
        assert!(!copy[0].ptr_eq(&inner));
        assert!(arr[0].ptr_eq(&inner));
    }
}
