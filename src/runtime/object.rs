//! Object container
//!
//! Objects map string keys to value handles and keep insertion order for
//! enumeration. Reading a missing key through [`Object::get`] materializes an
//! undefined entry; [`Object::find`] is the side-effect free lookup.

use std::any::Any;

use indexmap::IndexMap;

use crate::error::Result;
use crate::runtime::base::{BaseValue, ValueKind};
use crate::value::Value;

/// String-keyed, insertion-ordered mapping of value handles
#[derive(Debug, Default)]
pub struct Object {
    properties: IndexMap<String, Value>,
}

impl Object {
    /// Create an empty object
    pub fn new() -> Self {
        Object {
            properties: IndexMap::new(),
        }
    }

    /// Get the slot for `name`, inserting an undefined entry if absent
    pub fn get(&mut self, name: &str) -> &mut Value {
        if !self.properties.contains_key(name) {
            log::trace!("object: materializing property {:?}", name);
        }
        self.properties.entry(name.to_owned()).or_default()
    }

    /// Alias of [`Object::get`] that names the side effect
    #[inline]
    pub fn get_or_create(&mut self, name: &str) -> &mut Value {
        self.get(name)
    }

    /// Look up `name` without creating it
    #[inline]
    pub fn find(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    #[inline]
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.properties.get_mut(name)
    }

    /// Assign `value` to `name`, returning the previous handle
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.properties.insert(name.into(), value)
    }

    /// Check if `name` exists in storage, even as undefined
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Remove `name`, keeping the order of the remaining keys
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.properties.shift_remove(name)
    }

    /// Snapshot of the keys whose handle is not undefined, in insertion order
    pub fn property_names(&self) -> Vec<String> {
        self.properties
            .iter()
            .filter(|(_, value)| !value.is_undefined())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Iterate over defined properties in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.properties
            .iter()
            .filter(|(_, value)| !value.is_undefined())
            .map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Object {
            properties: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl BaseValue for Object {
    fn kind(&self) -> ValueKind {
        ValueKind::Object
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn deep_copy(&self) -> Result<Value> {
        let mut properties = IndexMap::with_capacity(self.properties.len());
        for (name, value) in &self.properties {
            properties.insert(name.clone(), value.deep_copy()?);
        }
        Ok(Value::from_base(Object { properties }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_materializes_undefined() {
        let mut obj = Object::new();
        assert!(obj.get("missing").is_undefined());
        assert!(obj.contains("missing"));
        assert!(obj.property_names().is_empty());
    }

    #[test]
    fn test_find_does_not_create() {
        let mut obj = Object::new();
        assert!(obj.find("missing").is_none());
        assert!(obj.find_mut("missing").is_none());
        assert!(!obj.contains("missing"));
    }

    #[test]
    fn test_property_names_skip_undefined() {
        let mut obj = Object::new();
        *obj.get("a") = Value::undefined();
        *obj.get("b") = Value::from(42);

        assert_eq!(obj.property_names(), vec!["b".to_string()]);
        assert!(obj.contains("a"));
    }

    #[test]
    fn test_insertion_order() {
        let mut obj = Object::new();
        obj.set("z", Value::from(1));
        obj.set("a", Value::from(2));
        obj.set("m", Value::null());

        assert_eq!(obj.property_names(), vec!["z", "a", "m"]);

        // Reassigning keeps the original position
        obj.set("z", Value::from(3));
        assert_eq!(obj.property_names(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_explicit_undefined_hidden() {
        let mut obj = Object::new();
        obj.set("x", Value::from(1));
        *obj.get("x") = Value::undefined();
        assert!(obj.property_names().is_empty());
        assert!(obj.contains("x"));
    }

    #[test]
    fn test_names_are_snapshot() {
        let mut obj = Object::new();
        obj.set("a", Value::from(1));
        let names = obj.property_names();

        obj.set("b", Value::from(2));
        obj.remove("a");
        assert_eq!(names, vec!["a"]);
        assert_eq!(obj.property_names(), vec!["b"]);
    }

    #[test]
    fn test_from_iter_and_iter() {
        let obj: Object = [("k", Value::from("v")), ("u", Value::undefined())]
            .into_iter()
            .collect();
        let entries: Vec<_> = obj.iter().map(|(k, v)| (k, v.to_string_a())).collect();
        assert_eq!(entries, vec![("k", Ok("v".to_string()))]);
    }
}
