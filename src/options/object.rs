//! Configuration objects
//!
//! `Options` is a plain field map. `OptionsRef` is the shared, mutable handle
//! constructors cache; its pointer identity is the cache key the resolver uses.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::value::OptionValue;

/// Mapping from option name to option value
#[derive(Clone, Default)]
pub struct Options {
    fields: BTreeMap<String, OptionValue>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Option<OptionValue> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        self.fields.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, OptionValue> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy every field of `other` onto `self`, overwriting (`extend(to, from)`)
    pub fn extend_from(&mut self, other: &Options) {
        for (key, value) in other.iter() {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// The declared component name, if any
    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(OptionValue::as_str)
    }

    pub fn into_shared(self) -> OptionsRef {
        OptionsRef::new(self)
    }

    pub fn describe(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.describe()))
                .collect(),
        )
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.fields.iter()).finish()
    }
}

impl FromIterator<(String, OptionValue)> for Options {
    fn from_iter<I: IntoIterator<Item = (String, OptionValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Options {
    type Item = (&'a String, &'a OptionValue);
    type IntoIter = btree_map::Iter<'a, String, OptionValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Shared handle to a configuration object, compared by identity.
#[derive(Clone, Default)]
pub struct OptionsRef(Rc<RefCell<Options>>);

impl OptionsRef {
    pub fn new(options: Options) -> Self {
        Self(Rc::new(RefCell::new(options)))
    }

    pub fn ptr_eq(&self, other: &OptionsRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn borrow(&self) -> Ref<'_, Options> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Options> {
        self.0.borrow_mut()
    }

    pub fn get(&self, key: &str) -> Option<OptionValue> {
        self.0.borrow().get(key).cloned()
    }

    /// Set a field in place; the handle keeps its identity
    pub fn set(&self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.0.borrow_mut().set(key, value);
    }

    /// Shallow copy of the current fields
    pub fn snapshot(&self) -> Options {
        self.0.borrow().clone()
    }
}

impl fmt::Debug for OptionsRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OptionsRef({:p}) ", Rc::as_ptr(&self.0))?;
        match self.0.try_borrow() {
            Ok(options) => fmt::Debug::fmt(&*options, f),
            Err(_) => write!(f, "<borrowed>"),
        }
    }
}
