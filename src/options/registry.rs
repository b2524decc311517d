//! Asset registries (`components`, `directives`, `filters`)
//!
//! A registry owns its own entries and falls back to its parent's registry on
//! lookup, so a subclass sees every asset registered on its ancestors.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::value::OptionValue;
use crate::naming::{camelize, capitalize};

#[derive(Default)]
pub struct Registry {
    own: RefCell<BTreeMap<String, OptionValue>>,
    fallback: Option<Rc<Registry>>,
}

impl Registry {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn with_fallback(fallback: Option<Rc<Registry>>) -> Rc<Self> {
        Rc::new(Self {
            own: RefCell::new(BTreeMap::new()),
            fallback,
        })
    }

    pub fn fallback(&self) -> Option<&Rc<Registry>> {
        self.fallback.as_ref()
    }

    /// Register an entry in place
    pub fn insert(&self, name: impl Into<String>, value: OptionValue) -> Option<OptionValue> {
        self.own.borrow_mut().insert(name.into(), value)
    }

    pub fn contains_own(&self, name: &str) -> bool {
        self.own.borrow().contains_key(name)
    }

    /// Exact-name lookup along the fallback chain
    pub fn get(&self, name: &str) -> Option<OptionValue> {
        if let Some(value) = self.own.borrow().get(name) {
            return Some(value.clone());
        }
        self.fallback.as_ref().and_then(|parent| parent.get(name))
    }

    /// Lookup by id, then camelCase id, then PascalCase id
    pub fn resolve_asset(&self, id: &str) -> Option<OptionValue> {
        if let Some(value) = self.get(id) {
            return Some(value);
        }
        let camelized = camelize(id);
        if let Some(value) = self.get(&camelized) {
            return Some(value);
        }
        self.get(&capitalize(&camelized))
    }

    pub fn own_names(&self) -> Vec<String> {
        self.own.borrow().keys().cloned().collect()
    }

    /// Every visible entry, own entries shadowing inherited ones
    pub fn entries(&self) -> BTreeMap<String, OptionValue> {
        let mut entries = match &self.fallback {
            Some(parent) => parent.entries(),
            None => BTreeMap::new(),
        };
        for (name, value) in self.own.borrow().iter() {
            entries.insert(name.clone(), value.clone());
        }
        entries
    }

    pub fn describe(&self) -> Value {
        Value::Object(
            self.entries()
                .into_iter()
                .map(|(k, v)| (k, v.describe()))
                .collect(),
        )
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("own", &self.own_names())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
