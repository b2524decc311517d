//! Option values and their identity rules
//!
//! Scalars compare by value. Everything that lives behind an `Rc` (lists,
//! maps, registries, callbacks, component references, host handles) compares
//! by pointer identity, which is what cache invalidation and hook dedup rely on.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;

use super::object::OptionsRef;
use super::registry::Registry;
use crate::ctor::Constructor;
use crate::instance::Instance;

/// Result of running a lifecycle hook
pub type HookResult = Result<(), HookError>;

/// Data object produced by a `data` or `provide` function
pub type DataMap = BTreeMap<String, OptionValue>;

/// Error raised by a lifecycle hook
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A lifecycle callback, compared by identity.
#[derive(Clone)]
pub struct Hook {
    label: Option<Rc<str>>,
    func: Rc<dyn Fn(&mut Instance) -> HookResult>,
}

impl Hook {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&mut Instance) -> HookResult + 'static,
    {
        Self {
            label: None,
            func: Rc::new(func),
        }
    }

    /// Create a hook carrying a label used in snapshots and traces
    pub fn labeled<F>(label: impl AsRef<str>, func: F) -> Self
    where
        F: Fn(&mut Instance) -> HookResult + 'static,
    {
        Self {
            label: Some(Rc::from(label.as_ref())),
            func: Rc::new(func),
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn call(&self, vm: &mut Instance) -> HookResult {
        (self.func)(vm)
    }

    pub fn ptr_eq(&self, other: &Hook) -> bool {
        Rc::as_ptr(&self.func) as *const () == Rc::as_ptr(&other.func) as *const ()
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "Hook({})", label),
            None => write!(f, "Hook({:p})", Rc::as_ptr(&self.func) as *const ()),
        }
    }
}

/// A `data`/`provide` factory. Receives the instance when one is being built.
#[derive(Clone)]
pub struct DataFn(Rc<dyn Fn(Option<&Instance>) -> DataMap>);

impl DataFn {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(Option<&Instance>) -> DataMap + 'static,
    {
        Self(Rc::new(func))
    }

    pub fn call(&self, vm: Option<&Instance>) -> DataMap {
        (self.0)(vm)
    }

    pub fn ptr_eq(&self, other: &DataFn) -> bool {
        Rc::as_ptr(&self.0) as *const () == Rc::as_ptr(&other.0) as *const ()
    }
}

impl fmt::Debug for DataFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataFn({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// Reference to a constructor stored inside a registry.
///
/// Self-registration uses the weak form so a constructor's own options do not
/// keep it alive.
#[derive(Clone)]
pub enum ComponentRef {
    Strong(Rc<Constructor>),
    Weak(Weak<Constructor>),
}

impl ComponentRef {
    pub fn upgrade(&self) -> Option<Rc<Constructor>> {
        match self {
            ComponentRef::Strong(ctor) => Some(Rc::clone(ctor)),
            ComponentRef::Weak(weak) => weak.upgrade(),
        }
    }

    fn addr(&self) -> *const Constructor {
        match self {
            ComponentRef::Strong(ctor) => Rc::as_ptr(ctor),
            ComponentRef::Weak(weak) => weak.as_ptr(),
        }
    }

    pub fn ptr_eq(&self, other: &ComponentRef) -> bool {
        self.addr() == other.addr()
    }
}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(ctor) => write!(f, "Component(cid={})", ctor.cid()),
            None => write!(f, "Component(dropped)"),
        }
    }
}

/// A single option value
#[derive(Clone)]
pub enum OptionValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Rc<Vec<OptionValue>>),
    Map(Rc<BTreeMap<String, OptionValue>>),
    Registry(Rc<Registry>),
    Hook(Hook),
    Data(DataFn),
    Component(ComponentRef),
    Options(OptionsRef),
    /// Opaque host object (parent instance, vnode, element...)
    Handle(Rc<dyn Any>),
}

impl OptionValue {
    pub fn list(items: Vec<OptionValue>) -> Self {
        OptionValue::List(Rc::new(items))
    }

    pub fn map(entries: BTreeMap<String, OptionValue>) -> Self {
        OptionValue::Map(Rc::new(entries))
    }

    pub fn handle<T: Any>(value: T) -> Self {
        OptionValue::Handle(Rc::new(value))
    }

    /// Identity comparison (`===`)
    pub fn same(&self, other: &OptionValue) -> bool {
        use OptionValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Number(a), Number(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (List(a), List(b)) => Rc::ptr_eq(a, b),
            (Map(a), Map(b)) => Rc::ptr_eq(a, b),
            (Registry(a), Registry(b)) => Rc::ptr_eq(a, b),
            (Hook(a), Hook(b)) => a.ptr_eq(b),
            (Data(a), Data(b)) => a.ptr_eq(b),
            (Component(a), Component(b)) => a.ptr_eq(b),
            (Options(a), Options(b)) => a.ptr_eq(b),
            (Handle(a), Handle(b)) => Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const (),
            _ => false,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, OptionValue::List(_))
    }

    pub fn as_list(&self) -> Option<&[OptionValue]> {
        match self {
            OptionValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, OptionValue>> {
        match self {
            OptionValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_registry(&self) -> Option<&Rc<Registry>> {
        match self {
            OptionValue::Registry(registry) => Some(registry),
            _ => None,
        }
    }

    pub fn as_hook(&self) -> Option<&Hook> {
        match self {
            OptionValue::Hook(hook) => Some(hook),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<Rc<Constructor>> {
        match self {
            OptionValue::Component(component) => component.upgrade(),
            _ => None,
        }
    }

    pub fn as_handle<T: Any>(&self) -> Option<&T> {
        match self {
            OptionValue::Handle(handle) => handle.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Position of `needle` in a list by identity (`indexOf`)
    pub fn position_in(items: &[OptionValue], needle: &OptionValue) -> Option<usize> {
        items.iter().position(|item| item.same(needle))
    }

    /// Build a value from plain JSON data
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => OptionValue::Null,
            Value::Bool(b) => OptionValue::Bool(b),
            Value::Number(n) => OptionValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => OptionValue::Str(s),
            Value::Array(items) => {
                OptionValue::list(items.into_iter().map(OptionValue::from_json).collect())
            }
            Value::Object(entries) => OptionValue::map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, OptionValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// JSON rendering for snapshots and reports. Callables render as tags.
    pub fn describe(&self) -> Value {
        match self {
            OptionValue::Null => Value::Null,
            OptionValue::Bool(b) => Value::Bool(*b),
            OptionValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            OptionValue::Str(s) => Value::String(s.clone()),
            OptionValue::List(items) => Value::Array(items.iter().map(|v| v.describe()).collect()),
            OptionValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.describe()))
                    .collect(),
            ),
            OptionValue::Registry(registry) => registry.describe(),
            OptionValue::Hook(hook) => match hook.label() {
                Some(label) => Value::String(format!("[hook {}]", label)),
                None => Value::String("[hook]".to_string()),
            },
            OptionValue::Data(_) => Value::String("[data]".to_string()),
            OptionValue::Component(component) => match component.upgrade() {
                Some(ctor) => Value::String(match ctor.name() {
                    Some(name) => format!("[component {} cid={}]", name, ctor.cid()),
                    None => format!("[component cid={}]", ctor.cid()),
                }),
                None => Value::String("[component dropped]".to_string()),
            },
            OptionValue::Options(options) => options.borrow().describe(),
            OptionValue::Handle(_) => Value::String("[handle]".to_string()),
        }
    }
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Null => write!(f, "Null"),
            OptionValue::Bool(b) => write!(f, "Bool({})", b),
            OptionValue::Number(n) => write!(f, "Number({})", n),
            OptionValue::Str(s) => write!(f, "Str({:?})", s),
            OptionValue::List(items) => f.debug_list().entries(items.iter()).finish(),
            OptionValue::Map(entries) => f.debug_map().entries(entries.iter()).finish(),
            OptionValue::Registry(registry) => fmt::Debug::fmt(registry, f),
            OptionValue::Hook(hook) => fmt::Debug::fmt(hook, f),
            OptionValue::Data(data) => fmt::Debug::fmt(data, f),
            OptionValue::Component(component) => fmt::Debug::fmt(component, f),
            OptionValue::Options(options) => fmt::Debug::fmt(options, f),
            OptionValue::Handle(handle) => write!(f, "Handle({:p})", Rc::as_ptr(handle) as *const ()),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Number(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Number(f64::from(value))
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

impl From<Hook> for OptionValue {
    fn from(value: Hook) -> Self {
        OptionValue::Hook(value)
    }
}

impl From<DataFn> for OptionValue {
    fn from(value: DataFn) -> Self {
        OptionValue::Data(value)
    }
}

impl From<Vec<OptionValue>> for OptionValue {
    fn from(value: Vec<OptionValue>) -> Self {
        OptionValue::list(value)
    }
}

impl From<Rc<Constructor>> for OptionValue {
    fn from(value: Rc<Constructor>) -> Self {
        OptionValue::Component(ComponentRef::Strong(value))
    }
}

impl From<OptionsRef> for OptionValue {
    fn from(value: OptionsRef) -> Self {
        OptionValue::Options(value)
    }
}
