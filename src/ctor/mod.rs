//! Component constructors
//!
//! A `Constructor` is a declared component class. It caches its effective
//! options and remembers what it was declared with so the resolver can rebuild
//! the cache when an ancestor's options change:
//! - `options`: current merged options (cached, may be patched in place)
//! - `super_options`: the ancestor options `options` was last merged from
//! - `extend_options`: the options passed at declaration
//! - `sealed_options`: shallow copy of `options` taken right after declaration
//!
//! Constructors are single-threaded (`Rc`/`RefCell`). Mutating a constructor
//! while one of its instances is being constructed is the caller's problem.

mod resolve;

pub use resolve::{resolve_constructor_options, resolve_modified_options};

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::naming::validate_component_name;
use crate::options::{
    merge_options, ComponentRef, Hook, OptionValue, Options, OptionsRef, Registry,
    StrategyTable, ASSET_TYPES,
};

/// Constructor ids; 0 is reserved for root constructors
static CID_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_cid() -> u64 {
    CID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Kinds of registrable assets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Component,
    Directive,
    Filter,
}

impl AssetKind {
    /// Option field holding the registry
    pub fn field(&self) -> &'static str {
        match self {
            AssetKind::Component => ASSET_TYPES[0],
            AssetKind::Directive => ASSET_TYPES[1],
            AssetKind::Filter => ASSET_TYPES[2],
        }
    }
}

pub struct Constructor {
    cid: u64,
    parent: Option<Weak<Constructor>>,
    options: RefCell<OptionsRef>,
    super_options: RefCell<Option<OptionsRef>>,
    extend_options: OptionsRef,
    sealed_options: Options,
}

impl Constructor {
    /// Create a base constructor with empty asset registries plus `options`.
    pub fn root(options: Options, strategies: &StrategyTable) -> Rc<Self> {
        let mut base = Options::new();
        for asset in ASSET_TYPES {
            base.set(*asset, OptionValue::Registry(Registry::new()));
        }
        let merged = merge_options(&base, &options, None, strategies);
        let sealed = merged.clone();

        Rc::new(Self {
            cid: 0,
            parent: None,
            options: RefCell::new(merged.into_shared()),
            super_options: RefCell::new(None),
            extend_options: options.into_shared(),
            sealed_options: sealed,
        })
    }

    /// Declare a subclass of `self`.
    ///
    /// A named subclass (its own `name`, or the parent's) registers itself in
    /// its own `components` registry so it can refer to itself recursively.
    pub fn extend(self: &Rc<Self>, extend_options: Options, strategies: &StrategyTable) -> Rc<Constructor> {
        let super_options = self.options();
        let name = extend_options
            .name()
            .or(super_options.borrow().name())
            .map(str::to_string);
        if let Some(name) = &name {
            if let Err(err) = validate_component_name(name) {
                warn!(component = %name, "{}", err);
            }
        }

        let mut merged = merge_options(&super_options.borrow(), &extend_options, None, strategies);
        let cid = next_cid();

        let ctor = Rc::new_cyclic(|weak: &Weak<Constructor>| {
            if let Some(name) = &name {
                register_component(&mut merged, name, ComponentRef::Weak(weak.clone()));
            }
            let sealed = merged.clone();
            Self {
                cid,
                parent: Some(Rc::downgrade(self)),
                options: RefCell::new(merged.into_shared()),
                super_options: RefCell::new(Some(super_options)),
                extend_options: extend_options.into_shared(),
                sealed_options: sealed,
            }
        });
        debug!(cid, parent = self.cid, name = ?name, "declared constructor");
        ctor
    }

    /// Merge `mixin` into this constructor's options.
    ///
    /// The options get a new identity, so descendants re-merge on their next
    /// resolution.
    pub fn mixin(&self, mixin: Options, strategies: &StrategyTable) {
        let merged = merge_options(&self.options().borrow(), &mixin, None, strategies);
        *self.options.borrow_mut() = merged.into_shared();
        debug!(cid = self.cid, "applied mixin");
    }

    /// Register an asset in place in the current registry
    pub fn register_asset(&self, kind: AssetKind, name: &str, definition: OptionValue) {
        if kind == AssetKind::Component {
            if let Err(err) = validate_component_name(name) {
                warn!(component = %name, "{}", err);
            }
        }
        let definition = match (kind, definition) {
            (AssetKind::Directive, OptionValue::Hook(hook)) => directive_from_hook(hook),
            (_, definition) => definition,
        };

        let options = self.options();
        let registry = options
            .get(kind.field())
            .and_then(|value| value.as_registry().cloned());
        match registry {
            Some(registry) => {
                registry.insert(name, definition);
            }
            None => {
                let registry = Registry::new();
                registry.insert(name, definition);
                options.set(kind.field(), OptionValue::Registry(registry));
            }
        }
    }

    /// Register a global component constructor
    pub fn component(&self, name: &str, ctor: Rc<Constructor>) {
        self.register_asset(AssetKind::Component, name, OptionValue::Component(ComponentRef::Strong(ctor)));
    }

    /// Declare a component from options on the root constructor and register it here
    pub fn define_component(
        self: &Rc<Self>,
        name: &str,
        mut options: Options,
        strategies: &StrategyTable,
    ) -> Rc<Constructor> {
        if options.name().is_none() {
            options.set("name", name);
        }
        let ctor = self.base_constructor().extend(options, strategies);
        self.component(name, Rc::clone(&ctor));
        ctor
    }

    pub fn directive(&self, name: &str, definition: impl Into<OptionValue>) {
        self.register_asset(AssetKind::Directive, name, definition.into());
    }

    pub fn filter(&self, name: &str, filter: Hook) {
        self.register_asset(AssetKind::Filter, name, OptionValue::Hook(filter));
    }

    /// Set a field on the cached options in place, after declaration
    pub fn patch_option(&self, key: &str, value: impl Into<OptionValue>) {
        self.options().set(key, value);
    }

    pub fn cid(&self) -> u64 {
        self.cid
    }

    pub fn name(&self) -> Option<String> {
        self.options().borrow().name().map(str::to_string)
    }

    pub fn options(&self) -> OptionsRef {
        self.options.borrow().clone()
    }

    pub fn super_options(&self) -> Option<OptionsRef> {
        self.super_options.borrow().clone()
    }

    pub fn extend_options(&self) -> OptionsRef {
        self.extend_options.clone()
    }

    pub fn sealed_options(&self) -> &Options {
        &self.sealed_options
    }

    /// The constructor this one was declared from, if it is still alive
    pub fn parent(&self) -> Option<Rc<Constructor>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Topmost live ancestor
    pub fn base_constructor(self: &Rc<Self>) -> Rc<Constructor> {
        let mut current = Rc::clone(self);
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("cid", &self.cid)
            .field("name", &self.name())
            .field("root", &self.is_root())
            .finish()
    }
}

/// Put `component` in the `components` registry of `options` under `name`
fn register_component(options: &mut Options, name: &str, component: ComponentRef) {
    let value = OptionValue::Component(component);
    match options.get("components").and_then(|v| v.as_registry().cloned()) {
        Some(registry) => {
            registry.insert(name, value);
        }
        None => {
            let registry = Registry::new();
            registry.insert(name, value);
            options.set("components", OptionValue::Registry(registry));
        }
    }
}

fn directive_from_hook(hook: Hook) -> OptionValue {
    OptionValue::map(
        [
            ("bind".to_string(), OptionValue::Hook(hook.clone())),
            ("update".to_string(), OptionValue::Hook(hook)),
        ]
        .into_iter()
        .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hook() -> OptionValue {
        OptionValue::Hook(Hook::new(|_| Ok(())))
    }

    #[test]
    fn test_root_has_asset_registries() {
        let root = Constructor::root(Options::new(), &StrategyTable::default());
        let options = root.options();
        for asset in ASSET_TYPES {
            assert!(options.get(asset).unwrap().as_registry().is_some());
        }
        assert!(root.is_root());
        assert_eq!(root.cid(), 0);
    }

    #[test]
    fn test_extend_records_declaration_state() {
        let strategies = StrategyTable::default();
        let root = Constructor::root(Options::new(), &strategies);
        let created = hook();
        let sub = root.extend(Options::new().with("created", created.clone()), &strategies);

        assert!(sub.super_options().unwrap().ptr_eq(&root.options()));
        assert!(sub.extend_options().get("created").unwrap().same(&created));
        assert!(sub.parent().is_some());
        assert!(sub.cid() > 0);

        let options = sub.options();
        for (key, value) in sub.sealed_options().iter() {
            assert!(options.get(key).unwrap().same(value), "sealed {} differs", key);
        }
    }

    #[test]
    fn test_named_constructor_registers_itself() {
        let strategies = StrategyTable::default();
        let root = Constructor::root(Options::new(), &strategies);
        let tree = root.extend(Options::new().with("name", "tree-node"), &strategies);

        let components = tree.options().get("components").unwrap();
        let found = components.as_registry().unwrap().get("tree-node").unwrap();
        let found = found.as_component().unwrap();
        assert!(Rc::ptr_eq(&found, &tree));
        assert!(root.options().get("components").unwrap().as_registry().unwrap().get("tree-node").is_none());
    }

    #[test]
    fn test_self_registration_does_not_leak() {
        let strategies = StrategyTable::default();
        let root = Constructor::root(Options::new(), &strategies);
        let sub = root.extend(Options::new().with("name", "leaf"), &strategies);
        let weak = Rc::downgrade(&sub);
        drop(sub);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_name_inherited_from_parent() {
        let strategies = StrategyTable::default();
        let root = Constructor::root(Options::new(), &strategies);
        let named = root.extend(Options::new().with("name", "base-list"), &strategies);
        let sub = named.extend(Options::new(), &strategies);
        assert_eq!(sub.name().as_deref(), Some("base-list"));
        let registry = sub.options().get("components").unwrap();
        let entry = registry.as_registry().unwrap().get("base-list").unwrap();
        assert!(Rc::ptr_eq(&entry.as_component().unwrap(), &sub));
    }

    #[test]
    fn test_mixin_replaces_options_identity() {
        let strategies = StrategyTable::default();
        let root = Constructor::root(Options::new(), &strategies);
        let before = root.options();
        root.mixin(Options::new().with("created", hook()), &strategies);
        assert!(!before.ptr_eq(&root.options()));
        assert_eq!(root.options().get("created").unwrap().as_list().unwrap().len(), 1);
    }

    #[test]
    fn test_global_asset_visible_to_existing_subclass() {
        let strategies = StrategyTable::default();
        let root = Constructor::root(Options::new(), &strategies);
        let sub = root.extend(Options::new(), &strategies);
        let before = root.options();

        let button = root.define_component("AppButton", Options::new(), &strategies);
        root.filter("upper", Hook::new(|_| Ok(())));

        assert!(before.ptr_eq(&root.options()));
        let components = sub.options().get("components").unwrap();
        let found = components.as_registry().unwrap().resolve_asset("app-button").unwrap();
        assert!(Rc::ptr_eq(&found.as_component().unwrap(), &button));
        assert!(sub.options().get("filters").unwrap().as_registry().unwrap().get("upper").is_some());
    }

    #[test]
    fn test_function_directive_registration() {
        let strategies = StrategyTable::default();
        let root = Constructor::root(Options::new(), &strategies);
        let focus = Hook::new(|_| Ok(()));
        root.directive("focus", focus.clone());

        let directives = root.options().get("directives").unwrap();
        let def = directives.as_registry().unwrap().get("focus").unwrap();
        assert!(def.as_map().unwrap()["bind"].same(&OptionValue::Hook(focus)));
    }

    #[test]
    fn test_patch_option_keeps_identity() {
        let strategies = StrategyTable::default();
        let root = Constructor::root(Options::new(), &strategies);
        let sub = root.extend(Options::new(), &strategies);
        let before = sub.options();
        sub.patch_option("template", "<div/>");
        assert!(before.ptr_eq(&sub.options()));
        assert_eq!(sub.options().get("template").unwrap().as_str(), Some("<div/>"));
    }
}
