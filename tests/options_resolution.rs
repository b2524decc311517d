//! Constructor Options Resolution Tests
//!
//! Cache identity across resolutions, invalidation by ancestor mixins,
//! late-patched fields surviving a re-merge, and the merge strategies seen
//! through declared constructors.

use component_runtime::options::{DataFn, DataMap, MergeStrategy};
use component_runtime::{
    dedupe, resolve_constructor_options, resolve_modified_options, Hook, OptionValue, Options, Runtime,
    StrategyTable,
};
use std::rc::Rc;

fn hook() -> OptionValue {
    OptionValue::Hook(Hook::new(|_| Ok(())))
}

fn assert_same_list(actual: &OptionValue, expected: &[&OptionValue]) {
    let items = actual.as_list().expect("list value");
    assert_eq!(items.len(), expected.len(), "list length");
    for (i, (got, want)) in items.iter().zip(expected).enumerate() {
        assert!(got.same(want), "entry {i} differs");
    }
}

// =============================================================================
// Cache identity
// =============================================================================

#[test]
fn test_resolution_is_idempotent() {
    let runtime = Runtime::default();
    let base = runtime.declare(Options::new().with("name", "base"));
    let sub = runtime.extend(&base, Options::new().with("template", "<p/>"));

    let first = runtime.resolve(&sub);
    let second = runtime.resolve(&sub);
    assert!(first.ptr_eq(&second));
    assert!(first.ptr_eq(&sub.options()));
}

#[test]
fn test_ancestor_mixin_invalidates_then_caches() {
    let runtime = Runtime::default();
    let base = runtime.declare(Options::new());
    let sub = runtime.extend(&base, Options::new());
    let before = runtime.resolve(&sub);

    let mixed = hook();
    runtime.mixin(&base, Options::new().with("mounted", mixed.clone()));

    let after = runtime.resolve(&sub);
    assert!(!after.ptr_eq(&before));
    assert_same_list(&after.get("mounted").unwrap(), &[&mixed]);
    assert!(runtime.resolve(&sub).ptr_eq(&after));
}

#[test]
fn test_root_mixin_reaches_deep_descendant() {
    let runtime = Runtime::default();
    let a = runtime.declare(Options::new());
    let b = runtime.extend(&a, Options::new());
    let c = runtime.extend(&b, Options::new());

    let global = hook();
    runtime.mixin(runtime.root(), Options::new().with("created", global.clone()));

    let resolved = resolve_constructor_options(&c, runtime.strategies());
    assert_same_list(&resolved.get("created").unwrap(), &[&global]);
    assert!(b.super_options().unwrap().ptr_eq(&a.options()));
}

// =============================================================================
// Late modification
// =============================================================================

#[test]
fn test_late_hook_present_once_after_remerge() {
    let runtime = Runtime::default();
    let (declared, late, mixed) = (hook(), hook(), hook());
    let base = runtime.declare(Options::new());
    let sub = runtime.extend(&base, Options::new().with("created", declared.clone()));

    let mut created = sub.options().get("created").unwrap().as_list().unwrap().to_vec();
    created.push(late.clone());
    sub.patch_option("created", OptionValue::list(created));

    runtime.mixin(&base, Options::new().with("created", mixed.clone()));
    let resolved = runtime.resolve(&sub);

    assert_same_list(&resolved.get("created").unwrap(), &[&mixed, &declared, &late]);
    assert!(resolve_modified_options(&sub).is_some());
}

#[test]
fn test_patched_scalar_carried_forward() {
    let runtime = Runtime::default();
    let base = runtime.declare(Options::new());
    let sub = runtime.extend(&base, Options::new().with("template", "<old/>"));
    sub.patch_option("template", "<new/>");

    runtime.mixin(&base, Options::new().with("inheritAttrs", false));
    let resolved = runtime.resolve(&sub);
    assert_eq!(resolved.get("template").unwrap().as_str(), Some("<new/>"));
    assert!(resolved.get("inheritAttrs").unwrap().same(&OptionValue::Bool(false)));
}

#[test]
fn test_dedupe_examples() {
    let (a, b, c, d) = (hook(), hook(), hook(), hook());

    let latest = OptionValue::list(vec![a.clone(), b.clone(), c.clone()]);
    let sealed = OptionValue::list(vec![a.clone(), b.clone()]);
    let extended = OptionValue::list(vec![b.clone()]);
    assert_same_list(&dedupe(&latest, Some(&extended), Some(&sealed)), &[&b, &c]);

    let latest = OptionValue::list(vec![a.clone(), d.clone()]);
    let sealed = OptionValue::list(vec![a.clone()]);
    assert_same_list(&dedupe(&latest, None, Some(&sealed)), &[&d]);

    let single = hook();
    assert!(dedupe(&single, None, None).same(&single));
}

// =============================================================================
// Registries
// =============================================================================

#[test]
fn test_named_constructor_registers_itself() {
    let runtime = Runtime::default();
    let tree = runtime.declare(Options::new().with("name", "tree-node"));

    let registry = runtime.resolve(&tree).get("components").unwrap();
    let found = registry.as_registry().unwrap().resolve_asset("tree-node").unwrap();
    assert!(Rc::ptr_eq(&found.as_component().unwrap(), &tree));
}

#[test]
fn test_global_component_visible_to_existing_subclass() {
    let runtime = Runtime::default();
    let sub = runtime.declare(Options::new());
    let button = runtime
        .root()
        .define_component("AppButton", Options::new(), runtime.strategies());

    let registry = runtime.resolve(&sub).get("components").unwrap();
    let found = registry.as_registry().unwrap().resolve_asset("app-button").unwrap();
    assert!(Rc::ptr_eq(&found.as_component().unwrap(), &button));
    assert!(!registry.as_registry().unwrap().contains_own("AppButton"));
}

// =============================================================================
// Strategies
// =============================================================================

#[test]
fn test_data_composition_child_wins() {
    let runtime = Runtime::default();
    let parent_data = DataFn::new(|_| {
        let mut map = DataMap::new();
        map.insert("title".to_string(), "parent".into());
        map.insert("count".to_string(), 1.into());
        map
    });
    let child_data = DataFn::new(|_| {
        let mut map = DataMap::new();
        map.insert("title".to_string(), "child".into());
        map
    });
    let base = runtime.declare(Options::new().with("data", parent_data));
    let sub = runtime.extend(&base, Options::new().with("data", child_data));

    let data = runtime.resolve(&sub).get("data").unwrap();
    let OptionValue::Data(factory) = data else {
        panic!("data should stay a factory");
    };
    let values = factory.call(None);
    assert_eq!(values.get("title").unwrap().as_str(), Some("child"));
    assert!(values.get("count").unwrap().same(&OptionValue::from(1)));
}

#[test]
fn test_methods_extend_child_wins() {
    let runtime = Runtime::default();
    let (save, load, save_override) = (hook(), hook(), hook());
    let methods = |entries: Vec<(&str, OptionValue)>| {
        OptionValue::map(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    };
    let base = runtime.declare(
        Options::new().with("methods", methods(vec![("save", save.clone()), ("load", load.clone())])),
    );
    let sub = runtime.extend(&base, Options::new().with("methods", methods(vec![("save", save_override.clone())])));

    let merged = runtime.resolve(&sub).get("methods").unwrap();
    let merged = merged.as_map().unwrap();
    assert!(merged["save"].same(&save_override));
    assert!(merged["load"].same(&load));
}

#[test]
fn test_custom_merge_strategy() {
    let mut strategies = StrategyTable::default();
    strategies.register_custom("tags", |parent, child, _| match (parent, child) {
        (Some(OptionValue::Str(p)), Some(OptionValue::Str(c))) => Some(OptionValue::Str(format!("{p} {c}"))),
        (p, c) => c.or(p).cloned(),
    });
    let runtime = Runtime::default().with_strategies(strategies);

    let base = runtime.declare(Options::new().with("tags", "card"));
    let sub = runtime.extend(&base, Options::new().with("tags", "primary"));
    assert_eq!(runtime.resolve(&sub).get("tags").unwrap().as_str(), Some("card primary"));
    assert!(matches!(runtime.strategies().get("tags"), MergeStrategy::Custom(_)));
}
