//! Field-name → merge-strategy dispatch table

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use super::registry::Registry;
use super::value::{DataFn, DataMap, OptionValue};
use crate::instance::Uid;

/// Lifecycle hook names; merged by concatenation
pub const LIFECYCLE_HOOKS: &[&str] = &[
    "beforeCreate",
    "created",
    "beforeMount",
    "mounted",
    "beforeUpdate",
    "updated",
    "beforeDestroy",
    "destroyed",
    "activated",
    "deactivated",
    "errorCaptured",
];

/// Asset registry names; merged as fallback registries
pub const ASSET_TYPES: &[&str] = &["components", "directives", "filters"];

/// Context passed when merging for a specific instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeContext {
    pub uid: Uid,
}

/// User merge function: `(parent, child, context) -> merged`
pub type CustomMerge =
    Rc<dyn Fn(Option<&OptionValue>, Option<&OptionValue>, Option<&MergeContext>) -> Option<OptionValue>>;

#[derive(Clone)]
pub enum MergeStrategy {
    /// Child wins when present
    Override,
    /// `parent ++ child`, scalars wrapped into lists
    Concatenate,
    /// Fresh registry falling back to the parent's
    Registry,
    /// Shallow map merge, child keys win
    Extend,
    /// Per-key concatenation of watcher lists
    Watch,
    /// Composition of `data`/`provide` factories
    DataFn,
    Custom(CustomMerge),
}

impl fmt::Debug for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeStrategy::Override => write!(f, "Override"),
            MergeStrategy::Concatenate => write!(f, "Concatenate"),
            MergeStrategy::Registry => write!(f, "Registry"),
            MergeStrategy::Extend => write!(f, "Extend"),
            MergeStrategy::Watch => write!(f, "Watch"),
            MergeStrategy::DataFn => write!(f, "DataFn"),
            MergeStrategy::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Merge strategy per option field, with `Override` as the fallback
#[derive(Debug, Clone)]
pub struct StrategyTable {
    entries: HashMap<String, MergeStrategy>,
    fallback: MergeStrategy,
}

impl Default for StrategyTable {
    fn default() -> Self {
        let mut entries = HashMap::new();
        for hook in LIFECYCLE_HOOKS {
            entries.insert(hook.to_string(), MergeStrategy::Concatenate);
        }
        for asset in ASSET_TYPES {
            entries.insert(asset.to_string(), MergeStrategy::Registry);
        }
        for key in ["props", "methods", "inject", "computed"] {
            entries.insert(key.to_string(), MergeStrategy::Extend);
        }
        entries.insert("watch".to_string(), MergeStrategy::Watch);
        entries.insert("data".to_string(), MergeStrategy::DataFn);
        entries.insert("provide".to_string(), MergeStrategy::DataFn);

        Self {
            entries,
            fallback: MergeStrategy::Override,
        }
    }
}

impl StrategyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the strategy for a field
    pub fn register(&mut self, key: impl Into<String>, strategy: MergeStrategy) {
        self.entries.insert(key.into(), strategy);
    }

    /// Register a custom merge function for a field
    pub fn register_custom<F>(&mut self, key: impl Into<String>, merge: F)
    where
        F: Fn(Option<&OptionValue>, Option<&OptionValue>, Option<&MergeContext>) -> Option<OptionValue>
            + 'static,
    {
        self.register(key, MergeStrategy::Custom(Rc::new(merge)));
    }

    pub fn get(&self, key: &str) -> &MergeStrategy {
        self.entries.get(key).unwrap_or(&self.fallback)
    }

    /// Merge one field; `None` means the field is absent from the result
    pub fn merge_field(
        &self,
        key: &str,
        parent: Option<&OptionValue>,
        child: Option<&OptionValue>,
        ctx: Option<&MergeContext>,
    ) -> Option<OptionValue> {
        match self.get(key) {
            MergeStrategy::Override => merge_override(key, parent, child, ctx),
            MergeStrategy::Concatenate => merge_concat(parent, child),
            MergeStrategy::Registry => Some(merge_registry(parent, child)),
            MergeStrategy::Extend => merge_extend(parent, child),
            MergeStrategy::Watch => merge_watch(parent, child),
            MergeStrategy::DataFn => merge_data_fn(key, parent, child, ctx),
            MergeStrategy::Custom(merge) => merge(parent, child, ctx),
        }
    }
}

fn merge_override(
    key: &str,
    parent: Option<&OptionValue>,
    child: Option<&OptionValue>,
    ctx: Option<&MergeContext>,
) -> Option<OptionValue> {
    if ctx.is_none() && matches!(key, "el" | "propsData") && child.is_some() {
        warn!(option = key, "option can only be used during instance creation");
    }
    child.or(parent).cloned()
}

fn items_of(value: &OptionValue) -> Vec<OptionValue> {
    match value {
        OptionValue::List(items) => items.as_ref().clone(),
        other => vec![other.clone()],
    }
}

fn merge_concat(parent: Option<&OptionValue>, child: Option<&OptionValue>) -> Option<OptionValue> {
    match (parent, child) {
        (parent, None) => parent.cloned(),
        (None, Some(child)) if child.is_list() => Some(child.clone()),
        (None, Some(child)) => Some(OptionValue::list(vec![child.clone()])),
        (Some(parent), Some(child)) => {
            let mut merged = items_of(parent);
            merged.extend(items_of(child));
            Some(OptionValue::list(merged))
        }
    }
}

fn merge_registry(parent: Option<&OptionValue>, child: Option<&OptionValue>) -> OptionValue {
    let registry = Registry::with_fallback(parent.and_then(|p| p.as_registry().cloned()));
    match child {
        Some(OptionValue::Registry(child)) => {
            for (name, value) in child.entries() {
                registry.insert(name, value);
            }
        }
        Some(OptionValue::Map(child)) => {
            for (name, value) in child.iter() {
                registry.insert(name.clone(), value.clone());
            }
        }
        _ => {}
    }
    OptionValue::Registry(registry)
}

fn merge_extend(parent: Option<&OptionValue>, child: Option<&OptionValue>) -> Option<OptionValue> {
    let Some(parent) = parent else {
        return child.cloned();
    };
    let Some(parent_map) = parent.as_map() else {
        return child.or(Some(parent)).cloned();
    };

    let mut merged = parent_map.clone();
    match child {
        Some(OptionValue::Map(child)) => {
            for (key, value) in child.iter() {
                merged.insert(key.clone(), value.clone());
            }
        }
        Some(other) => return Some(other.clone()),
        None => {}
    }
    Some(OptionValue::map(merged))
}

fn merge_watch(parent: Option<&OptionValue>, child: Option<&OptionValue>) -> Option<OptionValue> {
    let Some(child) = child else {
        return parent.cloned();
    };
    let (Some(parent_map), Some(child_map)) = (parent.and_then(OptionValue::as_map), child.as_map())
    else {
        return Some(child.clone());
    };

    let mut merged = parent_map.clone();
    for (key, watcher) in child_map.iter() {
        let combined = match merged.get(key) {
            Some(existing) => {
                let mut items = items_of(existing);
                items.extend(items_of(watcher));
                OptionValue::list(items)
            }
            None if watcher.is_list() => watcher.clone(),
            None => OptionValue::list(vec![watcher.clone()]),
        };
        merged.insert(key.clone(), combined);
    }
    Some(OptionValue::map(merged))
}

fn merge_data_fn(
    key: &str,
    parent: Option<&OptionValue>,
    child: Option<&OptionValue>,
    ctx: Option<&MergeContext>,
) -> Option<OptionValue> {
    let Some(child) = child else {
        return parent.cloned();
    };
    if ctx.is_none() && !matches!(child, OptionValue::Data(_)) {
        warn!(
            option = key,
            "option should be a function that returns a per-instance value in component definitions"
        );
        return parent.cloned();
    }
    let Some(parent) = parent else {
        return Some(child.clone());
    };

    let (child, parent) = (child.clone(), parent.clone());
    Some(OptionValue::Data(DataFn::new(move |vm| {
        let child_data = evaluate_data(&child, vm);
        let parent_data = evaluate_data(&parent, vm);
        match (child_data, parent_data) {
            (Some(child_data), Some(parent_data)) => merge_data(child_data, &parent_data),
            (Some(data), None) | (None, Some(data)) => data,
            (None, None) => DataMap::new(),
        }
    })))
}

/// Call a data factory, or copy a plain data map
pub fn evaluate_data(value: &OptionValue, vm: Option<&crate::instance::Instance>) -> Option<DataMap> {
    match value {
        OptionValue::Data(factory) => Some(factory.call(vm)),
        OptionValue::Map(map) => Some(map.as_ref().clone()),
        _ => None,
    }
}

/// Add `from` keys missing in `to`; nested maps merge recursively
pub fn merge_data(mut to: DataMap, from: &DataMap) -> DataMap {
    for (key, from_value) in from.iter() {
        let merged = match to.get(key) {
            None => from_value.clone(),
            Some(to_value) => match (to_value, from_value) {
                (OptionValue::Map(to_map), OptionValue::Map(from_map)) if !Rc::ptr_eq(to_map, from_map) => {
                    let nested: BTreeMap<_, _> = merge_data(to_map.as_ref().clone(), from_map);
                    OptionValue::map(nested)
                }
                _ => continue,
            },
        };
        to.insert(key.clone(), merged);
    }
    to
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Hook;

    fn hook() -> OptionValue {
        OptionValue::Hook(Hook::new(|_| Ok(())))
    }

    fn ctx() -> MergeContext {
        MergeContext { uid: Uid::new(7) }
    }

    #[test]
    fn test_default_table() {
        let table = StrategyTable::default();
        assert!(matches!(table.get("created"), MergeStrategy::Concatenate));
        assert!(matches!(table.get("components"), MergeStrategy::Registry));
        assert!(matches!(table.get("methods"), MergeStrategy::Extend));
        assert!(matches!(table.get("watch"), MergeStrategy::Watch));
        assert!(matches!(table.get("data"), MergeStrategy::DataFn));
        assert!(matches!(table.get("template"), MergeStrategy::Override));
    }

    #[test]
    fn test_concat_keeps_parent_identity_without_child() {
        let table = StrategyTable::default();
        let parent = OptionValue::list(vec![hook()]);
        let merged = table.merge_field("created", Some(&parent), None, None).unwrap();
        assert!(merged.same(&parent));
    }

    #[test]
    fn test_concat_wraps_scalar_child() {
        let table = StrategyTable::default();
        let child = hook();
        let merged = table.merge_field("created", None, Some(&child), None).unwrap();
        let items = merged.as_list().unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].same(&child));
    }

    #[test]
    fn test_concat_appends_child() {
        let table = StrategyTable::default();
        let (a, b) = (hook(), hook());
        let parent = OptionValue::list(vec![a.clone()]);
        let merged = table.merge_field("mounted", Some(&parent), Some(&b), None).unwrap();
        let items = merged.as_list().unwrap();
        assert!(items[0].same(&a));
        assert!(items[1].same(&b));
        assert!(!merged.same(&parent));
    }

    #[test]
    fn test_override_prefers_child() {
        let table = StrategyTable::default();
        let merged = table
            .merge_field("template", Some(&"<a/>".into()), Some(&"<b/>".into()), None)
            .unwrap();
        assert_eq!(merged.as_str(), Some("<b/>"));
        let kept = table.merge_field("template", Some(&"<a/>".into()), None, None).unwrap();
        assert_eq!(kept.as_str(), Some("<a/>"));
    }

    #[test]
    fn test_registry_falls_back_to_parent() {
        let table = StrategyTable::default();
        let parent = Registry::new();
        parent.insert("base-button", "parent".into());
        let mut child = BTreeMap::new();
        child.insert("local-card".to_string(), OptionValue::from("child"));

        let merged = table
            .merge_field(
                "components",
                Some(&OptionValue::Registry(parent.clone())),
                Some(&OptionValue::map(child)),
                None,
            )
            .unwrap();
        let registry = merged.as_registry().unwrap();
        assert!(registry.get("base-button").is_some());
        assert!(registry.contains_own("local-card"));
        assert!(!parent.contains_own("local-card"));
    }

    #[test]
    fn test_extend_child_keys_win() {
        let table = StrategyTable::default();
        let parent = OptionValue::from_json(serde_json::json!({"a": 1, "b": 1}));
        let child = OptionValue::from_json(serde_json::json!({"b": 2}));
        let merged = table.merge_field("methods", Some(&parent), Some(&child), None).unwrap();
        let map = merged.as_map().unwrap();
        assert!(map["a"].same(&OptionValue::from(1)));
        assert!(map["b"].same(&OptionValue::from(2)));
    }

    #[test]
    fn test_watch_concatenates_per_key() {
        let table = StrategyTable::default();
        let (a, b, c) = (hook(), hook(), hook());
        let parent = OptionValue::map(BTreeMap::from([("count".to_string(), a.clone())]));
        let child = OptionValue::map(BTreeMap::from([
            ("count".to_string(), b.clone()),
            ("label".to_string(), c.clone()),
        ]));
        let merged = table.merge_field("watch", Some(&parent), Some(&child), None).unwrap();
        let map = merged.as_map().unwrap();
        let count = map["count"].as_list().unwrap();
        assert!(count[0].same(&a) && count[1].same(&b));
        assert_eq!(map["label"].as_list().unwrap().len(), 1);
    }

    #[test]
    fn test_data_functions_compose() {
        let table = StrategyTable::default();
        let parent = OptionValue::Data(DataFn::new(|_| {
            DataMap::from([
                ("shared".to_string(), OptionValue::from("parent")),
                ("inherited".to_string(), OptionValue::from(1)),
            ])
        }));
        let child = OptionValue::Data(DataFn::new(|_| {
            DataMap::from([("shared".to_string(), OptionValue::from("child"))])
        }));

        let merged = table.merge_field("data", Some(&parent), Some(&child), None).unwrap();
        let data = evaluate_data(&merged, None).unwrap();
        assert_eq!(data["shared"].as_str(), Some("child"));
        assert!(data["inherited"].same(&OptionValue::from(1)));
    }

    #[test]
    fn test_plain_data_rejected_without_instance() {
        let table = StrategyTable::default();
        let plain = OptionValue::from_json(serde_json::json!({"a": 1}));
        assert!(table.merge_field("data", None, Some(&plain), None).is_none());
        let merged = table.merge_field("data", None, Some(&plain), Some(&ctx())).unwrap();
        assert!(merged.same(&plain));
    }

    #[test]
    fn test_merge_data_nested() {
        let to = DataMap::from([(
            "nested".to_string(),
            OptionValue::from_json(serde_json::json!({"a": 1})),
        )]);
        let from = DataMap::from([(
            "nested".to_string(),
            OptionValue::from_json(serde_json::json!({"a": 2, "b": 3})),
        )]);
        let merged = merge_data(to, &from);
        let nested = merged["nested"].as_map().unwrap();
        assert!(nested["a"].same(&OptionValue::from(1)));
        assert!(nested["b"].same(&OptionValue::from(3)));
    }

    #[test]
    fn test_custom_strategy() {
        let mut table = StrategyTable::default();
        table.register_custom("tag", |parent, child, _| match (parent, child) {
            (Some(OptionValue::Str(p)), Some(OptionValue::Str(c))) => {
                Some(OptionValue::Str(format!("{}+{}", p, c)))
            }
            (p, c) => c.or(p).cloned(),
        });
        let merged = table
            .merge_field("tag", Some(&"base".into()), Some(&"leaf".into()), None)
            .unwrap();
        assert_eq!(merged.as_str(), Some("base+leaf"));
    }
}
