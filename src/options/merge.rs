//! Options merge
//!
//! Merges a child configuration into a parent one:
//! - child `props`/`inject`/`directives` are normalized first
//! - `extends`, then each `mixins` entry, are folded into the parent
//! - every field is merged by the strategy the table assigns to its name

use std::borrow::Cow;
use std::collections::BTreeMap;

use tracing::warn;

use super::object::Options;
use super::strategy::{MergeContext, StrategyTable};
use super::value::OptionValue;
use crate::naming::{camelize, validate_component_name};

/// Merge `child` into `parent`, producing a new configuration object.
pub fn merge_options(
    parent: &Options,
    child: &Options,
    ctx: Option<&MergeContext>,
    strategies: &StrategyTable,
) -> Options {
    check_components(child);
    let child = normalize(child);

    let mut parent: Cow<'_, Options> = Cow::Borrowed(parent);
    if let Some(extends) = child.get("extends").and_then(options_of) {
        parent = Cow::Owned(merge_options(&parent, &extends, ctx, strategies));
    }
    if let Some(mixins) = child.get("mixins").and_then(OptionValue::as_list) {
        for mixin in mixins.iter().filter_map(options_of) {
            parent = Cow::Owned(merge_options(&parent, &mixin, ctx, strategies));
        }
    }

    let mut merged = Options::new();
    for (key, parent_value) in parent.iter() {
        if let Some(value) = strategies.merge_field(key, Some(parent_value), child.get(key), ctx) {
            merged.set(key.clone(), value);
        }
    }
    for (key, child_value) in child.iter() {
        if parent.contains_key(key) {
            continue;
        }
        if let Some(value) = strategies.merge_field(key, None, Some(child_value), ctx) {
            merged.set(key.clone(), value);
        }
    }
    merged
}

/// Options carried by an `extends`/`mixins` entry
fn options_of(value: &OptionValue) -> Option<Options> {
    match value {
        OptionValue::Options(options) => Some(options.snapshot()),
        OptionValue::Component(component) => component.upgrade().map(|ctor| ctor.options().snapshot()),
        OptionValue::Map(map) => Some(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        _ => None,
    }
}

fn check_components(child: &Options) {
    let names = match child.get("components") {
        Some(OptionValue::Map(map)) => map.keys().cloned().collect(),
        Some(OptionValue::Registry(registry)) => registry.own_names(),
        _ => Vec::new(),
    };
    for name in names {
        if let Err(err) = validate_component_name(&name) {
            warn!(component = %name, "{}", err);
        }
    }
}

fn normalize(child: &Options) -> Cow<'_, Options> {
    let props = child.get("props").and_then(normalize_props);
    let inject = child.get("inject").and_then(normalize_inject);
    let directives = child.get("directives").and_then(normalize_directives);
    if props.is_none() && inject.is_none() && directives.is_none() {
        return Cow::Borrowed(child);
    }

    let mut normalized = child.clone();
    for (key, value) in [("props", props), ("inject", inject), ("directives", directives)] {
        if let Some(value) = value {
            normalized.set(key, value);
        }
    }
    Cow::Owned(normalized)
}

fn single(key: &str, value: OptionValue) -> OptionValue {
    OptionValue::map(BTreeMap::from([(key.to_string(), value)]))
}

/// `["my-prop"]` → `{myProp: {type: null}}`; `{p: Type}` → `{p: {type: Type}}`
fn normalize_props(props: &OptionValue) -> Option<OptionValue> {
    let mut normalized = BTreeMap::new();
    match props {
        OptionValue::List(names) => {
            for name in names.iter() {
                match name.as_str() {
                    Some(name) => {
                        normalized.insert(camelize(name), single("type", OptionValue::Null));
                    }
                    None => warn!("props must be strings when using array syntax"),
                }
            }
        }
        OptionValue::Map(entries) => {
            for (name, spec) in entries.iter() {
                let spec = match spec {
                    OptionValue::Map(_) => spec.clone(),
                    other => single("type", other.clone()),
                };
                normalized.insert(camelize(name), spec);
            }
        }
        _ => return None,
    }
    Some(OptionValue::map(normalized))
}

/// `["foo"]` → `{foo: {from: "foo"}}`; `{a: "b"}` → `{a: {from: "b"}}`
fn normalize_inject(inject: &OptionValue) -> Option<OptionValue> {
    let mut normalized = BTreeMap::new();
    match inject {
        OptionValue::List(names) => {
            for name in names.iter().filter_map(OptionValue::as_str) {
                normalized.insert(name.to_string(), single("from", name.into()));
            }
        }
        OptionValue::Map(entries) => {
            for (key, spec) in entries.iter() {
                let spec = match spec {
                    OptionValue::Map(fields) => {
                        let mut fields = fields.as_ref().clone();
                        fields.entry("from".to_string()).or_insert_with(|| key.as_str().into());
                        OptionValue::map(fields)
                    }
                    other => single("from", other.clone()),
                };
                normalized.insert(key.clone(), spec);
            }
        }
        _ => return None,
    }
    Some(OptionValue::map(normalized))
}

/// A bare directive hook becomes `{bind: f, update: f}`
fn normalize_directives(directives: &OptionValue) -> Option<OptionValue> {
    let entries = directives.as_map()?;
    if !entries.values().any(|d| matches!(d, OptionValue::Hook(_))) {
        return None;
    }
    let normalized = entries
        .iter()
        .map(|(name, def)| {
            let def = match def {
                OptionValue::Hook(_) => OptionValue::map(BTreeMap::from([
                    ("bind".to_string(), def.clone()),
                    ("update".to_string(), def.clone()),
                ])),
                other => other.clone(),
            };
            (name.clone(), def)
        })
        .collect();
    Some(OptionValue::map(normalized))
}
