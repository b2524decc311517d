//! Instance options: full merge result or overlay on constructor options

use std::collections::BTreeSet;

use serde_json::Value;

use crate::options::{OptionValue, Options, OptionsRef};

/// Options handed to instance construction
#[derive(Debug, Clone)]
pub enum InitOptions {
    /// Caller-supplied options, fully merged with the constructor's
    User(Options),
    /// Sub-instance created by the render layer; takes the overlay fast path
    Internal(InternalComponentOptions),
}

impl From<Options> for InitOptions {
    fn from(options: Options) -> Self {
        InitOptions::User(options)
    }
}

impl From<InternalComponentOptions> for InitOptions {
    fn from(options: InternalComponentOptions) -> Self {
        InitOptions::Internal(options)
    }
}

/// Per-instance fields for a component instantiated by its parent's render
#[derive(Debug, Clone, Default)]
pub struct InternalComponentOptions {
    pub parent: Option<OptionValue>,
    pub props_data: Option<OptionValue>,
    pub parent_vnode: Option<OptionValue>,
    pub parent_listeners: Option<OptionValue>,
    pub render_children: Option<OptionValue>,
    pub component_tag: Option<String>,
    pub parent_elm: Option<OptionValue>,
    pub ref_elm: Option<OptionValue>,
    /// Only applied together with `static_render_fns` when present
    pub render: Option<OptionValue>,
    pub static_render_fns: Option<OptionValue>,
}

impl InternalComponentOptions {
    pub fn new(parent: OptionValue) -> Self {
        Self {
            parent: Some(parent),
            ..Self::default()
        }
    }

    /// Overlay these fields on the constructor's resolved options
    pub(crate) fn overlay(self, base: OptionsRef) -> InstanceOptions {
        let mut own = Options::new();
        let fields = [
            ("parent", self.parent),
            ("propsData", self.props_data),
            ("_parentVnode", self.parent_vnode),
            ("_parentListeners", self.parent_listeners),
            ("_renderChildren", self.render_children),
            ("_componentTag", self.component_tag.map(OptionValue::Str)),
            ("_parentElm", self.parent_elm),
            ("_refElm", self.ref_elm),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                own.set(key, value);
            }
        }
        if let Some(render) = self.render {
            own.set("render", render);
            if let Some(static_render_fns) = self.static_render_fns {
                own.set("staticRenderFns", static_render_fns);
            }
        }
        InstanceOptions::Overlay { base, own }
    }
}

/// Resolved options of an instance (`$options`)
#[derive(Debug, Clone)]
pub enum InstanceOptions {
    /// Result of a full merge
    Merged(OptionsRef),
    /// Instance-specific fields over a read-only base; lookups fall back to it
    Overlay { base: OptionsRef, own: Options },
}

impl InstanceOptions {
    pub fn get(&self, key: &str) -> Option<OptionValue> {
        match self {
            InstanceOptions::Merged(options) => options.get(key),
            InstanceOptions::Overlay { base, own } => {
                own.get(key).cloned().or_else(|| base.get(key))
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        match self {
            InstanceOptions::Merged(options) => options.borrow().contains_key(key),
            InstanceOptions::Overlay { base, own } => {
                own.contains_key(key) || base.borrow().contains_key(key)
            }
        }
    }

    /// Every visible field name
    pub fn keys(&self) -> Vec<String> {
        let mut keys = BTreeSet::new();
        match self {
            InstanceOptions::Merged(options) => {
                keys.extend(options.borrow().keys().map(str::to_string));
            }
            InstanceOptions::Overlay { base, own } => {
                keys.extend(base.borrow().keys().map(str::to_string));
                keys.extend(own.keys().map(str::to_string));
            }
        }
        keys.into_iter().collect()
    }

    pub fn is_overlay(&self) -> bool {
        matches!(self, InstanceOptions::Overlay { .. })
    }

    /// Options the overlay falls back to
    pub fn base(&self) -> Option<&OptionsRef> {
        match self {
            InstanceOptions::Overlay { base, .. } => Some(base),
            InstanceOptions::Merged(_) => None,
        }
    }

    pub fn name(&self) -> Option<String> {
        self.get("name").and_then(|n| n.as_str().map(str::to_string))
    }

    /// Flattened copy of every visible field
    pub fn snapshot(&self) -> Options {
        match self {
            InstanceOptions::Merged(options) => options.snapshot(),
            InstanceOptions::Overlay { base, own } => {
                let mut flat = base.snapshot();
                flat.extend_from(own);
                flat
            }
        }
    }

    pub fn describe(&self) -> Value {
        self.snapshot().describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_copies_fields_and_falls_back() {
        let base = Options::new()
            .with("name", "list-item")
            .with("template", "<li/>")
            .into_shared();
        let parent = OptionValue::handle("parent-vm");
        let props = OptionValue::from_json(serde_json::json!({"label": "x"}));
        let internal = InternalComponentOptions {
            props_data: Some(props.clone()),
            component_tag: Some("list-item".to_string()),
            ..InternalComponentOptions::new(parent.clone())
        };

        let options = internal.overlay(base.clone());
        assert!(options.is_overlay());
        assert!(options.get("parent").unwrap().same(&parent));
        assert!(options.get("propsData").unwrap().same(&props));
        assert_eq!(options.get("_componentTag").unwrap().as_str(), Some("list-item"));
        assert_eq!(options.get("template").unwrap().as_str(), Some("<li/>"));
        assert!(options.base().unwrap().ptr_eq(&base));
        assert!(!options.contains_key("render"));
    }

    #[test]
    fn test_overlay_sees_later_base_changes() {
        let base = Options::new().into_shared();
        let options = InternalComponentOptions::default().overlay(base.clone());
        base.set("inheritAttrs", false);
        assert!(options.get("inheritAttrs").unwrap().same(&OptionValue::Bool(false)));
    }

    #[test]
    fn test_static_render_fns_require_render() {
        let base = Options::new().into_shared();
        let internal = InternalComponentOptions {
            static_render_fns: Some(OptionValue::list(vec![])),
            ..Default::default()
        };
        let options = internal.overlay(base.clone());
        assert!(!options.contains_key("staticRenderFns"));

        let internal = InternalComponentOptions {
            render: Some(OptionValue::handle("render-fn")),
            static_render_fns: Some(OptionValue::list(vec![])),
            ..Default::default()
        };
        let options = internal.overlay(base);
        assert!(options.contains_key("render"));
        assert!(options.contains_key("staticRenderFns"));
    }

    #[test]
    fn test_keys_and_snapshot_union() {
        let base = Options::new().with("a", 1).with("b", 2).into_shared();
        let options = InstanceOptions::Overlay {
            base,
            own: Options::new().with("b", 3).with("c", 4),
        };
        assert_eq!(options.keys(), vec!["a", "b", "c"]);
        let flat = options.snapshot();
        assert!(flat.get("b").unwrap().same(&OptionValue::from(3)));
    }
}
