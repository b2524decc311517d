//! Component declaration files
//!
//! A declaration file is TOML:
//!
//! ```toml
//! [runtime]
//! performance = true
//!
//! [[component]]
//! name = "base-card"
//! template = "<div class=\"card\"/>"
//! created = ["base-created"]
//! data = { title = "untitled" }
//!
//! [[component]]
//! name = "user-card"
//! extends = "base-card"
//! created = ["user-created"]
//!
//! [[mixin]]
//! target = "base-card"
//! created = ["late-mixin"]
//! ```
//!
//! Components are declared in file order, then mixins are applied in file
//! order. A mixin without `target` applies to the root constructor.
//! Lifecycle hooks are lists of labels; each label becomes a hook that
//! appends `hook:<label>` to the instance's [`Trace`](crate::subsystems::Trace).

mod report;

pub use report::{snapshot_digest, InspectReport, ReportError, ResolveReport, SourceInfo};

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::config::{load_toml_file, merge_layers, ConfigError, RuntimeConfig};
use crate::ctor::Constructor;
use crate::options::{DataFn, Hook, OptionValue, Options, LIFECYCLE_HOOKS};
use crate::runtime::Runtime;
use crate::subsystems::{record, Subsystems};

/// Raw contents of a declaration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclarationFile {
    #[serde(default)]
    pub runtime: Option<Value>,

    #[serde(default, rename = "component")]
    pub components: Vec<ComponentDeclaration>,

    #[serde(default, rename = "mixin")]
    pub mixins: Vec<MixinDeclaration>,
}

/// One `[[component]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentDeclaration {
    pub name: String,

    /// Name of an earlier component; the root constructor when absent
    #[serde(default)]
    pub extends: Option<String>,

    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

/// One `[[mixin]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct MixinDeclaration {
    /// Component to mix into; the root constructor when absent
    #[serde(default)]
    pub target: Option<String>,

    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

/// A loaded declaration file with provenance
#[derive(Debug, Clone)]
pub struct Declarations {
    pub path: Option<PathBuf>,
    /// SHA-256 of the raw file bytes
    pub digest: String,
    pub file: DeclarationFile,
}

/// Constructors built from a declaration file, by component name
#[derive(Debug, Default)]
pub struct ComponentSet {
    by_name: BTreeMap<String, Rc<Constructor>>,
}

impl ComponentSet {
    pub fn get(&self, name: &str) -> Option<&Rc<Constructor>> {
        self.by_name.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Rc<Constructor>, DeclarationError> {
        self.get(name)
            .ok_or_else(|| DeclarationError::UnknownComponent(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Declarations {
    pub fn from_file(path: &Path) -> Result<Self, DeclarationError> {
        let bytes = fs::read(path).map_err(|e| DeclarationError::Io(format!("{}: {}", path.display(), e)))?;
        let mut declarations = Self::from_bytes(&bytes)?;
        declarations.path = Some(path.to_path_buf());
        Ok(declarations)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeclarationError> {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = hex::encode(hasher.finalize());

        let contents =
            std::str::from_utf8(bytes).map_err(|e| DeclarationError::Parse(format!("Invalid UTF-8: {}", e)))?;
        let file: DeclarationFile =
            toml::from_str(contents).map_err(|e| DeclarationError::Parse(e.to_string()))?;

        Ok(Self {
            path: None,
            digest,
            file,
        })
    }

    /// Runtime config layers: defaults, the `[runtime]` table, `config_file`,
    /// then `overrides`
    pub fn runtime_config(
        &self,
        config_file: Option<&Path>,
        overrides: Option<Value>,
    ) -> Result<RuntimeConfig, DeclarationError> {
        let mut layers = vec![RuntimeConfig::default().to_value()];
        if let Some(runtime) = &self.file.runtime {
            layers.push(runtime.clone());
        }
        if let Some(path) = config_file {
            let (value, _) = load_toml_file(path)?;
            layers.push(value);
        }
        layers.extend(overrides);
        Ok(RuntimeConfig::from_value(merge_layers(layers))?)
    }

    /// Declare every component, then apply every mixin
    pub fn build<S: Subsystems>(&self, runtime: &Runtime<S>) -> Result<ComponentSet, DeclarationError> {
        let mut set = ComponentSet::default();
        let mut seen = HashSet::new();

        for decl in &self.file.components {
            if !seen.insert(decl.name.as_str()) {
                return Err(DeclarationError::Duplicate(decl.name.clone()));
            }
            let parent = match &decl.extends {
                Some(parent) => set
                    .get(parent)
                    .cloned()
                    .ok_or_else(|| DeclarationError::UnknownParent {
                        component: decl.name.clone(),
                        parent: parent.clone(),
                    })?,
                None => Rc::clone(runtime.root()),
            };

            let mut options = options_from_fields(&decl.fields);
            options.set("name", decl.name.as_str());
            let ctor = runtime.extend(&parent, options);
            debug!(component = %decl.name, cid = ctor.cid(), "declared component");
            set.by_name.insert(decl.name.clone(), ctor);
        }

        for mixin in &self.file.mixins {
            let target = match &mixin.target {
                Some(name) => set
                    .get(name)
                    .cloned()
                    .ok_or_else(|| DeclarationError::UnknownTarget(name.clone()))?,
                None => Rc::clone(runtime.root()),
            };
            runtime.mixin(&target, options_from_fields(&mixin.fields));
            debug!(cid = target.cid(), "applied mixin");
        }

        Ok(set)
    }
}

fn options_from_fields(fields: &BTreeMap<String, Value>) -> Options {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), field_value(key, value)))
        .collect()
}

fn field_value(key: &str, value: &Value) -> OptionValue {
    if LIFECYCLE_HOOKS.contains(&key) {
        let labels: Vec<&str> = match value {
            Value::String(label) => vec![label.as_str()],
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        return OptionValue::list(labels.into_iter().map(|label| traced_hook(label).into()).collect());
    }
    if matches!(key, "data" | "provide") && value.is_object() {
        let data = OptionValue::from_json(value.clone());
        return OptionValue::Data(DataFn::new(move |_| {
            data.as_map().cloned().unwrap_or_default()
        }));
    }
    OptionValue::from_json(value.clone())
}

/// A hook that records `hook:<label>` on the instance
fn traced_hook(label: &str) -> Hook {
    let entry = format!("hook:{label}");
    Hook::labeled(label, move |vm| {
        record(vm, entry.as_str());
        Ok(())
    })
}

/// Declaration file errors
#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("component {0} declared twice")]
    Duplicate(String),

    #[error("component {component} extends unknown component {parent}")]
    UnknownParent { component: String, parent: String },

    #[error("mixin targets unknown component {0}")]
    UnknownTarget(String),

    #[error("unknown component {0}")]
    UnknownComponent(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
