//! Runtime configuration
//!
//! Layered merge of built-in defaults, an optional TOML file and CLI
//! overrides into a [`RuntimeConfig`].

mod merge;
mod runtime;

pub use merge::{deep_merge, merge_layers};
pub(crate) use runtime::load_toml_file;
pub use runtime::{ConfigError, ConfigOrigin, ConfigSource, RuntimeConfig};
