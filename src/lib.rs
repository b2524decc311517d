//! Component runtime - instance bootstrap for a component framework
//!
//! This crate implements component constructors and their options cache,
//! the options merge, and the instance initialization sequence that takes a
//! constructor to a created (and optionally mounted) instance.

pub mod config;
pub mod ctor;
pub mod declaration;
pub mod instance;
pub mod naming;
pub mod options;
pub mod perf;
pub mod runtime;
pub mod subsystems;

pub use config::{ConfigError, RuntimeConfig};
pub use ctor::{resolve_constructor_options, resolve_modified_options, AssetKind, Constructor};
pub use instance::{
    call_hook, InitError, InitOptions, InitPhase, Instance, InstanceOptions, InternalComponentOptions, Uid,
};
pub use options::{dedupe, merge_options, Hook, HookError, OptionValue, Options, OptionsRef, StrategyTable};
pub use runtime::Runtime;
pub use subsystems::{NoopSubsystems, SubsystemError, Subsystems, TracingSubsystems};
