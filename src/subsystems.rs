//! Collaborator hooks called during instance construction
//!
//! The initializer owns the ordering; each `init_*` step is delegated to a
//! [`Subsystems`] implementation. [`NoopSubsystems`] does nothing beyond
//! setting the render proxy; [`TracingSubsystems`] records every step and
//! evaluates `data`, `inject` and `provide` so the result can be inspected.

use std::rc::Rc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::instance::{Instance, RenderProxy, Uid};
use crate::options::{evaluate_data, DataMap, OptionValue};

/// Error raised by a collaborator step
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SubsystemError {
    message: String,
}

impl SubsystemError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The per-phase collaborators of instance construction.
///
/// Every method receives the instance under construction. Errors abort
/// construction and are reported with the phase they came from.
pub trait Subsystems {
    /// Install the render proxy; only called outside production
    fn init_proxy(&self, vm: &mut Instance) -> Result<(), SubsystemError> {
        vm.set_render_proxy(RenderProxy::Instance);
        Ok(())
    }

    fn init_lifecycle(&self, _vm: &mut Instance) -> Result<(), SubsystemError> {
        Ok(())
    }

    fn init_events(&self, _vm: &mut Instance) -> Result<(), SubsystemError> {
        Ok(())
    }

    fn init_render(&self, _vm: &mut Instance) -> Result<(), SubsystemError> {
        Ok(())
    }

    fn init_injections(&self, _vm: &mut Instance) -> Result<(), SubsystemError> {
        Ok(())
    }

    fn init_state(&self, _vm: &mut Instance) -> Result<(), SubsystemError> {
        Ok(())
    }

    fn init_provide(&self, _vm: &mut Instance) -> Result<(), SubsystemError> {
        Ok(())
    }

    /// Attach the instance to `el`; called only when `el` is set
    fn mount(&self, _vm: &mut Instance, _el: &OptionValue) -> Result<(), SubsystemError> {
        Ok(())
    }
}

/// Collaborators that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSubsystems;

impl Subsystems for NoopSubsystems {}

/// Ordered record of construction steps and hook calls on an instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Trace(Vec<String>);

impl Trace {
    pub fn push(&mut self, entry: impl Into<String>) {
        self.0.push(entry.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    /// Index of the first entry equal to `entry`
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.iter().position(|e| e == entry)
    }
}

/// Append `entry` to the instance's trace
pub fn record(vm: &mut Instance, entry: impl Into<String>) {
    vm.extensions_mut().get_or_default::<Trace>().push(entry);
}

/// Evaluated `data` of an instance
#[derive(Debug, Clone, Default)]
pub struct StateData(pub DataMap);

/// Values resolved from `inject`
#[derive(Debug, Clone, Default)]
pub struct Injected(pub DataMap);

/// Evaluated `provide` of an instance
#[derive(Debug, Clone, Default)]
pub struct Provided(pub DataMap);

/// Mount target recorded by [`TracingSubsystems::mount`]
#[derive(Debug, Clone)]
pub struct MountTarget(pub OptionValue);

/// Dev-mode render proxy installed by [`TracingSubsystems`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevProxy {
    pub target: Uid,
}

/// Collaborators that record each step in the instance's [`Trace`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSubsystems;

impl TracingSubsystems {
    fn step(&self, vm: &mut Instance, phase: &str) {
        info!(uid = %vm.uid(), phase, "init step");
        record(vm, phase);
    }
}

impl Subsystems for TracingSubsystems {
    fn init_proxy(&self, vm: &mut Instance) -> Result<(), SubsystemError> {
        let proxy = DevProxy { target: vm.uid() };
        vm.set_render_proxy(RenderProxy::Wrapped(Rc::new(proxy)));
        self.step(vm, "proxy-setup");
        Ok(())
    }

    fn init_lifecycle(&self, vm: &mut Instance) -> Result<(), SubsystemError> {
        self.step(vm, "lifecycle-init");
        Ok(())
    }

    fn init_events(&self, vm: &mut Instance) -> Result<(), SubsystemError> {
        self.step(vm, "events-init");
        Ok(())
    }

    fn init_render(&self, vm: &mut Instance) -> Result<(), SubsystemError> {
        self.step(vm, "render-init");
        Ok(())
    }

    fn init_injections(&self, vm: &mut Instance) -> Result<(), SubsystemError> {
        let mut injected = DataMap::new();
        if let Some(inject) = vm.options().get("inject") {
            let entries = inject
                .as_map()
                .ok_or_else(|| SubsystemError::new("inject must be a map after normalization"))?;
            for (key, entry) in entries {
                if let Some(default) = entry.as_map().and_then(|e| e.get("default")) {
                    injected.insert(key.clone(), default.clone());
                }
            }
        }
        vm.extensions_mut().insert(Injected(injected));
        self.step(vm, "injections-init");
        Ok(())
    }

    fn init_state(&self, vm: &mut Instance) -> Result<(), SubsystemError> {
        let data = match vm.options().get("data") {
            Some(value) => evaluate_data(&value, Some(&*vm))
                .ok_or_else(|| SubsystemError::new("data must be a function or a map"))?,
            None => DataMap::new(),
        };
        vm.extensions_mut().insert(StateData(data));
        self.step(vm, "state-init");
        Ok(())
    }

    fn init_provide(&self, vm: &mut Instance) -> Result<(), SubsystemError> {
        let provided = match vm.options().get("provide") {
            Some(value) => evaluate_data(&value, Some(&*vm))
                .ok_or_else(|| SubsystemError::new("provide must be a function or a map"))?,
            None => DataMap::new(),
        };
        vm.extensions_mut().insert(Provided(provided));
        self.step(vm, "provide-init");
        Ok(())
    }

    fn mount(&self, vm: &mut Instance, el: &OptionValue) -> Result<(), SubsystemError> {
        vm.extensions_mut().insert(MountTarget(el.clone()));
        self.step(vm, "mount");
        Ok(())
    }
}
