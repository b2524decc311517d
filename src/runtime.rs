//! Runtime: config, merge strategies, collaborators and the root constructor

use std::rc::Rc;

use crate::config::RuntimeConfig;
use crate::ctor::{resolve_constructor_options, Constructor};
use crate::instance::{InitError, InitOptions, Initializer, Instance};
use crate::options::{Options, OptionsRef, StrategyTable};
use crate::perf::PerfRecorder;
use crate::subsystems::{NoopSubsystems, Subsystems};

/// Entry point for declaring components and constructing instances
pub struct Runtime<S: Subsystems = NoopSubsystems> {
    config: RuntimeConfig,
    strategies: StrategyTable,
    subsystems: S,
    perf: PerfRecorder,
    root: Rc<Constructor>,
}

impl Runtime<NoopSubsystems> {
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_subsystems(config, NoopSubsystems)
    }
}

impl<S: Subsystems> Runtime<S> {
    pub fn with_subsystems(config: RuntimeConfig, subsystems: S) -> Self {
        let strategies = StrategyTable::default();
        let root = Constructor::root(Options::new(), &strategies);
        Self {
            config,
            strategies,
            subsystems,
            perf: PerfRecorder::default(),
            root,
        }
    }

    /// Replace the merge strategies; the root constructor is rebuilt
    pub fn with_strategies(mut self, strategies: StrategyTable) -> Self {
        self.root = Constructor::root(Options::new(), &strategies);
        self.strategies = strategies;
        self
    }

    pub fn root(&self) -> &Rc<Constructor> {
        &self.root
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }

    pub fn subsystems(&self) -> &S {
        &self.subsystems
    }

    pub fn perf(&self) -> &PerfRecorder {
        &self.perf
    }

    /// Declare a subclass of `parent`
    pub fn extend(&self, parent: &Rc<Constructor>, options: Options) -> Rc<Constructor> {
        parent.extend(options, &self.strategies)
    }

    /// Declare a subclass of the root constructor
    pub fn declare(&self, options: Options) -> Rc<Constructor> {
        self.root.extend(options, &self.strategies)
    }

    /// Apply a global mixin to `ctor`
    pub fn mixin(&self, ctor: &Constructor, mixin: Options) {
        ctor.mixin(mixin, &self.strategies);
    }

    pub fn resolve(&self, ctor: &Rc<Constructor>) -> OptionsRef {
        resolve_constructor_options(ctor, &self.strategies)
    }

    /// Construct an instance of `ctor`
    pub fn construct(&self, ctor: &Rc<Constructor>, options: Option<InitOptions>) -> Result<Instance, InitError> {
        Initializer {
            config: &self.config,
            strategies: &self.strategies,
            subsystems: &self.subsystems,
            perf: &self.perf,
        }
        .run(ctor, options)
    }

    /// Construct a root instance from `options` alone
    pub fn new_instance(&self, options: Options) -> Result<Instance, InitError> {
        self.construct(&self.root, Some(InitOptions::User(options)))
    }
}

impl Default for Runtime<NoopSubsystems> {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}
