//! Instance initialization sequence

use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info_span};

use super::{call_hook, next_uid, InitOptions, InitPhase, Instance, InstanceOptions, RenderProxy, Uid};
use crate::config::RuntimeConfig;
use crate::ctor::{resolve_constructor_options, Constructor};
use crate::naming::format_component_name;
use crate::options::{merge_options, HookError, MergeContext, Options, OptionsRef, StrategyTable};
use crate::perf::PerfRecorder;
use crate::subsystems::{SubsystemError, Subsystems};

/// Failure while constructing an instance
#[derive(Debug, Error)]
pub enum InitError {
    #[error("instance {uid}: {phase} failed: {source}")]
    Subsystem {
        phase: InitPhase,
        uid: Uid,
        #[source]
        source: SubsystemError,
    },

    #[error("instance {uid}: hook {hook}[{index}] failed: {source}")]
    Hook {
        hook: String,
        index: usize,
        uid: Uid,
        #[source]
        source: HookError,
    },

    #[error("instance {uid}: mount failed: {source}")]
    Mount {
        uid: Uid,
        #[source]
        source: SubsystemError,
    },
}

impl InitError {
    pub fn uid(&self) -> Uid {
        match self {
            InitError::Subsystem { uid, .. } | InitError::Hook { uid, .. } | InitError::Mount { uid, .. } => *uid,
        }
    }

    /// Phase the failure happened in
    pub fn phase(&self) -> InitPhase {
        match self {
            InitError::Subsystem { phase, .. } => *phase,
            InitError::Hook { hook, .. } if hook == "beforeCreate" => InitPhase::BeforeCreate,
            InitError::Hook { .. } => InitPhase::Created,
            InitError::Mount { .. } => InitPhase::Mounted,
        }
    }
}

/// Drives one instance through every construction phase
pub(crate) struct Initializer<'a, S: Subsystems + ?Sized> {
    pub config: &'a RuntimeConfig,
    pub strategies: &'a StrategyTable,
    pub subsystems: &'a S,
    pub perf: &'a PerfRecorder,
}

impl<S: Subsystems + ?Sized> Initializer<'_, S> {
    pub fn run(&self, ctor: &Rc<Constructor>, options: Option<InitOptions>) -> Result<Instance, InitError> {
        let uid = next_uid();
        let span = info_span!("init", %uid, cid = ctor.cid());
        let _guard = span.enter();

        let perf = self.config.perf_enabled();
        let start_tag = format!("component-perf-init:{uid}");
        let end_tag = format!("component-perf-end:{uid}");
        if perf {
            self.perf.mark(&start_tag);
        }

        let resolved = resolve_constructor_options(ctor, self.strategies);
        let instance_options = match options {
            Some(InitOptions::Internal(internal)) => {
                debug!("internal component, overlaying constructor options");
                internal.overlay(resolved)
            }
            Some(InitOptions::User(user)) => self.merge_user(resolved, &user, uid),
            None => self.merge_user(resolved, &Options::new(), uid),
        };
        let mut vm = Instance::new(uid, Rc::clone(ctor), instance_options);

        if self.config.production {
            vm.set_render_proxy(RenderProxy::Instance);
            vm.advance(InitPhase::ProxyReady);
        } else {
            self.step(&mut vm, InitPhase::ProxyReady, |s, vm| s.init_proxy(vm))?;
        }

        self.step(&mut vm, InitPhase::Lifecycle, |s, vm| s.init_lifecycle(vm))?;
        self.step(&mut vm, InitPhase::Events, |s, vm| s.init_events(vm))?;
        self.step(&mut vm, InitPhase::Render, |s, vm| s.init_render(vm))?;
        call_hook(&mut vm, "beforeCreate")?;
        vm.advance(InitPhase::BeforeCreate);
        self.step(&mut vm, InitPhase::Injections, |s, vm| s.init_injections(vm))?;
        self.step(&mut vm, InitPhase::State, |s, vm| s.init_state(vm))?;
        self.step(&mut vm, InitPhase::Provide, |s, vm| s.init_provide(vm))?;
        call_hook(&mut vm, "created")?;
        vm.advance(InitPhase::Created);

        if perf {
            let name = format_component_name(&vm, false);
            vm.set_name(name.clone());
            self.perf.mark(&end_tag);
            self.perf.measure(&format!("{name} init"), &start_tag, &end_tag);
        }

        if let Some(el) = vm.options().get("el") {
            self.subsystems
                .mount(&mut vm, &el)
                .map_err(|source| InitError::Mount { uid, source })?;
            vm.advance(InitPhase::Mounted);
        }

        debug!(phase = %vm.phase(), "instance initialized");
        Ok(vm)
    }

    fn merge_user(&self, resolved: OptionsRef, user: &Options, uid: Uid) -> InstanceOptions {
        let ctx = MergeContext { uid };
        let merged = merge_options(&resolved.borrow(), user, Some(&ctx), self.strategies);
        InstanceOptions::Merged(merged.into_shared())
    }

    fn step<F>(&self, vm: &mut Instance, phase: InitPhase, f: F) -> Result<(), InitError>
    where
        F: FnOnce(&S, &mut Instance) -> Result<(), SubsystemError>,
    {
        f(self.subsystems, vm).map_err(|source| InitError::Subsystem {
            phase,
            uid: vm.uid(),
            source,
        })?;
        vm.advance(phase);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Hook, OptionValue};
    use crate::subsystems::NoopSubsystems;

    fn run(config: &RuntimeConfig, ctor: &Rc<Constructor>, options: Option<InitOptions>) -> Result<Instance, InitError> {
        let strategies = StrategyTable::default();
        let perf = PerfRecorder::default();
        Initializer {
            config,
            strategies: &strategies,
            subsystems: &NoopSubsystems,
            perf: &perf,
        }
        .run(ctor, options)
    }

    #[test]
    fn test_plain_instance_reaches_created() {
        let strategies = StrategyTable::default();
        let root = Constructor::root(Options::new(), &strategies);
        let vm = run(&RuntimeConfig::default(), &root, None).unwrap();
        assert_eq!(vm.phase(), InitPhase::Created);
        assert!(matches!(vm.render_proxy(), RenderProxy::Instance));
        assert!(vm.name().is_none());
    }

    #[test]
    fn test_production_skips_proxy_collaborator() {
        let strategies = StrategyTable::default();
        let root = Constructor::root(Options::new(), &strategies);
        let config = RuntimeConfig {
            production: true,
            ..RuntimeConfig::default()
        };
        let vm = run(&config, &root, None).unwrap();
        assert!(matches!(vm.render_proxy(), RenderProxy::Instance));
        assert!(vm.phase() >= InitPhase::ProxyReady);
    }

    #[test]
    fn test_hook_error_reports_index() {
        let strategies = StrategyTable::default();
        let root = Constructor::root(Options::new(), &strategies);
        let user = Options::new().with(
            "created",
            OptionValue::list(vec![
                Hook::new(|_| Ok(())).into(),
                Hook::new(|_| Err(HookError::new("boom"))).into(),
            ]),
        );
        let err = run(&RuntimeConfig::default(), &root, Some(user.into())).unwrap_err();
        match &err {
            InitError::Hook { hook, index, .. } => {
                assert_eq!(hook, "created");
                assert_eq!(*index, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.phase(), InitPhase::Created);
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_user_options_merged_with_constructor() {
        let strategies = StrategyTable::default();
        let root = Constructor::root(Options::new().with("inheritAttrs", true), &strategies);
        let vm = run(
            &RuntimeConfig::default(),
            &root,
            Some(Options::new().with("template", "<div/>").into()),
        )
        .unwrap();
        assert!(!vm.options().is_overlay());
        assert_eq!(vm.options().get("template").unwrap().as_str(), Some("<div/>"));
        assert!(vm.options().contains_key("inheritAttrs"));
    }
}
