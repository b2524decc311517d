//! Component instances
//!
//! An instance is built once by the initializer and moves through the
//! construction phases in a fixed order:
//! uid → options → proxy → lifecycle → events → render → beforeCreate →
//! injections → state → provide → created → (mount)

mod extensions;
mod hooks;
mod init;
mod internal;

pub use extensions::Extensions;
pub use hooks::call_hook;
pub use init::InitError;
pub(crate) use init::Initializer;
pub use internal::{InitOptions, InstanceOptions, InternalComponentOptions};

use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::ctor::Constructor;
use crate::options::OptionValue;

/// Process-wide instance id counter
static UID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Instance id; monotonic and never reused within a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(u64);

impl Uid {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocate the next instance id
pub fn next_uid() -> Uid {
    Uid(UID_COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// Construction phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InitPhase {
    #[serde(rename = "uid-assignment")]
    UidAssigned,
    #[serde(rename = "options-resolution")]
    OptionsResolved,
    #[serde(rename = "proxy-setup")]
    ProxyReady,
    #[serde(rename = "lifecycle-init")]
    Lifecycle,
    #[serde(rename = "events-init")]
    Events,
    #[serde(rename = "render-init")]
    Render,
    #[serde(rename = "before-create")]
    BeforeCreate,
    #[serde(rename = "injections-init")]
    Injections,
    #[serde(rename = "state-init")]
    State,
    #[serde(rename = "provide-init")]
    Provide,
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "mount")]
    Mounted,
}

impl InitPhase {
    pub const ORDER: [InitPhase; 12] = [
        InitPhase::UidAssigned,
        InitPhase::OptionsResolved,
        InitPhase::ProxyReady,
        InitPhase::Lifecycle,
        InitPhase::Events,
        InitPhase::Render,
        InitPhase::BeforeCreate,
        InitPhase::Injections,
        InitPhase::State,
        InitPhase::Provide,
        InitPhase::Created,
        InitPhase::Mounted,
    ];

    /// The phase that follows this one, if any
    pub fn next(self) -> Option<InitPhase> {
        let index = Self::ORDER.iter().position(|p| *p == self)?;
        Self::ORDER.get(index + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InitPhase::UidAssigned => "uid-assignment",
            InitPhase::OptionsResolved => "options-resolution",
            InitPhase::ProxyReady => "proxy-setup",
            InitPhase::Lifecycle => "lifecycle-init",
            InitPhase::Events => "events-init",
            InitPhase::Render => "render-init",
            InitPhase::BeforeCreate => "before-create",
            InitPhase::Injections => "injections-init",
            InitPhase::State => "state-init",
            InitPhase::Provide => "provide-init",
            InitPhase::Created => "created",
            InitPhase::Mounted => "mount",
        }
    }
}

impl fmt::Display for InitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What render code sees as `this`
#[derive(Clone, Default)]
pub enum RenderProxy {
    #[default]
    Unset,
    /// The instance itself
    Instance,
    /// A wrapper installed by the proxy collaborator
    Wrapped(Rc<dyn Any>),
}

impl fmt::Debug for RenderProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderProxy::Unset => write!(f, "Unset"),
            RenderProxy::Instance => write!(f, "Instance"),
            RenderProxy::Wrapped(_) => write!(f, "Wrapped"),
        }
    }
}

/// A constructed component instance
pub struct Instance {
    uid: Uid,
    constructor: Rc<Constructor>,
    options: InstanceOptions,
    phase: InitPhase,
    render_proxy: RenderProxy,
    name: Option<String>,
    extensions: Extensions,
}

impl Instance {
    pub(crate) fn new(uid: Uid, constructor: Rc<Constructor>, options: InstanceOptions) -> Self {
        Self {
            uid,
            constructor,
            options,
            phase: InitPhase::OptionsResolved,
            render_proxy: RenderProxy::Unset,
            name: None,
            extensions: Extensions::default(),
        }
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn constructor(&self) -> &Rc<Constructor> {
        &self.constructor
    }

    /// Resolved options (`$options`)
    pub fn options(&self) -> &InstanceOptions {
        &self.options
    }

    /// Last completed construction phase
    pub fn phase(&self) -> InitPhase {
        self.phase
    }

    /// Marker distinguishing component instances from plain data; always set.
    pub fn is_runtime_instance(&self) -> bool {
        true
    }

    pub fn render_proxy(&self) -> &RenderProxy {
        &self.render_proxy
    }

    pub fn set_render_proxy(&mut self, proxy: RenderProxy) {
        self.render_proxy = proxy;
    }

    /// Display name; only computed when perf marks are recorded
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    /// The parent instance handle, for sub-instances
    pub fn parent(&self) -> Option<OptionValue> {
        self.options.get("parent")
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub(crate) fn advance(&mut self, phase: InitPhase) {
        debug_assert!(
            self.phase.next() == Some(phase),
            "phase {} cannot follow {}",
            phase,
            self.phase
        );
        self.phase = phase;
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("uid", &self.uid)
            .field("cid", &self.constructor.cid())
            .field("phase", &self.phase)
            .field("render_proxy", &self.render_proxy)
            .finish()
    }
}
