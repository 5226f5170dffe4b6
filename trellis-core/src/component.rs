//! Components
//!
//! A [`Component`] is a shared definition: a render function, an optional
//! state factory and lifecycle hooks. Each mount of a component node creates
//! a [`ComponentInstance`] that owns the state, the rendered subtree and the
//! render effect.
//!
//! # Lifecycle
//!
//! ```text
//! BeforeCreate -> (state) -> Created -> render -> BeforeMount -> mount -> Mounted
//!     ... state change -> job queued -> render -> BeforeUpdate -> patch -> Updated
//! BeforeUnmount -> stop effect -> unmount subtree -> Unmounted
//! ```
//!
//! Hooks run untracked: reading state inside a hook never subscribes the
//! render effect.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::error::RenderError;
use crate::reactive::{Effect, EffectOptions, Reactive, Runtime, Value};
use crate::scheduler::Job;
use crate::vnode::{Props, VNode};

/// Render function of a component.
pub type RenderFn = Arc<dyn Fn(&ComponentInstance) -> Result<VNode, RenderError> + Send + Sync>;

/// Factory for a component's initial state.
pub type DataFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Lifecycle callback.
pub type Hook = Arc<dyn Fn(&ComponentInstance) + Send + Sync>;

/// Lifecycle points at which hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleHook {
    BeforeCreate,
    Created,
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    BeforeUnmount,
    Unmounted,
}

type HookList = SmallVec<[Hook; 1]>;

struct ComponentDef {
    name: String,
    render: RenderFn,
    data: Option<DataFn>,
    hooks: HashMap<LifecycleHook, HookList>,
    functional: bool,
}

/// Shared component definition. Clones are the same component.
#[derive(Clone)]
pub struct Component {
    def: Arc<ComponentDef>,
}

impl Component {
    /// A component with just a render function.
    pub fn new<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&ComponentInstance) -> Result<VNode, RenderError> + Send + Sync + 'static,
    {
        Self::builder(name, render).build()
    }

    pub fn builder<F>(name: impl Into<String>, render: F) -> ComponentBuilder
    where
        F: Fn(&ComponentInstance) -> Result<VNode, RenderError> + Send + Sync + 'static,
    {
        ComponentBuilder {
            def: ComponentDef {
                name: name.into(),
                render: Arc::new(render),
                data: None,
                hooks: HashMap::new(),
                functional: false,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Functional components have no state and no lifecycle hooks.
    pub fn is_functional(&self) -> bool {
        self.def.functional
    }

    pub fn ptr_eq(&self, other: &Component) -> bool {
        Arc::ptr_eq(&self.def, &other.def)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.def.name)
            .field("functional", &self.def.functional)
            .finish()
    }
}

/// Builder for [`Component`].
pub struct ComponentBuilder {
    def: ComponentDef,
}

impl ComponentBuilder {
    /// State factory. It must return an object; anything else is ignored.
    pub fn data<F>(mut self, data: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.def.data = Some(Arc::new(data));
        self
    }

    /// Register a lifecycle hook. Several hooks per point run in order.
    pub fn hook<F>(mut self, point: LifecycleHook, hook: F) -> Self
    where
        F: Fn(&ComponentInstance) + Send + Sync + 'static,
    {
        self.def
            .hooks
            .entry(point)
            .or_default()
            .push(Arc::new(hook));
        self
    }

    /// Mark the component as functional: no state, no hooks.
    pub fn functional(mut self) -> Self {
        self.def.functional = true;
        self
    }

    pub fn build(self) -> Component {
        Component {
            def: Arc::new(self.def),
        }
    }
}

static INSTANCE_UID: AtomicU64 = AtomicU64::new(0);

/// A mounted component.
pub struct ComponentInstance {
    uid: u64,
    component: Component,
    runtime: Runtime,
    vnode: Mutex<VNode>,
    next: Mutex<Option<VNode>>,
    data: OnceLock<Reactive>,
    hooks: Mutex<HashMap<LifecycleHook, HookList>>,
    subtree: Mutex<Option<VNode>>,
    effect: Effect,
    update: Job,
    mounted: AtomicBool,
    unmounted: AtomicBool,
}

impl ComponentInstance {
    /// Set up an instance for `vnode`.
    ///
    /// Runs before-create, builds the state, then runs created. The render
    /// effect is created lazily; `render` is what it runs each time. Its
    /// notifications queue the instance's update job on the runtime's
    /// scheduler instead of re-rendering in place.
    pub(crate) fn new<R>(
        runtime: &Runtime,
        component: &Component,
        vnode: &VNode,
        render: R,
    ) -> Arc<Self>
    where
        R: Fn(&Arc<ComponentInstance>) + Send + Sync + 'static,
    {
        let instance = Arc::new_cyclic(|weak: &Weak<ComponentInstance>| {
            let body = {
                let weak = weak.clone();
                move || {
                    if let Some(instance) = weak.upgrade() {
                        render(&instance);
                    }
                }
            };
            let on_notify = {
                let weak = weak.clone();
                let scheduler = runtime.scheduler().clone();
                move || {
                    if let Some(instance) = weak.upgrade() {
                        scheduler.queue_job(instance.update.clone());
                    }
                }
            };
            let update = {
                let weak = weak.clone();
                Job::new(move || {
                    if let Some(instance) = weak.upgrade() {
                        if !instance.is_unmounted() {
                            instance.effect.run();
                        }
                    }
                })
            };

            let hooks = if component.is_functional() {
                HashMap::new()
            } else {
                component.def.hooks.clone()
            };

            ComponentInstance {
                uid: INSTANCE_UID.fetch_add(1, Ordering::Relaxed),
                component: component.clone(),
                runtime: runtime.clone(),
                vnode: Mutex::new(vnode.clone()),
                next: Mutex::new(None),
                data: OnceLock::new(),
                hooks: Mutex::new(hooks),
                subtree: Mutex::new(None),
                effect: Effect::with_options(
                    runtime,
                    body,
                    EffectOptions::new().lazy().scheduler(on_notify),
                ),
                update,
                mounted: AtomicBool::new(false),
                unmounted: AtomicBool::new(false),
            }
        });

        instance.call_hook(LifecycleHook::BeforeCreate);
        if let Some(data) = instance.create_state() {
            let _ = instance.data.set(data);
        }
        instance.call_hook(LifecycleHook::Created);
        instance
    }

    fn create_state(&self) -> Option<Reactive> {
        if self.component.is_functional() {
            return None;
        }
        let factory = self.component.def.data.as_ref()?;
        match self.runtime.untracked(|| factory()) {
            Value::Object(object) => Some(self.runtime.reactive(object)),
            other => {
                tracing::warn!(
                    component = self.component.name(),
                    value = %other,
                    "data() should return an object"
                );
                None
            }
        }
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn name(&self) -> &str {
        self.component.name()
    }

    /// The component's state, if it declared any.
    pub fn data(&self) -> Option<&Reactive> {
        self.data.get()
    }

    /// Props of the node currently rendering this instance.
    pub fn props(&self) -> Option<Arc<Props>> {
        self.vnode.lock().props().cloned()
    }

    /// Read one prop.
    pub fn prop(&self, key: &str) -> Option<Value> {
        self.vnode.lock().props()?.get(key).cloned()
    }

    /// The node this instance currently renders for.
    pub fn vnode(&self) -> VNode {
        self.vnode.lock().clone()
    }

    /// The last rendered subtree.
    pub fn subtree(&self) -> Option<VNode> {
        self.subtree.lock().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn is_unmounted(&self) -> bool {
        self.unmounted.load(Ordering::SeqCst)
    }

    /// Number of completed renders.
    pub fn render_count(&self) -> usize {
        self.effect.run_count()
    }

    /// Register an extra hook on this instance only.
    pub fn inject_hook<F>(&self, point: LifecycleHook, hook: F)
    where
        F: Fn(&ComponentInstance) + Send + Sync + 'static,
    {
        if self.component.is_functional() {
            tracing::warn!(component = self.name(), ?point, "functional components have no lifecycle");
            return;
        }
        self.hooks.lock().entry(point).or_default().push(Arc::new(hook));
    }

    /// Queue a re-render on the scheduler.
    pub fn queue_update(&self) -> bool {
        self.runtime.scheduler().queue_job(self.update.clone())
    }

    /// Run every hook registered for `point`, untracked.
    pub(crate) fn call_hook(&self, point: LifecycleHook) {
        let hooks: HookList = match self.hooks.lock().get(&point) {
            Some(hooks) => hooks.clone(),
            None => return,
        };
        tracing::trace!(component = self.name(), uid = self.uid, ?point, "lifecycle hook");
        self.runtime.untracked(|| {
            for hook in &hooks {
                hook(self);
            }
        });
    }

    pub(crate) fn call_render(&self) -> Result<VNode, RenderError> {
        (self.component.def.render)(self)
    }

    pub(crate) fn run_effect(&self) {
        self.effect.run();
    }

    pub(crate) fn stop_effect(&self) {
        self.effect.stop();
        self.cancel_queued_update();
    }

    pub(crate) fn cancel_queued_update(&self) -> bool {
        self.runtime.scheduler().invalidate(self.update.id())
    }

    pub(crate) fn set_vnode(&self, vnode: VNode) {
        *self.vnode.lock() = vnode;
    }

    pub(crate) fn take_next(&self) -> Option<VNode> {
        self.next.lock().take()
    }

    pub(crate) fn set_next(&self, vnode: Option<VNode>) {
        *self.next.lock() = vnode;
    }

    pub(crate) fn replace_subtree(&self, subtree: VNode) -> Option<VNode> {
        self.subtree.lock().replace(subtree)
    }

    pub(crate) fn set_mounted(&self) {
        self.mounted.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_unmounted(&self) {
        self.unmounted.store(true, Ordering::SeqCst);
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("uid", &self.uid)
            .field("component", &self.component.name())
            .field("mounted", &self.is_mounted())
            .field("unmounted", &self.is_unmounted())
            .finish()
    }
}
