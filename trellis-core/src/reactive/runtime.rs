//! Reactive Runtime
//!
//! The runtime is the reactive context that connects sources and effects.
//! It owns the dependency store, the effect registry, the effect stack and
//! the job scheduler.
//!
//! # How It Works
//!
//! 1. Running an effect pushes it onto the runtime's effect stack.
//!
//! 2. Reading a source calls [`Runtime::track`], which subscribes the effect
//!    on top of the stack to the `(source, field)` pair and records the
//!    back-reference on the effect.
//!
//! 3. Writing a source calls [`Runtime::trigger`], which snapshots the
//!    dependents of the field and notifies them: derived-value effects
//!    first, then everything else, each group in subscription order.
//!    Plain effects reached through a derived value that the write
//!    invalidated join the same batch, so each one runs once per write.
//!
//! # Independence
//!
//! Nothing here is global. Each `Runtime` is its own reactive graph, so two
//! runtimes (two renderers, two tests) never see each other's writes. The
//! handle is cheap to clone; clones share the same graph.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use super::computed::Computed;
use super::context::{ContextGuard, EffectStack};
use super::effect::Effect;
use super::proxy::Reactive;
use super::refs::Ref;
use super::subscriber::Subscriber;
use super::value::Object;
use crate::config::RuntimeConfig;
use crate::graph::{DepKey, DependencyStore, EffectId, FieldKey, SourceId};
use crate::scheduler::Scheduler;

/// Handle to one reactive graph.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    store: Mutex<DependencyStore>,
    // Weak so that dropping every handle of an effect lets it go.
    registry: RwLock<HashMap<EffectId, Weak<dyn Subscriber>>>,
    stack: EffectStack,
    // Plain effects waiting for the outermost trigger to notify them.
    batch: Mutex<Option<PendingEffects>>,
    scheduler: Scheduler,
    config: RuntimeConfig,
}

type PendingEffects = IndexMap<EffectId, Arc<dyn Subscriber>>;

/// Open batch of plain notifications. Only the trigger that opened it
/// drains it; the batch is discarded if that trigger unwinds.
struct BatchScope<'a> {
    batch: &'a Mutex<Option<PendingEffects>>,
    owner: bool,
}

impl<'a> BatchScope<'a> {
    fn join(batch: &'a Mutex<Option<PendingEffects>>, plain: Vec<Arc<dyn Subscriber>>) -> Self {
        let mut slot = batch.lock();
        let owner = slot.is_none();
        let pending = slot.get_or_insert_with(IndexMap::new);
        for subscriber in plain {
            pending.entry(subscriber.id()).or_insert(subscriber);
        }
        Self { batch, owner }
    }

    fn drain(self) -> PendingEffects {
        if !self.owner {
            return PendingEffects::default();
        }
        let pending = self.batch.lock().take();
        pending.unwrap_or_default()
    }
}

impl Drop for BatchScope<'_> {
    fn drop(&mut self) {
        if self.owner {
            self.batch.lock().take();
        }
    }
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with the given configuration.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                store: Mutex::new(DependencyStore::new()),
                registry: RwLock::new(HashMap::new()),
                stack: EffectStack::default(),
                batch: Mutex::new(None),
                scheduler: Scheduler::new(config.clone()),
                config,
            }),
        }
    }

    /// The runtime's configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// The job scheduler owned by this runtime.
    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Check whether two handles refer to the same graph.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn stack(&self) -> &EffectStack {
        &self.inner.stack
    }

    pub(crate) fn enter(&self, effect: Option<EffectId>) -> ContextGuard {
        ContextGuard::enter(self, effect)
    }

    pub(crate) fn register(&self, id: EffectId, subscriber: Weak<dyn Subscriber>) {
        self.inner.registry.write().insert(id, subscriber);
    }

    pub(crate) fn unregister(&self, id: EffectId) {
        self.inner.registry.write().remove(&id);
    }

    /// Remove `effect` from each of the given fields.
    pub(crate) fn release<I>(&self, effect: EffectId, deps: I)
    where
        I: IntoIterator<Item = DepKey>,
    {
        let mut store = self.inner.store.lock();
        for (source, field) in deps {
            store.unsubscribe(source, &field, effect);
        }
    }

    // ------------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------------

    /// The effect currently recording reads, if any.
    pub fn active_effect(&self) -> Option<EffectId> {
        self.inner.stack.current()
    }

    /// Check whether reads are being recorded right now.
    pub fn is_tracking(&self) -> bool {
        self.active_effect().is_some()
    }

    /// Run `f` without recording any reads it makes.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _ctx = self.enter(None);
        f()
    }

    /// Record that the running effect read `(source, field)`.
    ///
    /// No-op when no effect is running. Idempotent within a run.
    pub fn track(&self, source: SourceId, field: FieldKey) {
        let Some(effect_id) = self.active_effect() else {
            return;
        };

        let added = self
            .inner
            .store
            .lock()
            .subscribe(source, field.clone(), effect_id);

        let subscriber = self
            .inner
            .registry
            .read()
            .get(&effect_id)
            .and_then(Weak::upgrade);

        if let Some(subscriber) = subscriber {
            if added {
                tracing::trace!(effect = effect_id.raw(), source = source.raw(), %field, "track");
            }
            subscriber.record((source, field));
        }
    }

    /// Notify every effect that read `(source, field)`.
    ///
    /// Derived-value effects are notified before plain effects; within each
    /// group the order is subscription order. The innermost running effect
    /// is skipped, so an effect never re-enters itself through its own
    /// writes. Plain effects reached again through an invalidated derived
    /// value are notified once.
    pub fn trigger(&self, source: SourceId, field: &FieldKey) {
        let dependents = self.inner.store.lock().dependents(source, field);
        if dependents.is_empty() {
            return;
        }

        let running = self.inner.stack.running();
        let (derived, plain): (Vec<Arc<dyn Subscriber>>, Vec<Arc<dyn Subscriber>>) = {
            let registry = self.inner.registry.read();
            dependents
                .iter()
                .filter(|id| Some(**id) != running)
                .filter_map(|id| registry.get(id).and_then(Weak::upgrade))
                .partition(|subscriber| subscriber.is_computed())
        };

        tracing::trace!(
            source = source.raw(),
            %field,
            derived = derived.len(),
            plain = plain.len(),
            "trigger"
        );

        let scope = BatchScope::join(&self.inner.batch, plain);
        for subscriber in &derived {
            subscriber.notify();
        }
        for (_, subscriber) in scope.drain() {
            subscriber.notify();
        }
    }

    /// Number of effects subscribed to `(source, field)`.
    pub fn dependent_count(&self, source: SourceId, field: &FieldKey) -> usize {
        self.inner.store.lock().dependent_count(source, field)
    }

    /// Number of sources with at least one subscriber.
    pub fn tracked_source_count(&self) -> usize {
        self.inner.store.lock().source_count()
    }

    // ------------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------------

    /// Create an effect that runs now and again whenever what it read changes.
    pub fn effect<F>(&self, run: F) -> Effect
    where
        F: Fn() + Send + Sync + 'static,
    {
        Effect::new(self, run)
    }

    /// Create a tracked value container.
    pub fn create_ref<T>(&self, value: T) -> Ref<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        Ref::new(self, value)
    }

    /// Wrap an object so property reads are tracked and writes trigger.
    pub fn reactive(&self, target: Object) -> Reactive {
        Reactive::new(self, target)
    }

    /// Create a cached derived value.
    pub fn computed<T, F>(&self, getter: F) -> Computed<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Computed::new(self, getter)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("effects", &self.inner.registry.read().len())
            .field("tracked_sources", &self.tracked_source_count())
            .field("stack_depth", &self.inner.stack.depth())
            .finish()
    }
}
