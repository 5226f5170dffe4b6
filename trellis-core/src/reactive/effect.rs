//! Effect Implementation
//!
//! An Effect is a re-runnable computation that records which fields it
//! read and is notified when any of them change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its body immediately (unless lazy) to
//!    establish its initial dependencies.
//!
//! 2. While running, the effect sits on top of the runtime's effect stack,
//!    so every tracked read subscribes it and leaves a back-reference here.
//!
//! 3. When a dependency changes, the effect calls its scheduler if it has
//!    one, otherwise it re-runs synchronously.
//!
//! 4. After each run, fields that were read last time but not this time are
//!    unsubscribed. Fields still read keep their place in the dependent
//!    order.
//!
//! # Stopping
//!
//! [`Effect::stop`] walks the back-references and removes the effect from
//! every field it is subscribed to. Dropping the last handle does the same.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexSet;
use parking_lot::Mutex;

use super::runtime::Runtime;
use super::subscriber::Subscriber;
use crate::graph::{DepKey, EffectId};

/// Callback invoked instead of re-running an effect.
pub type EffectScheduler = Arc<dyn Fn() + Send + Sync>;

/// Options for creating an effect.
#[derive(Clone, Default)]
pub struct EffectOptions {
    lazy: bool,
    scheduler: Option<EffectScheduler>,
    derived: bool,
}

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not run the effect on creation.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Call `scheduler` on notification instead of re-running the effect.
    pub fn scheduler<F>(mut self, scheduler: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }

    /// Mark the effect as backing a derived value.
    pub(crate) fn derived(mut self) -> Self {
        self.derived = true;
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("scheduler", &self.scheduler.is_some())
            .field("derived", &self.derived)
            .finish()
    }
}

/// A tracked computation that re-runs when its dependencies change.
///
/// The handle is cheap to clone; clones share the same effect. The effect
/// stays subscribed as long as at least one handle is alive and it has not
/// been stopped.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::Runtime;
///
/// let runtime = Runtime::new();
/// let count = runtime.create_ref(0);
///
/// let seen = count.clone();
/// let effect = runtime.effect(move || {
///     let _ = seen.get();
/// });
///
/// count.set(5); // re-runs the effect
/// assert_eq!(effect.run_count(), 2);
/// ```
pub struct Effect<T = ()> {
    inner: Arc<EffectInner<T>>,
}

struct EffectInner<T> {
    id: EffectId,
    runtime: Runtime,
    body: Box<dyn Fn() -> T + Send + Sync>,
    scheduler: Option<EffectScheduler>,
    derived: bool,
    deps: Mutex<IndexSet<DepKey>>,
    stopped: AtomicBool,
    run_count: AtomicUsize,
}

impl<T: 'static> Effect<T> {
    /// Create an effect and run it immediately.
    pub fn new<F>(runtime: &Runtime, body: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_options(runtime, body, EffectOptions::default())
    }

    /// Create an effect with explicit options.
    pub fn with_options<F>(runtime: &Runtime, body: F, options: EffectOptions) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new(EffectInner {
            id: EffectId::new(),
            runtime: runtime.clone(),
            body: Box::new(body),
            scheduler: options.scheduler,
            derived: options.derived,
            deps: Mutex::new(IndexSet::new()),
            stopped: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });

        let weak = Arc::downgrade(&inner);
        let weak: Weak<dyn Subscriber> = weak;
        runtime.register(inner.id, weak);

        let effect = Self { inner };
        if !options.lazy {
            effect.run();
        }
        effect
    }
}

impl<T> Effect<T> {

    /// Get the effect's unique ID.
    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    /// Run the body with dependency tracking and return its result.
    pub fn run(&self) -> T {
        self.inner.run()
    }

    /// Unsubscribe from every field. Later runs execute untracked.
    ///
    /// Stopping twice is harmless.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Check whether the effect is still subscribed.
    pub fn is_active(&self) -> bool {
        !self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Whether the effect backs a derived value.
    pub fn is_derived(&self) -> bool {
        self.inner.derived
    }

    /// Number of completed tracked runs.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Number of fields the effect is subscribed to.
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.lock().len()
    }
}

impl<T> EffectInner<T> {
    fn run(&self) -> T {
        if self.stopped.load(Ordering::SeqCst) {
            return self.runtime.untracked(|| (self.body)());
        }

        let restore = RestoreOnUnwind {
            deps: &self.deps,
            previous: Some(std::mem::take(&mut *self.deps.lock())),
        };

        let result = {
            let _ctx = self.runtime.enter(Some(self.id));
            (self.body)()
        };
        let previous = restore.finish();

        if self.stopped.load(Ordering::SeqCst) {
            // Stopped by its own body; drop what this run subscribed.
            let current = std::mem::take(&mut *self.deps.lock());
            self.runtime.release(self.id, current.into_iter().chain(previous));
            return result;
        }

        let stale: Vec<DepKey> = {
            let current = self.deps.lock();
            previous
                .into_iter()
                .filter(|dep| !current.contains(dep))
                .collect()
        };
        if !stale.is_empty() {
            tracing::trace!(effect = self.id.raw(), stale = stale.len(), "pruning stale dependencies");
            self.runtime.release(self.id, stale);
        }

        self.run_count.fetch_add(1, Ordering::SeqCst);
        result
    }

    fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let deps = std::mem::take(&mut *self.deps.lock());
        self.runtime.release(self.id, deps);
        self.runtime.unregister(self.id);
        tracing::debug!(effect = self.id.raw(), "effect stopped");
    }
}

/// Holds the back-references of the previous run while the body runs and
/// merges them back if the body unwinds, so they can still be released.
struct RestoreOnUnwind<'a> {
    deps: &'a Mutex<IndexSet<DepKey>>,
    previous: Option<IndexSet<DepKey>>,
}

impl RestoreOnUnwind<'_> {
    fn finish(mut self) -> IndexSet<DepKey> {
        self.previous.take().unwrap_or_default()
    }
}

impl Drop for RestoreOnUnwind<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.deps.lock().extend(previous);
        }
    }
}

impl<T> Subscriber for EffectInner<T> {
    fn id(&self) -> EffectId {
        self.id
    }

    fn is_computed(&self) -> bool {
        self.derived
    }

    fn notify(&self) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        match &self.scheduler {
            Some(scheduler) => scheduler(),
            None => {
                self.run();
            }
        }
    }

    fn record(&self, dep: DepKey) {
        self.deps.lock().insert(dep);
    }
}

impl<T> Drop for EffectInner<T> {
    fn drop(&mut self) {
        if !self.stopped.load(Ordering::SeqCst) {
            let deps = std::mem::take(self.deps.get_mut());
            self.runtime.release(self.id, deps);
            self.runtime.unregister(self.id);
        }
    }
}

impl<T> Clone for Effect<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
