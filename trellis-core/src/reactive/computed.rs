//! Computed Implementation
//!
//! A Computed is a cached derived value that re-evaluates only when it is
//! read after one of its dependencies changed.
//!
//! # How Computeds Work
//!
//! 1. The getter runs inside a lazy effect flagged as derived, so its reads
//!    are tracked like any other effect's.
//!
//! 2. When a dependency changes, the effect's scheduler marks the computed
//!    dirty and notifies whoever read the computed. Nothing is recomputed yet.
//!
//! 3. The next read of a dirty computed re-runs the getter and caches the
//!    result. Reads of a clean computed return the cache.
//!
//! Derived effects are notified before plain effects, so an effect that reads
//! both a source and a computed of that source never sees a stale pairing.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::effect::{Effect, EffectOptions};
use super::runtime::Runtime;
use crate::graph::{FieldKey, SourceId};

/// Cache state of a computed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputedState {
    /// The cached value is up-to-date.
    Clean,

    /// A dependency changed, or the getter never ran.
    Dirty,
}

/// A cached derived value.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::Runtime;
///
/// let runtime = Runtime::new();
/// let count = runtime.create_ref(2);
///
/// let source = count.clone();
/// let doubled = runtime.computed(move || source.get() * 2);
///
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Computed<T> {
    inner: Arc<ComputedInner<T>>,
}

struct ComputedInner<T> {
    id: SourceId,
    runtime: Runtime,
    effect: Effect<T>,
    value: RwLock<Option<T>>,
    dirty: AtomicBool,
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a computed value. The getter does not run until the first read.
    pub fn new<F>(runtime: &Runtime, getter: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|weak: &std::sync::Weak<ComputedInner<T>>| {
            let weak = weak.clone();
            let options = EffectOptions::new().lazy().derived().scheduler(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.invalidate();
                }
            });

            ComputedInner {
                id: SourceId::new(),
                runtime: runtime.clone(),
                effect: Effect::with_options(runtime, getter, options),
                value: RwLock::new(None),
                dirty: AtomicBool::new(true),
            }
        });

        Self { inner }
    }

    /// Get the computed's source ID.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Get the value, recomputing first if a dependency changed.
    pub fn get(&self) -> T {
        self.inner.runtime.track(self.inner.id, FieldKey::Value);

        if !self.inner.dirty.swap(false, Ordering::SeqCst) {
            if let Some(value) = self.inner.value.read().clone() {
                return value;
            }
        }

        let value = self.inner.effect.run();
        *self.inner.value.write() = Some(value.clone());
        value
    }

    /// Current cache state.
    pub fn state(&self) -> ComputedState {
        if self.inner.dirty.load(Ordering::SeqCst) {
            ComputedState::Dirty
        } else {
            ComputedState::Clean
        }
    }

    /// Check whether the getter has run at least once.
    pub fn has_value(&self) -> bool {
        self.inner.value.read().is_some()
    }

    /// Stop tracking. The cached value is kept and returned from then on.
    pub fn stop(&self) {
        self.inner.effect.stop();
    }

    /// Number of effects that read this computed.
    pub fn dependent_count(&self) -> usize {
        self.inner
            .runtime
            .dependent_count(self.inner.id, &FieldKey::Value)
    }
}

impl<T> ComputedInner<T> {
    fn invalidate(&self) {
        if !self.dirty.swap(true, Ordering::SeqCst) {
            tracing::trace!(source = self.id.raw(), "computed invalidated");
            self.runtime.trigger(self.id, &FieldKey::Value);
        }
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Computed<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.id)
            .field("dirty", &self.inner.dirty.load(Ordering::SeqCst))
            .field("value", &*self.inner.value.read())
            .finish()
    }
}
