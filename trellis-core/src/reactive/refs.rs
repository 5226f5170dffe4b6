//! Tracked Value Containers
//!
//! A [`Ref`] holds one value. Reads inside an effect subscribe that effect;
//! writes of a different value notify the subscribers.
//!
//! A ref is tracked under a single synthetic field ([`FieldKey::Value`]),
//! not per property: replacing the value is the only change it reports.
//! For per-property tracking of an object, wrap the object with
//! [`Reactive`] or go through [`Ref::reactive`].

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::proxy::Reactive;
use super::runtime::Runtime;
use super::value::Value;
use crate::graph::{FieldKey, SourceId};

/// A tracked value container.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::Runtime;
///
/// let runtime = Runtime::new();
/// let count = runtime.create_ref(0);
///
/// assert!(count.set(5));
/// assert!(!count.set(5)); // same value, nobody is notified
/// assert_eq!(count.get(), 5);
/// ```
pub struct Ref<T> {
    inner: Arc<RefInner<T>>,
}

struct RefInner<T> {
    id: SourceId,
    runtime: Runtime,
    value: RwLock<T>,
}

impl<T> Ref<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new ref with the given initial value.
    pub fn new(runtime: &Runtime, value: T) -> Self {
        Self {
            inner: Arc::new(RefInner {
                id: SourceId::new(),
                runtime: runtime.clone(),
                value: RwLock::new(value),
            }),
        }
    }

    /// Get the ref's source ID.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Get the current value, subscribing the running effect.
    pub fn get(&self) -> T {
        self.inner.runtime.track(self.inner.id, FieldKey::Value);
        self.get_untracked()
    }

    /// Get the current value without establishing a dependency.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the current value, subscribing the running effect.
    ///
    /// The value stays read-locked while `f` runs, so `f` must not write
    /// this ref.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.runtime.track(self.inner.id, FieldKey::Value);
        f(&*self.inner.value.read())
    }

    /// Store a new value and notify dependents.
    ///
    /// Returns `false`, and notifies nobody, when the value is unchanged.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.write();
            if *current == value {
                return false;
            }
            *current = value;
        }

        self.inner.runtime.trigger(self.inner.id, &FieldKey::Value);
        true
    }

    /// Compute the next value from the current one and store it.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let current = self.inner.value.read();
            f(&current)
        };
        self.set(next)
    }

    /// Notify dependents without changing the value.
    pub fn trigger(&self) {
        self.inner.runtime.trigger(self.inner.id, &FieldKey::Value);
    }

    /// Number of effects subscribed to this ref.
    pub fn dependent_count(&self) -> usize {
        self.inner
            .runtime
            .dependent_count(self.inner.id, &FieldKey::Value)
    }
}

impl Ref<Value> {
    /// Tracked wrapper around the current value, if it is an object.
    ///
    /// The wrapper follows the value: after `set` stores a different object,
    /// the next call wraps that one.
    pub fn reactive(&self) -> Option<Reactive> {
        match self.get() {
            Value::Object(object) => Some(Reactive::new(&self.inner.runtime, object)),
            _ => None,
        }
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Ref<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.read())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
