//! Reactive Objects
//!
//! [`Reactive`] wraps an [`Object`] so that property reads subscribe the
//! running effect to `(object, property)` and property writes notify only
//! the effects that read that property.
//!
//! Wrapping is shallow and lazy. Nested objects are wrapped when they are
//! read through [`Reactive::object`], so deep mutation is observable without
//! walking the whole graph up front.

use std::fmt;

use super::runtime::Runtime;
use super::value::{Object, Value, WriteOutcome};
use crate::graph::{FieldKey, SourceId};

/// Tracked view of an object.
///
/// Two wrappers over the same object are equal and share subscriptions,
/// since tracking is keyed by the object's identity.
#[derive(Clone)]
pub struct Reactive {
    runtime: Runtime,
    target: Object,
}

impl Reactive {
    /// Wrap `target` for tracking in `runtime`.
    pub fn new(runtime: &Runtime, target: Object) -> Self {
        Self {
            runtime: runtime.clone(),
            target,
        }
    }

    /// The wrapped object's identity.
    pub fn id(&self) -> SourceId {
        self.target.id()
    }

    /// The unwrapped object. Reads and writes through it are not tracked.
    pub fn raw(&self) -> &Object {
        &self.target
    }

    /// The runtime this wrapper tracks into.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Read a property.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.runtime.track(self.target.id(), FieldKey::property(key));
        self.target.get(key)
    }

    /// Read a property holding an object, wrapped for tracking.
    pub fn object(&self, key: &str) -> Option<Reactive> {
        match self.get(key)? {
            Value::Object(object) => Some(Reactive::new(&self.runtime, object)),
            _ => None,
        }
    }

    /// Check whether a property exists.
    pub fn has(&self, key: &str) -> bool {
        self.runtime.track(self.target.id(), FieldKey::property(key));
        self.target.contains_key(key)
    }

    /// List property names. Subscribes to additions and deletions.
    pub fn keys(&self) -> Vec<String> {
        self.runtime.track(self.target.id(), FieldKey::Iterate);
        self.target.keys()
    }

    /// Number of properties. Subscribes to additions and deletions.
    pub fn len(&self) -> usize {
        self.runtime.track(self.target.id(), FieldKey::Iterate);
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write a property.
    ///
    /// Only a changed value notifies. A new key also notifies whoever
    /// iterated the keys. Returns whether anything changed.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let outcome = self.target.write(key, value.into());
        match outcome {
            WriteOutcome::Unchanged => false,
            WriteOutcome::Changed => {
                self.runtime.trigger(self.target.id(), &FieldKey::property(key));
                true
            }
            WriteOutcome::Added => {
                self.runtime.trigger(self.target.id(), &FieldKey::property(key));
                self.runtime.trigger(self.target.id(), &FieldKey::Iterate);
                true
            }
        }
    }

    /// Delete a property, returning its value if it existed.
    pub fn delete(&self, key: &str) -> Option<Value> {
        let removed = self.target.remove(key)?;
        self.runtime.trigger(self.target.id(), &FieldKey::property(key));
        self.runtime.trigger(self.target.id(), &FieldKey::Iterate);
        Some(removed)
    }
}

impl PartialEq for Reactive {
    fn eq(&self, other: &Self) -> bool {
        self.target.ptr_eq(&other.target)
    }
}

impl From<Reactive> for Value {
    fn from(reactive: Reactive) -> Self {
        Value::Object(reactive.target)
    }
}

impl From<&Reactive> for Value {
    fn from(reactive: &Reactive) -> Self {
        Value::Object(reactive.target.clone())
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reactive").field(&self.target).finish()
    }
}
