//! Reactive Primitives
//!
//! This module implements the reactive system that drives rendering: refs,
//! reactive objects, computeds, and effects, all connected through a
//! [`Runtime`].
//!
//! # Concepts
//!
//! ## Refs
//!
//! A [`Ref`] is a container for one value. Reading it inside an effect
//! subscribes the effect; writing a different value notifies the effect.
//!
//! ## Reactive Objects
//!
//! A [`Reactive`] wraps an [`Object`] and tracks each property separately,
//! so a write to `a` only re-runs effects that read `a`. Nested objects are
//! wrapped on access.
//!
//! ## Computeds
//!
//! A [`Computed`] is a derived value that caches its result and recomputes
//! only when read after a dependency changed.
//!
//! ## Effects
//!
//! An [`Effect`] is a computation that re-runs (or calls its scheduler)
//! whenever something it read changes. Component rendering is an effect
//! whose scheduler queues a job instead of re-rendering in place.
//!
//! # Implementation Notes
//!
//! Dependencies are recorded per `(source, field)` pair in the runtime's
//! dependency store. Each effect keeps the reverse mapping so it can drop
//! stale subscriptions after a run and all of them when stopped.

mod computed;
mod context;
mod effect;
mod proxy;
mod refs;
mod runtime;
mod subscriber;
mod value;

pub use computed::{Computed, ComputedState};
pub use effect::{Effect, EffectOptions, EffectScheduler};
pub use proxy::Reactive;
pub use refs::Ref;
pub use runtime::Runtime;
pub use value::{Object, Value};
