//! Subscriber seam between the runtime and effects.
//!
//! The runtime only sees effects through this trait, which lets effects
//! with different result types share one registry.

use crate::graph::{DepKey, EffectId};

/// A computation that can be notified when a field it read changes.
pub(crate) trait Subscriber: Send + Sync {
    /// The subscriber's identity in the dependency store.
    fn id(&self) -> EffectId;

    /// Whether this subscriber backs a derived value. Derived subscribers
    /// are notified before plain ones.
    fn is_computed(&self) -> bool;

    /// React to a change: call the scheduler if one is set, otherwise run.
    fn notify(&self);

    /// Record a back-reference to a field read during the current run.
    fn record(&self, dep: DepKey);
}
