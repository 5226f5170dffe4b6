//! Dependency Graph
//!
//! This module holds the bookkeeping side of reactivity: which effects read
//! which fields of which sources.
//!
//! # Overview
//!
//! The graph is bipartite:
//!
//! - Sources are refs, computeds and reactive objects, narrowed to a field
//! - Effects are computations that read those fields while running
//!
//! The [`DependencyStore`] keeps the forward edges (field to effects). Each
//! effect keeps the reverse edges itself, so unsubscribing an effect costs
//! O(its subscriptions) instead of a scan over the whole store.

mod node;
mod store;

pub use node::{DepKey, EffectId, FieldKey, SourceId};
pub use store::DependencyStore;
