//! Graph Keys
//!
//! Identifiers for the two kinds of vertices in the dependency graph:
//! sources (things that are read) and effects (things that read them),
//! plus the field key that narrows a read down to one part of a source.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for a tracked source.
///
/// Refs, computeds and reactive objects each get one on creation. Two
/// wrappers around the same object share the object's source ID, which is
/// what gives reactive objects reference identity in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    /// Generate a new unique source ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

/// The part of a source that a read was recorded against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    /// The single synthetic field of a ref or computed.
    Value,

    /// A named property of a reactive object.
    Property(Arc<str>),

    /// The key set of a reactive object. Read by iteration, written by
    /// adding or deleting properties.
    Iterate,
}

impl FieldKey {
    /// Field key for a named property.
    pub fn property(name: &str) -> Self {
        Self::Property(Arc::from(name))
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value => f.write_str("value"),
            Self::Property(name) => write!(f, ".{name}"),
            Self::Iterate => f.write_str("[iterate]"),
        }
    }
}

/// A dependency field: one `(source, field)` pair.
pub type DepKey = (SourceId, FieldKey);
