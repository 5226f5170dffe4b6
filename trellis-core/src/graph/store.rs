//! Dependency Store
//!
//! Maps each tracked source to its fields, and each field to the ordered set
//! of effects that read it during their most recent run.
//!
//! # Ordering
//!
//! Dependent sets are insertion ordered. Triggering notifies in that order,
//! and removing one effect keeps the relative order of the others, so an
//! effect that keeps reading a field keeps its place in line across re-runs.

use std::collections::HashMap;

use indexmap::IndexSet;

use super::node::{EffectId, FieldKey, SourceId};

/// Forward edges of the dependency graph: `source -> field -> effects`.
#[derive(Debug, Default)]
pub struct DependencyStore {
    sources: HashMap<SourceId, HashMap<FieldKey, IndexSet<EffectId>>>,
}

impl DependencyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `effect` depends on `(source, field)`.
    ///
    /// Entries are created on demand. Returns `true` if the edge is new.
    pub fn subscribe(&mut self, source: SourceId, field: FieldKey, effect: EffectId) -> bool {
        self.sources
            .entry(source)
            .or_default()
            .entry(field)
            .or_default()
            .insert(effect)
    }

    /// Remove the edge from `(source, field)` to `effect`, if any.
    ///
    /// Empty field sets and empty source entries are dropped.
    pub fn unsubscribe(&mut self, source: SourceId, field: &FieldKey, effect: EffectId) -> bool {
        let Some(fields) = self.sources.get_mut(&source) else {
            return false;
        };
        let Some(effects) = fields.get_mut(field) else {
            return false;
        };

        let removed = effects.shift_remove(&effect);
        if effects.is_empty() {
            fields.remove(field);
        }
        if fields.is_empty() {
            self.sources.remove(&source);
        }
        removed
    }

    /// Snapshot the dependents of `(source, field)` in insertion order.
    pub fn dependents(&self, source: SourceId, field: &FieldKey) -> Vec<EffectId> {
        self.sources
            .get(&source)
            .and_then(|fields| fields.get(field))
            .map(|effects| effects.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of effects subscribed to `(source, field)`.
    pub fn dependent_count(&self, source: SourceId, field: &FieldKey) -> usize {
        self.sources
            .get(&source)
            .and_then(|fields| fields.get(field))
            .map_or(0, IndexSet::len)
    }

    /// Check whether `effect` is subscribed to `(source, field)`.
    pub fn contains(&self, source: SourceId, field: &FieldKey, effect: EffectId) -> bool {
        self.sources
            .get(&source)
            .and_then(|fields| fields.get(field))
            .is_some_and(|effects| effects.contains(&effect))
    }

    /// Number of sources with at least one subscribed field.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_is_idempotent() {
        let mut store = DependencyStore::new();
        let source = SourceId::new();
        let effect = EffectId::new();

        assert!(store.subscribe(source, FieldKey::Value, effect));
        assert!(!store.subscribe(source, FieldKey::Value, effect));
        assert_eq!(store.dependent_count(source, &FieldKey::Value), 1);
    }

    #[test]
    fn dependents_keep_insertion_order() {
        let mut store = DependencyStore::new();
        let source = SourceId::new();
        let field = FieldKey::property("count");
        let ids: Vec<_> = (0..4).map(|_| EffectId::new()).collect();

        for id in &ids {
            store.subscribe(source, field.clone(), *id);
        }
        store.unsubscribe(source, &field, ids[1]);

        assert_eq!(store.dependents(source, &field), vec![ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn unsubscribe_prunes_empty_entries() {
        let mut store = DependencyStore::new();
        let source = SourceId::new();
        let effect = EffectId::new();

        store.subscribe(source, FieldKey::Value, effect);
        assert_eq!(store.source_count(), 1);

        assert!(store.unsubscribe(source, &FieldKey::Value, effect));
        assert_eq!(store.source_count(), 0);

        // Removing again is harmless
        assert!(!store.unsubscribe(source, &FieldKey::Value, effect));
    }

    #[test]
    fn missing_entries_have_no_dependents() {
        let store = DependencyStore::new();
        assert!(store.dependents(SourceId::new(), &FieldKey::Value).is_empty());
    }

    #[test]
    fn fields_are_independent() {
        let mut store = DependencyStore::new();
        let source = SourceId::new();
        let a = EffectId::new();
        let b = EffectId::new();

        store.subscribe(source, FieldKey::property("a"), a);
        store.subscribe(source, FieldKey::property("b"), b);

        assert_eq!(store.dependents(source, &FieldKey::property("a")), vec![a]);
        assert!(store.contains(source, &FieldKey::property("b"), b));
        assert!(!store.contains(source, &FieldKey::property("b"), a));
    }
}
