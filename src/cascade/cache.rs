//! Memoized resolution state, keyed by object.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cascade::details::MarkupDetails;
use crate::graph::{ContainerId, RelationId};
use crate::partition::Unit;
use crate::pointer::Pointer;
use crate::relation::EndRef;

/// Identity of a resolvable object: a unit of a container's partitioned
/// content, a container, or a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKey {
    Unit { container: ContainerId, index: u32 },
    Container(ContainerId),
    Relation(RelationId),
}

impl ObjectKey {
    /// Key of the `index`-th unit of `container`.
    ///
    /// Unit indexes are stored as `u32`; an index past `u32::MAX` saturates
    /// and names no unit, so it resolves empty.
    #[must_use]
    pub fn unit(container: ContainerId, index: usize) -> Self {
        Self::Unit {
            container,
            index: u32::try_from(index).unwrap_or(u32::MAX),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit { container, index } => write!(f, "{container}/U{index}"),
            Self::Container(c) => write!(f, "{c}"),
            Self::Relation(r) => write!(f, "{r}"),
        }
    }
}

/// Resolution results owned by one resolver.
///
/// An object is registered (as pending) before any of its inheritance
/// sources are visited, so a cycle back to it reads the pending entry.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<ObjectKey, MarkupDetails>,
    units: HashMap<ContainerId, Arc<[Unit]>>,
    targets: HashMap<ContainerId, Arc<[(EndRef, Pointer)]>>,
}

impl ResolutionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` as pending. Returns false when it was already known.
    pub(crate) fn register(&mut self, key: ObjectKey) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, MarkupDetails::pending());
        true
    }

    pub(crate) fn complete(&mut self, key: ObjectKey, details: MarkupDetails) {
        self.entries.insert(key, details);
    }

    pub(crate) fn get_or_pending(&mut self, key: ObjectKey) -> &MarkupDetails {
        self.entries.entry(key).or_insert_with(MarkupDetails::pending)
    }

    #[must_use]
    pub fn get(&self, key: ObjectKey) -> Option<&MarkupDetails> {
        self.entries.get(&key)
    }

    #[must_use]
    pub fn contains(&self, key: ObjectKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every cached key, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<ObjectKey> {
        let mut keys: Vec<ObjectKey> = self.entries.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub(crate) fn units(&self, container: ContainerId) -> Option<Arc<[Unit]>> {
        self.units.get(&container).cloned()
    }

    pub(crate) fn store_units(&mut self, container: ContainerId, units: Vec<Unit>) -> Arc<[Unit]> {
        let units: Arc<[Unit]> = units.into();
        self.units.insert(container, Arc::clone(&units));
        units
    }

    pub(crate) fn targets(&self, container: ContainerId) -> Option<Arc<[(EndRef, Pointer)]>> {
        self.targets.get(&container).cloned()
    }

    pub(crate) fn store_targets(
        &mut self,
        container: ContainerId,
        targets: Vec<(EndRef, Pointer)>,
    ) -> Arc<[(EndRef, Pointer)]> {
        let targets: Arc<[(EndRef, Pointer)]> = targets.into();
        self.targets.insert(container, Arc::clone(&targets));
        targets
    }

    /// Drops every cached result.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.units.clear();
        self.targets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let mut cache = ResolutionCache::new();
        let key = ObjectKey::Container(ContainerId::from_raw(0));
        assert!(cache.register(key));
        assert!(!cache.register(key));
        assert_eq!(cache.len(), 1);
        assert!(!cache.get(key).unwrap().is_complete());
    }

    #[test]
    fn keys_are_sorted() {
        let mut cache = ResolutionCache::new();
        let c = ContainerId::from_raw(1);
        cache.register(ObjectKey::Container(c));
        cache.register(ObjectKey::unit(c, 2));
        cache.register(ObjectKey::unit(c, 0));
        assert_eq!(
            cache.keys(),
            vec![ObjectKey::unit(c, 0), ObjectKey::unit(c, 2), ObjectKey::Container(c)]
        );
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn oversized_unit_index_saturates() {
        let c = ContainerId::from_raw(0);
        assert_eq!(
            ObjectKey::unit(c, usize::MAX),
            ObjectKey::Unit {
                container: c,
                index: u32::MAX
            }
        );
        assert_eq!(ObjectKey::unit(c, 7), ObjectKey::Unit { container: c, index: 7 });
    }

    #[test]
    fn display_names_objects() {
        let c = ContainerId::from_raw(3);
        assert_eq!(ObjectKey::unit(c, 1).to_string(), "C3/U1");
        assert_eq!(ObjectKey::Relation(RelationId::from_raw(7)).to_string(), "R7");
    }
}
