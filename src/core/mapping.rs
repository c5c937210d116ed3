//! Identity mapping between legacy keys and target ids
//!
//! Each entity class has its own dictionary. Entries are write-once: an
//! importer that tries to map the same legacy key twice gets a mapping
//! error instead of silently re-pointing references that were already
//! resolved against the first id.

use crate::domain::{EntityClass, LegacyId, MigrationError, Result, TargetId};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    entries: HashMap<EntityClass, BTreeMap<LegacyId, TargetId>>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new mapping
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Mapping` if the legacy key is already mapped.
    pub fn set(&mut self, class: EntityClass, legacy: LegacyId, target: TargetId) -> Result<()> {
        let entries = self.entries.entry(class).or_default();
        if let Some(existing) = entries.get(&legacy) {
            return Err(MigrationError::Mapping(format!(
                "{class} {legacy} is already mapped to {existing}"
            )));
        }
        entries.insert(legacy, target);
        Ok(())
    }

    pub fn get(&self, class: EntityClass, legacy: &LegacyId) -> Option<TargetId> {
        self.entries
            .get(&class)
            .and_then(|entries| entries.get(legacy))
            .copied()
    }

    pub fn contains(&self, class: EntityClass, legacy: &LegacyId) -> bool {
        self.get(class, legacy).is_some()
    }

    pub fn len(&self, class: EntityClass) -> usize {
        self.entries.get(&class).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(BTreeMap::is_empty)
    }

    /// Entries of one class in legacy key order
    pub fn entries(&self, class: EntityClass) -> Vec<(LegacyId, TargetId)> {
        self.entries
            .get(&class)
            .map(|entries| entries.iter().map(|(l, t)| (l.clone(), *t)).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut map = IdentityMap::new();
        map.set(EntityClass::Clients, LegacyId::from(7), TargetId::new(1))
            .unwrap();

        assert_eq!(
            map.get(EntityClass::Clients, &LegacyId::from(7)),
            Some(TargetId::new(1))
        );
        assert_eq!(map.get(EntityClass::Staff, &LegacyId::from(7)), None);
    }

    #[test]
    fn test_entries_are_write_once() {
        let mut map = IdentityMap::new();
        map.set(EntityClass::Currencies, LegacyId::new("USD").unwrap(), TargetId::new(1))
            .unwrap();

        let err = map
            .set(EntityClass::Currencies, LegacyId::new("USD").unwrap(), TargetId::new(2))
            .unwrap_err();
        assert!(matches!(err, MigrationError::Mapping(_)));
        assert_eq!(
            map.get(EntityClass::Currencies, &LegacyId::new("USD").unwrap()),
            Some(TargetId::new(1))
        );
    }

    #[test]
    fn test_entries_ordered_by_legacy_key() {
        let mut map = IdentityMap::new();
        map.set(EntityClass::Taxes, LegacyId::from(2), TargetId::new(20)).unwrap();
        map.set(EntityClass::Taxes, LegacyId::from(1), TargetId::new(10)).unwrap();

        let entries = map.entries(EntityClass::Taxes);
        assert_eq!(entries[0], (LegacyId::from(1), TargetId::new(10)));
        assert_eq!(map.len(EntityClass::Taxes), 2);
        assert!(!map.is_empty());
    }
}
