use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bakehouse_catalog::{CatalogEntry, CatalogKind};
use bakehouse_core::{AggregateRoot, CatalogEntryId, ExpectedVersion};

use super::StoreError;

/// Catalog entry persistence, one collection per kind.
///
/// Names are unique within a kind (a unique index in a real store). Every successful
/// write bumps the entry version.
pub trait CatalogStore: Send + Sync {
    fn find(&self, kind: CatalogKind, id: CatalogEntryId) -> Result<Option<CatalogEntry>, StoreError>;

    fn find_by_name(&self, kind: CatalogKind, name: &str) -> Result<Option<CatalogEntry>, StoreError>;

    /// Persist a new entry; returns it with its first version assigned.
    fn insert(&self, entry: CatalogEntry) -> Result<CatalogEntry, StoreError>;

    /// Replace an existing entry if its stored version matches `expected`.
    fn update(
        &self,
        entry: CatalogEntry,
        expected: ExpectedVersion,
    ) -> Result<CatalogEntry, StoreError>;

    /// Remove and return the entry, or `None` if this kind does not hold it.
    fn delete(&self, kind: CatalogKind, id: CatalogEntryId) -> Result<Option<CatalogEntry>, StoreError>;

    /// All entries of a kind in creation order.
    fn list(&self, kind: CatalogKind) -> Result<Vec<CatalogEntry>, StoreError>;
}

impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    fn find(&self, kind: CatalogKind, id: CatalogEntryId) -> Result<Option<CatalogEntry>, StoreError> {
        (**self).find(kind, id)
    }

    fn find_by_name(&self, kind: CatalogKind, name: &str) -> Result<Option<CatalogEntry>, StoreError> {
        (**self).find_by_name(kind, name)
    }

    fn insert(&self, entry: CatalogEntry) -> Result<CatalogEntry, StoreError> {
        (**self).insert(entry)
    }

    fn update(
        &self,
        entry: CatalogEntry,
        expected: ExpectedVersion,
    ) -> Result<CatalogEntry, StoreError> {
        (**self).update(entry, expected)
    }

    fn delete(&self, kind: CatalogKind, id: CatalogEntryId) -> Result<Option<CatalogEntry>, StoreError> {
        (**self).delete(kind, id)
    }

    fn list(&self, kind: CatalogKind) -> Result<Vec<CatalogEntry>, StoreError> {
        (**self).list(kind)
    }
}

type Collection = HashMap<CatalogEntryId, CatalogEntry>;

/// In-memory catalog store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    whole: RwLock<Collection>,
    sliced: RwLock<Collection>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn collection(&self, kind: CatalogKind) -> &RwLock<Collection> {
        match kind {
            CatalogKind::Whole => &self.whole,
            CatalogKind::Sliced => &self.sliced,
        }
    }

    fn name_taken(map: &Collection, name: &str, except: Option<CatalogEntryId>) -> bool {
        map.values()
            .any(|e| e.name() == name && Some(e.id_typed()) != except)
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn find(&self, kind: CatalogKind, id: CatalogEntryId) -> Result<Option<CatalogEntry>, StoreError> {
        let map = self.collection(kind).read().map_err(|_| StoreError::poisoned())?;
        Ok(map.get(&id).cloned())
    }

    fn find_by_name(&self, kind: CatalogKind, name: &str) -> Result<Option<CatalogEntry>, StoreError> {
        let map = self.collection(kind).read().map_err(|_| StoreError::poisoned())?;
        Ok(map.values().find(|e| e.name() == name).cloned())
    }

    fn insert(&self, mut entry: CatalogEntry) -> Result<CatalogEntry, StoreError> {
        let mut map = self
            .collection(entry.kind())
            .write()
            .map_err(|_| StoreError::poisoned())?;

        let id = entry.id_typed();
        if map.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        if Self::name_taken(&map, entry.name(), None) {
            return Err(StoreError::AlreadyExists(entry.name().to_string()));
        }

        entry.mark_persisted(1);
        map.insert(id, entry.clone());
        Ok(entry)
    }

    fn update(
        &self,
        mut entry: CatalogEntry,
        expected: ExpectedVersion,
    ) -> Result<CatalogEntry, StoreError> {
        let mut map = self
            .collection(entry.kind())
            .write()
            .map_err(|_| StoreError::poisoned())?;

        let id = entry.id_typed();
        let current = map.get(&id).ok_or(StoreError::NotFound)?.version();
        if !expected.matches(current) {
            return Err(StoreError::Conflict(format!(
                "catalog entry {id}: expected {expected:?}, found {current}"
            )));
        }
        if Self::name_taken(&map, entry.name(), Some(id)) {
            return Err(StoreError::AlreadyExists(entry.name().to_string()));
        }

        entry.mark_persisted(current + 1);
        map.insert(id, entry.clone());
        Ok(entry)
    }

    fn delete(&self, kind: CatalogKind, id: CatalogEntryId) -> Result<Option<CatalogEntry>, StoreError> {
        let mut map = self.collection(kind).write().map_err(|_| StoreError::poisoned())?;
        Ok(map.remove(&id))
    }

    fn list(&self, kind: CatalogKind) -> Result<Vec<CatalogEntry>, StoreError> {
        let map = self.collection(kind).read().map_err(|_| StoreError::poisoned())?;
        let mut entries: Vec<_> = map.values().cloned().collect();
        entries.sort_by_key(|e| (e.created_at(), e.id_typed()));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bakehouse_catalog::{NewSlicedItem, NewWholeItem, SlicedItem, WholeItem};
    use chrono::Utc;

    fn whole(base: &str) -> CatalogEntry {
        WholeItem::create(base, NewWholeItem::default(), Utc::now())
            .unwrap()
            .into()
    }

    fn sliced(base: &str) -> CatalogEntry {
        SlicedItem::create(base, NewSlicedItem::default(), Utc::now())
            .unwrap()
            .into()
    }

    #[test]
    fn insert_assigns_first_version() {
        let store = InMemoryCatalogStore::new();
        let saved = store.insert(whole("Apple")).unwrap();
        assert_eq!(saved.version(), 1);
        assert_eq!(
            store.find(CatalogKind::Whole, saved.id_typed()).unwrap(),
            Some(saved)
        );
    }

    #[test]
    fn kinds_are_stored_apart() {
        let store = InMemoryCatalogStore::new();
        let saved = store.insert(sliced("Apple")).unwrap();
        assert!(store.find(CatalogKind::Whole, saved.id_typed()).unwrap().is_none());
        assert!(store.find(CatalogKind::Sliced, saved.id_typed()).unwrap().is_some());
    }

    #[test]
    fn insert_rejects_taken_name() {
        let store = InMemoryCatalogStore::new();
        store.insert(whole("Apple")).unwrap();
        let err = store.insert(whole("Apple")).unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists("Whole Apple".to_string()));
    }

    #[test]
    fn find_by_name_matches_full_derived_name() {
        let store = InMemoryCatalogStore::new();
        store.insert(whole("Apple")).unwrap();
        assert!(store.find_by_name(CatalogKind::Whole, "Whole Apple").unwrap().is_some());
        assert!(store.find_by_name(CatalogKind::Whole, "Apple").unwrap().is_none());
        assert!(store.find_by_name(CatalogKind::Sliced, "Whole Apple").unwrap().is_none());
    }

    #[test]
    fn update_with_stale_version_conflicts() {
        let store = InMemoryCatalogStore::new();
        let saved = store.insert(whole("Apple")).unwrap();
        let updated = store.update(saved.clone(), saved.expected_version()).unwrap();
        assert_eq!(updated.version(), 2);

        let err = store.update(saved.clone(), saved.expected_version()).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn update_of_missing_entry_is_not_found() {
        let store = InMemoryCatalogStore::new();
        let err = store.update(whole("Apple"), ExpectedVersion::Any).unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[test]
    fn delete_returns_removed_entry_once() {
        let store = InMemoryCatalogStore::new();
        let saved = store.insert(sliced("Apple")).unwrap();
        assert!(store.delete(CatalogKind::Whole, saved.id_typed()).unwrap().is_none());
        assert_eq!(
            store.delete(CatalogKind::Sliced, saved.id_typed()).unwrap(),
            Some(saved.clone())
        );
        assert!(store.delete(CatalogKind::Sliced, saved.id_typed()).unwrap().is_none());
    }

    #[test]
    fn list_is_in_creation_order() {
        let store = InMemoryCatalogStore::new();
        let t0 = Utc::now();
        let at = |base: &str, secs: i64| -> CatalogEntry {
            WholeItem::create(base, NewWholeItem::default(), t0 + chrono::Duration::seconds(secs))
                .unwrap()
                .into()
        };
        let c = store.insert(at("Cherry", 2)).unwrap();
        let a = store.insert(at("Apple", 0)).unwrap();
        let b = store.insert(at("Banana", 1)).unwrap();
        let ids: Vec<_> = store
            .list(CatalogKind::Whole)
            .unwrap()
            .iter()
            .map(|e| e.id_typed())
            .collect();
        assert_eq!(ids, vec![a.id_typed(), b.id_typed(), c.id_typed()]);
    }
}
