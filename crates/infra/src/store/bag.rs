use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bakehouse_bags::Bag;
use bakehouse_core::{AggregateRoot, BagId, CatalogEntryId, ExpectedVersion};

use super::StoreError;

/// Bag persistence with version-guarded writes.
pub trait BagStore: Send + Sync {
    fn find(&self, id: BagId) -> Result<Option<Bag>, StoreError>;

    /// Every bag holding at least one line for `entry_id`.
    fn find_all_referencing(&self, entry_id: CatalogEntryId) -> Result<Vec<Bag>, StoreError>;

    /// Persist a new bag; returns it with its first version assigned.
    fn insert(&self, bag: Bag) -> Result<Bag, StoreError>;

    /// Replace an existing bag if its stored version matches `expected`.
    fn update(&self, bag: Bag, expected: ExpectedVersion) -> Result<Bag, StoreError>;
}

impl<S> BagStore for Arc<S>
where
    S: BagStore + ?Sized,
{
    fn find(&self, id: BagId) -> Result<Option<Bag>, StoreError> {
        (**self).find(id)
    }

    fn find_all_referencing(&self, entry_id: CatalogEntryId) -> Result<Vec<Bag>, StoreError> {
        (**self).find_all_referencing(entry_id)
    }

    fn insert(&self, bag: Bag) -> Result<Bag, StoreError> {
        (**self).insert(bag)
    }

    fn update(&self, bag: Bag, expected: ExpectedVersion) -> Result<Bag, StoreError> {
        (**self).update(bag, expected)
    }
}

/// In-memory bag store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryBagStore {
    bags: RwLock<HashMap<BagId, Bag>>,
}

impl InMemoryBagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl BagStore for InMemoryBagStore {
    fn find(&self, id: BagId) -> Result<Option<Bag>, StoreError> {
        let bags = self.bags.read().map_err(|_| StoreError::poisoned())?;
        Ok(bags.get(&id).cloned())
    }

    fn find_all_referencing(&self, entry_id: CatalogEntryId) -> Result<Vec<Bag>, StoreError> {
        let bags = self.bags.read().map_err(|_| StoreError::poisoned())?;
        let mut result: Vec<_> = bags
            .values()
            .filter(|b| b.references(entry_id))
            .cloned()
            .collect();
        result.sort_by_key(|b| b.id_typed());
        Ok(result)
    }

    fn insert(&self, mut bag: Bag) -> Result<Bag, StoreError> {
        let mut bags = self.bags.write().map_err(|_| StoreError::poisoned())?;
        let id = bag.id_typed();
        if bags.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        bag.mark_persisted(1);
        bags.insert(id, bag.clone());
        Ok(bag)
    }

    fn update(&self, mut bag: Bag, expected: ExpectedVersion) -> Result<Bag, StoreError> {
        let mut bags = self.bags.write().map_err(|_| StoreError::poisoned())?;
        let id = bag.id_typed();
        let current = bags.get(&id).ok_or(StoreError::NotFound)?.version();
        if !expected.matches(current) {
            return Err(StoreError::Conflict(format!(
                "bag {id}: expected {expected:?}, found {current}"
            )));
        }
        bag.mark_persisted(current + 1);
        bags.insert(id, bag.clone());
        Ok(bag)
    }
}
