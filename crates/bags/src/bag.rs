use serde::{Deserialize, Serialize};

use bakehouse_core::{AggregateRoot, BagId, CatalogEntryId, DomainError, DomainResult, ValueObject};

/// Bag line: catalog reference, quantity and the price snapshot taken at add-time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub catalog_entry_id: CatalogEntryId,
    pub quantity: u32,
    /// Price in smallest currency unit (e.g., cents). Not recomputed on catalog updates.
    pub line_total: u64,
}

impl ValueObject for LineItem {}

impl LineItem {
    pub fn new(catalog_entry_id: CatalogEntryId, quantity: u32, line_total: u64) -> Self {
        Self {
            catalog_entry_id,
            quantity,
            line_total,
        }
    }

    /// Snapshot `quantity * unit_price` into a new line.
    pub fn priced(
        catalog_entry_id: CatalogEntryId,
        quantity: u32,
        unit_price: u64,
    ) -> DomainResult<Self> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let line_total = unit_price
            .checked_mul(u64::from(quantity))
            .ok_or_else(|| DomainError::validation("line total overflows"))?;
        Ok(Self::new(catalog_entry_id, quantity, line_total))
    }

    pub fn references(&self, entry_id: CatalogEntryId) -> bool {
        self.catalog_entry_id == entry_id
    }
}

/// Aggregate root: Bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BagDocument")]
pub struct Bag {
    id: BagId,
    items: Vec<LineItem>,
    total: u64,
    version: u64,
}

/// Stored shape of a bag; checked before it becomes a [`Bag`].
#[derive(Deserialize)]
struct BagDocument {
    id: BagId,
    items: Vec<LineItem>,
    total: u64,
    version: u64,
}

impl TryFrom<BagDocument> for Bag {
    type Error = DomainError;

    fn try_from(doc: BagDocument) -> DomainResult<Self> {
        let sum = Bag::checked_sum(&doc.items)
            .ok_or_else(|| DomainError::invariant("bag total overflows"))?;
        if sum != doc.total {
            return Err(DomainError::invariant(format!(
                "stored bag total {} does not match its lines ({sum})",
                doc.total
            )));
        }
        Ok(Self {
            id: doc.id,
            items: doc.items,
            total: sum,
            version: doc.version,
        })
    }
}

impl Bag {
    pub fn new(id: BagId) -> Self {
        Self {
            id,
            items: Vec::new(),
            total: 0,
            version: 0,
        }
    }

    pub fn with_items(id: BagId, items: impl IntoIterator<Item = LineItem>) -> DomainResult<Self> {
        let mut bag = Self::new(id);
        for item in items {
            bag.add_item(item)?;
        }
        Ok(bag)
    }

    pub fn id_typed(&self) -> BagId {
        self.id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Append a line. Rejected if the bag total would overflow, which keeps every
    /// later recomputation over a subset of the items overflow-free.
    pub fn add_item(&mut self, item: LineItem) -> DomainResult<()> {
        let total = self
            .total
            .checked_add(item.line_total)
            .ok_or_else(|| DomainError::invariant("bag total overflows"))?;
        self.items.push(item);
        self.total = total;
        Ok(())
    }

    pub fn references(&self, entry_id: CatalogEntryId) -> bool {
        self.items.iter().any(|i| i.references(entry_id))
    }

    /// Drop every line pointing at `entry_id` and recompute the total.
    ///
    /// Returns the number of lines removed; the bag is untouched when it is zero.
    pub fn remove_entry(&mut self, entry_id: CatalogEntryId) -> usize {
        let before = self.items.len();
        self.items.retain(|i| !i.references(entry_id));
        let removed = before - self.items.len();
        if removed > 0 {
            self.recompute_total();
        }
        removed
    }

    /// Whether the cached total equals the sum of the current lines.
    pub fn is_consistent(&self) -> bool {
        Self::checked_sum(&self.items) == Some(self.total)
    }

    /// Record the version the store assigned on a successful write.
    pub fn mark_persisted(&mut self, version: u64) {
        self.version = version;
    }

    // Every line got in through `add_item` or a checked document, so a subset of them
    // never saturates.
    fn recompute_total(&mut self) {
        self.total = self
            .items
            .iter()
            .fold(0u64, |acc, i| acc.saturating_add(i.line_total));
    }

    fn checked_sum(items: &[LineItem]) -> Option<u64> {
        items
            .iter()
            .try_fold(0u64, |acc, i| acc.checked_add(i.line_total))
    }
}

impl AggregateRoot for Bag {
    type Id = BagId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
