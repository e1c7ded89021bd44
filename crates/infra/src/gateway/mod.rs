//! Catalog mutation gateway.
//!
//! Entry point for catalog writes and reads. Enforces the catalog invariants that need
//! a store round-trip (name uniqueness, existence) and hands deletions to the
//! [`ConsistencyCoordinator`] before returning.

pub mod listing;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use bakehouse_catalog::{
    CatalogEntry, CatalogEntryPatch, CatalogKind, NewSlicedItem, NewWholeItem, SlicedItem,
    WholeItem,
};
use bakehouse_core::{AggregateRoot, CatalogEntryId, DomainError, DomainResult};

use crate::coordinator::{CascadeReport, ConsistencyCoordinator};
use crate::image::{DataUriEncoder, ImageEncoder};
use crate::reconciliation::ReconciliationSink;
use crate::store::{BagStore, CatalogStore, StoreError};

pub use listing::{CatalogListing, SlicedItemView, WholeItemView};

/// Both halves of a freshly created menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedPair {
    pub whole: WholeItem,
    pub sliced: SlicedItem,
}

/// Result of a catalog deletion. The deletion itself always stands; `cascade` tells
/// which bags were brought in line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedEntry {
    pub id: CatalogEntryId,
    pub kind: CatalogKind,
    pub name: String,
    pub cascade: CascadeReport,
}

#[derive(Debug)]
pub struct CatalogGateway<C, B, R, E = DataUriEncoder> {
    catalog: C,
    coordinator: ConsistencyCoordinator<B, R>,
    encoder: E,
}

impl<C, B, R, E> CatalogGateway<C, B, R, E>
where
    C: CatalogStore,
    B: BagStore,
    R: ReconciliationSink,
    E: ImageEncoder,
{
    pub fn new(catalog: C, coordinator: ConsistencyCoordinator<B, R>, encoder: E) -> Self {
        Self {
            catalog,
            coordinator,
            encoder,
        }
    }

    pub fn coordinator(&self) -> &ConsistencyCoordinator<B, R> {
        &self.coordinator
    }

    /// Create the whole and sliced entries for `base_name` together.
    ///
    /// If the sliced write fails after the whole write succeeded, the whole entry is
    /// deleted again so no half pair is left behind.
    #[instrument(skip_all, fields(base_name = %base_name))]
    pub fn create_pair(
        &self,
        base_name: &str,
        whole: NewWholeItem,
        sliced: NewSlicedItem,
    ) -> DomainResult<CreatedPair> {
        let now = Utc::now();
        let whole = WholeItem::create(base_name, whole, now)?;
        let sliced = SlicedItem::create(base_name, sliced, now)?;

        for (kind, name) in [
            (CatalogKind::Whole, &whole.name),
            (CatalogKind::Sliced, &sliced.name),
        ] {
            if self.catalog.find_by_name(kind, name)?.is_some() {
                return Err(DomainError::duplicate_name(name.clone()));
            }
        }

        let whole = self
            .catalog
            .insert(whole.into())?
            .into_whole()
            .ok_or_else(|| DomainError::invariant("store returned a non-whole entry"))?;

        let sliced = match self.catalog.insert(sliced.into()) {
            Ok(entry) => entry
                .into_sliced()
                .ok_or_else(|| DomainError::invariant("store returned a non-sliced entry"))?,
            Err(e) => {
                self.compensate_pair(whole.id);
                return Err(e.into());
            }
        };

        info!(whole_id = %whole.id, sliced_id = %sliced.id, "catalog pair created");
        Ok(CreatedPair { whole, sliced })
    }

    fn compensate_pair(&self, whole_id: CatalogEntryId) {
        match self.catalog.delete(CatalogKind::Whole, whole_id) {
            Ok(_) => warn!(whole_id = %whole_id, "sliced write failed; whole entry rolled back"),
            Err(e) => error!(
                whole_id = %whole_id,
                error = %e,
                "sliced write failed and whole entry could not be rolled back"
            ),
        }
    }

    /// Apply `patch` (and `image`, if given) to the entry with this id.
    ///
    /// Bags are not touched: their line totals are snapshots taken at add-time.
    #[instrument(skip_all, fields(entry_id = %id))]
    pub fn update(
        &self,
        id: CatalogEntryId,
        patch: CatalogEntryPatch,
        image: Option<Vec<u8>>,
    ) -> DomainResult<CatalogEntry> {
        let max_attempts = self.coordinator.config().max_write_attempts.max(1);
        let mut attempt = 1;
        loop {
            let mut entry = self.find_entry(id)?.ok_or(DomainError::NotFound)?;
            let kind = entry.kind();

            if let Some(base) = &patch.base_name {
                let name = kind.derive_name(base);
                if let Some(other) = self.catalog.find_by_name(kind, &name)? {
                    if other.id_typed() != id {
                        return Err(DomainError::duplicate_name(name));
                    }
                }
            }

            entry.apply_patch(&patch, image.clone(), Utc::now())?;
            let expected = entry.expected_version();
            match self.catalog.update(entry, expected) {
                Ok(saved) => {
                    info!(kind = %kind, version = saved.version(), "catalog entry updated");
                    return Ok(saved);
                }
                Err(e @ StoreError::Conflict(_)) if attempt < max_attempts => {
                    warn!(attempt, error = %e, "concurrent catalog update; retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Remove the entry, then strip it from every bag before returning.
    ///
    /// Per-bag cascade failures do not fail the call; they are in the returned report
    /// and were already handed to the reconciliation sink.
    #[instrument(skip_all, fields(entry_id = %id))]
    pub fn delete(&self, id: CatalogEntryId) -> DomainResult<DeletedEntry> {
        let mut deleted = None;
        for kind in CatalogKind::LOOKUP_ORDER {
            if let Some(entry) = self.catalog.delete(kind, id)? {
                deleted = Some(entry);
                break;
            }
        }
        let entry = deleted.ok_or(DomainError::NotFound)?;
        info!(kind = %entry.kind(), name = entry.name(), "catalog entry deleted");

        let cascade = self.coordinator.on_catalog_entry_deleted(id)?;
        if !cascade.is_complete() {
            warn!(
                failed = cascade.failures.len(),
                "entry deleted but some bags still reference it"
            );
        }

        Ok(DeletedEntry {
            id,
            kind: entry.kind(),
            name: entry.name().to_string(),
            cascade,
        })
    }

    pub fn get_by_id(&self, id: CatalogEntryId) -> DomainResult<CatalogEntry> {
        self.find_entry(id)?.ok_or(DomainError::NotFound)
    }

    pub fn list(&self) -> DomainResult<CatalogListing> {
        let whole_items = self
            .catalog
            .list(CatalogKind::Whole)?
            .iter()
            .filter_map(CatalogEntry::as_whole)
            .map(|item| WholeItemView::new(item, &self.encoder))
            .collect();
        let sliced_items = self
            .catalog
            .list(CatalogKind::Sliced)?
            .iter()
            .filter_map(CatalogEntry::as_sliced)
            .map(|item| SlicedItemView::new(item, &self.encoder))
            .collect();

        Ok(CatalogListing {
            whole_items,
            sliced_items,
        })
    }

    fn find_entry(&self, id: CatalogEntryId) -> Result<Option<CatalogEntry>, StoreError> {
        for kind in CatalogKind::LOOKUP_ORDER {
            if let Some(entry) = self.catalog.find(kind, id)? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}
