//! Catalog domain module.
//!
//! Whole items and sliced items of the same menu entry, modelled as one tagged union.
//! Pure domain logic: naming, pricing tiers and partial updates. Storage lives in
//! `bakehouse-infra`.

pub mod entry;
pub mod patch;

pub use entry::{CatalogEntry, CatalogKind, NewSlicedItem, NewWholeItem, SlicedItem, WholeItem};
pub use patch::CatalogEntryPatch;
