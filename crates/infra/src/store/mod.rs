//! Persistence seams for catalog entries and bags.
//!
//! The traits describe what the core needs from a document store: per-document atomic
//! writes guarded by a version, and a scan of bags by referenced catalog entry. The
//! in-memory implementations back tests and local development.

pub mod bag;
pub mod catalog;
pub mod error;

pub use bag::{BagStore, InMemoryBagStore};
pub use catalog::{CatalogStore, InMemoryCatalogStore};
pub use error::StoreError;
