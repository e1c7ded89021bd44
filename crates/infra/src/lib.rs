//! Infrastructure layer: stores, the catalog gateway and the bag consistency cascade.

pub mod config;
pub mod coordinator;
pub mod gateway;
pub mod image;
pub mod reconciliation;
pub mod store;


pub use config::CascadeConfig;
pub use coordinator::{CascadeReport, CascadeWriteFailure, ConsistencyCoordinator};
pub use gateway::{CatalogGateway, CatalogListing, CreatedPair, DeletedEntry};
pub use image::{DataUriEncoder, ImageEncoder};
pub use reconciliation::{InMemoryReconciliationLog, ReconciliationIssue, ReconciliationSink};
pub use store::{BagStore, CatalogStore, InMemoryBagStore, InMemoryCatalogStore, StoreError};
