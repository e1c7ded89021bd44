//! `bakehouse-core`: shared domain building blocks.
//!
//! Identifiers, the domain error model and optimistic-concurrency primitives used by the
//! catalog and bag crates. Nothing here performs IO.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{BagId, CatalogEntryId};
pub use value_object::ValueObject;
