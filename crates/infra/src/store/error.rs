use thiserror::Error;

use bakehouse_core::DomainError;

/// Store operation error.
///
/// Infrastructure failures, as opposed to domain errors. Converted into
/// [`DomainError`] at the gateway boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store could not be reached or is in a broken state.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The document changed since it was read (optimistic concurrency).
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    /// The document to update does not exist (anymore).
    #[error("document not found")]
    NotFound,

    /// A unique key (id or name) is already taken.
    #[error("already exists: {0}")]
    AlreadyExists(String),
}

impl StoreError {
    pub fn poisoned() -> Self {
        Self::Unavailable("lock poisoned".to_string())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<StoreError> for DomainError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable(msg) => DomainError::PersistenceUnavailable(msg),
            StoreError::Conflict(msg) => DomainError::Conflict(msg),
            StoreError::NotFound => DomainError::NotFound,
            StoreError::AlreadyExists(name) => DomainError::DuplicateName(name),
        }
    }
}
