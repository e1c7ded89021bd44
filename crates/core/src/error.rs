//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// These are the failures a gateway caller sees. Per-bag cascade failures are not part
/// of this enum: they are collected in a cascade report instead of aborting the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. blank base name, price tier for the wrong kind).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A catalog entry with the same kind-prefixed name already exists.
    #[error("an item named '{0}' already exists")]
    DuplicateName(String),

    /// No catalog entry (of either kind) or bag matched the identifier.
    #[error("not found")]
    NotFound,

    /// A conflict occurred (stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store could not be reached; the caller should retry.
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName(name.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::PersistenceUnavailable(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_name_message_names_the_item() {
        let err = DomainError::duplicate_name("Whole Apple");
        assert_eq!(err.to_string(), "an item named 'Whole Apple' already exists");
    }

    #[test]
    fn unavailable_carries_reason() {
        let err = DomainError::unavailable("timeout");
        assert_eq!(err, DomainError::PersistenceUnavailable("timeout".to_string()));
        assert_eq!(err.to_string(), "persistence unavailable: timeout");
    }
}
