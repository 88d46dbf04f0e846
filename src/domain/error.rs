//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent business rule violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("combo validation failed: {0}")]
    Validation(String),

    #[error("duplicate size {size:?} on item {item}")]
    DuplicateSize { item: String, size: String },

    #[error("no tree loaded")]
    NoTree,
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
