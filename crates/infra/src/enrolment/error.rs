use thiserror::Error;

use payorflow_batch::ProcessorError;
use payorflow_core::{BatchId, DomainError};

use crate::batch_store::BatchStoreError;

/// Error returned by the enrolment service.
///
/// Rule violations in an import file are not errors (see `ValidationResult`),
/// and neither are per-item enrolment failures: those end up on the item.
#[derive(Debug, Error)]
pub enum EnrolmentError {
    #[error("batch not found: {0}")]
    BatchNotFound(BatchId),

    /// An aggregate precondition was violated (ordering bug or duplicate trigger).
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] BatchStoreError),

    /// An existence lookup failed while validating a file.
    #[error("lookup failed: {0}")]
    Lookup(#[source] ProcessorError),

    #[error("serialization failed: {0}")]
    Serialize(String),

    #[error("failed to spawn executor thread: {0}")]
    Spawn(String),
}

impl EnrolmentError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BatchNotFound(_))
    }

    /// Whether the error is an illegal aggregate transition.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::Domain(e) if e.is_invalid_state())
    }
}
