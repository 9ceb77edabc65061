use std::sync::Arc;

use thiserror::Error;

use payorflow_batch::Batch;
use payorflow_core::{BatchId, ProfileId};

/// Batch store operation error.
///
/// These are **infrastructure errors**, as opposed to the domain errors raised
/// by the aggregate itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchStoreError {
    #[error("storage error: {0}")]
    Storage(String),

    /// Persisted rows could not be turned back into a batch.
    #[error("corrupt batch record: {0}")]
    Corrupt(String),
}

/// Persistence for `Batch` aggregates.
///
/// `save` is an upsert of the whole aggregate (batch row + every item row).
/// There is no version check: the last writer wins.
pub trait BatchStore: Send + Sync {
    fn find_by_id(&self, batch_id: BatchId) -> Result<Option<Batch>, BatchStoreError>;

    fn save(&self, batch: &Batch) -> Result<(), BatchStoreError>;

    /// All batches owned by a profile, newest first.
    fn find_by_source_profile_id(&self, profile_id: ProfileId) -> Result<Vec<Batch>, BatchStoreError>;
}

impl<S> BatchStore for Arc<S>
where
    S: BatchStore + ?Sized,
{
    fn find_by_id(&self, batch_id: BatchId) -> Result<Option<Batch>, BatchStoreError> {
        (**self).find_by_id(batch_id)
    }

    fn save(&self, batch: &Batch) -> Result<(), BatchStoreError> {
        (**self).save(batch)
    }

    fn find_by_source_profile_id(&self, profile_id: ProfileId) -> Result<Vec<Batch>, BatchStoreError> {
        (**self).find_by_source_profile_id(profile_id)
    }
}
