use std::sync::Arc;

use tracing::{info, instrument, warn};

use payorflow_batch::{
    Batch, BatchItemStatus, BatchType, PayorEnrolmentProcessor, PayorValidation, ValidationResult,
    validate_payors,
};
use payorflow_core::{BatchId, Clock, ProfileId, SystemClock};

use super::error::EnrolmentError;
use super::views::{BatchDetail, BatchItemDetail, BatchSummary};
use crate::batch_store::BatchStore;
use crate::config::EnrolmentConfig;

/// Application service for payor enrolment batches.
///
/// Two phases, triggered separately by the caller:
/// 1. [`validate`](Self::validate) checks a file and, only if it is entirely
///    valid, persists a PENDING batch with one item per record.
/// 2. [`execute`](Self::execute) drives that batch to a terminal status
///    (see `executor.rs`).
pub struct EnrolmentService<S> {
    pub(super) store: S,
    pub(super) processor: Arc<dyn PayorEnrolmentProcessor>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: EnrolmentConfig,
}

impl<S: BatchStore> EnrolmentService<S> {
    pub fn new(store: S, processor: Arc<dyn PayorEnrolmentProcessor>) -> Self {
        Self {
            store,
            processor,
            clock: Arc::new(SystemClock),
            config: EnrolmentConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: EnrolmentConfig) -> Self {
        self.config = config;
        self
    }

    /// Phase 1: validate an import file and create a PENDING batch if it is valid.
    ///
    /// Invalid files produce `Ok` with `valid == false` and no persisted state.
    #[instrument(
        skip(self, raw_input),
        fields(source_profile_id = %source_profile_id, requested_by = %requested_by),
        err
    )]
    pub fn validate(
        &self,
        source_profile_id: ProfileId,
        raw_input: &str,
        requested_by: &str,
    ) -> Result<ValidationResult, EnrolmentError> {
        let validation = validate_payors(
            source_profile_id,
            raw_input,
            self.config.max_payors_per_file,
            self.processor.as_ref(),
        )
        .map_err(EnrolmentError::Lookup)?;

        let payors = match validation {
            PayorValidation::Valid(payors) => payors,
            PayorValidation::Invalid { payor_count, errors } => {
                info!(payor_count, error_count = errors.len(), "import file rejected");
                return Ok(ValidationResult::failure(payor_count, errors));
            }
        };

        let mut batch = Batch::create(
            BatchType::PayorEnrolment,
            source_profile_id,
            requested_by,
            self.clock.now(),
        )?;
        for payor in &payors {
            let input_data =
                serde_json::to_string(payor).map_err(|e| EnrolmentError::Serialize(e.to_string()))?;
            batch.add_item(input_data)?;
        }
        self.store.save(&batch)?;

        info!(batch_id = %batch.id_typed(), payor_count = payors.len(), "batch created");
        Ok(ValidationResult::success(payors.len(), batch.id_typed()))
    }

    pub fn get_batch(&self, batch_id: BatchId) -> Result<Option<Batch>, EnrolmentError> {
        Ok(self.store.find_by_id(batch_id)?)
    }

    pub fn list_batches_by_profile(&self, profile_id: ProfileId) -> Result<Vec<Batch>, EnrolmentError> {
        Ok(self.store.find_by_source_profile_id(profile_id)?)
    }

    pub fn batch_detail(&self, batch_id: BatchId) -> Result<Option<BatchDetail>, EnrolmentError> {
        Ok(self.get_batch(batch_id)?.as_ref().map(BatchDetail::from))
    }

    pub fn batch_summaries(&self, profile_id: ProfileId) -> Result<Vec<BatchSummary>, EnrolmentError> {
        Ok(self
            .list_batches_by_profile(profile_id)?
            .iter()
            .map(BatchSummary::from)
            .collect())
    }

    /// Items of a batch in sequence order, optionally filtered by status name
    /// (any letter case, e.g. `failed`).
    pub fn batch_items(
        &self,
        batch_id: BatchId,
        status: Option<&str>,
    ) -> Result<Vec<BatchItemDetail>, EnrolmentError> {
        let filter = status.map(str::parse::<BatchItemStatus>).transpose()?;
        let batch = self.load(batch_id)?;

        Ok(batch
            .items()
            .iter()
            .filter(|i| filter.is_none_or(|s| i.status() == s))
            .map(BatchItemDetail::from)
            .collect())
    }

    /// Force a batch to FAILED (administrative escape hatch).
    ///
    /// Works from PENDING or IN_PROGRESS; already SUCCESS/FAILED items are kept.
    #[instrument(skip(self), fields(batch_id = %batch_id), err)]
    pub fn fail_batch(&self, batch_id: BatchId, reason: &str) -> Result<Batch, EnrolmentError> {
        let mut batch = self.load(batch_id)?;
        batch.fail(reason, self.clock.now())?;
        self.store.save(&batch)?;
        warn!(reason, "batch force-failed");
        Ok(batch)
    }

    pub(super) fn load(&self, batch_id: BatchId) -> Result<Batch, EnrolmentError> {
        self.store
            .find_by_id(batch_id)?
            .ok_or(EnrolmentError::BatchNotFound(batch_id))
    }
}
