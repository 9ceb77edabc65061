//! Phase 2: drive a PENDING batch through its items.

use std::sync::Arc;
use std::thread;

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use payorflow_batch::{Batch, BatchStatus, PayorEnrolmentRequest, PayorOutcome, ProcessorError};
use payorflow_core::{BatchId, BatchItemId, DomainError, ProfileId};

use super::error::EnrolmentError;
use super::service::EnrolmentService;
use crate::batch_store::BatchStore;

/// What one `execute`/`resume` invocation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub batch_id: BatchId,
    /// Status as last saved.
    pub status: BatchStatus,
    /// Items handled by this invocation.
    pub processed: u32,
    pub succeeded: u32,
    pub failed: u32,
    /// Items found stuck IN_PROGRESS. Non-empty means the batch was left IN_PROGRESS.
    pub orphaned: Vec<BatchItemId>,
}

impl ExecutionReport {
    fn new(batch_id: BatchId) -> Self {
        Self {
            batch_id,
            status: BatchStatus::InProgress,
            processed: 0,
            succeeded: 0,
            failed: 0,
            orphaned: Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

enum ItemOutcome {
    Success(String),
    Failed(String),
}

impl<S: BatchStore> EnrolmentService<S> {
    /// Phase 2: process every item of a PENDING batch and finalize it.
    ///
    /// Runs synchronously on the calling thread; see [`spawn_execute`](Self::spawn_execute)
    /// for the fire-and-poll variant.
    #[instrument(skip(self), fields(batch_id = %batch_id), err)]
    pub fn execute(&self, batch_id: BatchId) -> Result<ExecutionReport, EnrolmentError> {
        let mut batch = self.load(batch_id)?;
        batch.start(self.clock.now())?;
        self.store.save(&batch)?;
        info!(total_items = batch.total_items(), "batch started");

        self.drain(&mut batch)
    }

    /// Continue an IN_PROGRESS batch left behind by an interrupted run.
    ///
    /// Only PENDING items are processed. Items still IN_PROGRESS are reported
    /// and keep the batch from completing.
    #[instrument(skip(self), fields(batch_id = %batch_id), err)]
    pub fn resume(&self, batch_id: BatchId) -> Result<ExecutionReport, EnrolmentError> {
        let mut batch = self.load(batch_id)?;
        if batch.status() != BatchStatus::InProgress {
            return Err(DomainError::invalid_state(format!(
                "can only resume IN_PROGRESS batches (batch is {})",
                batch.status()
            ))
            .into());
        }
        info!(pending = batch.pending_count(), "resuming batch");

        self.drain(&mut batch)
    }

    /// Run [`execute`](Self::execute) on a named background thread.
    ///
    /// Progress is observable through [`get_batch`](Self::get_batch) while the
    /// thread runs.
    pub fn spawn_execute(
        self: &Arc<Self>,
        batch_id: BatchId,
    ) -> Result<thread::JoinHandle<Result<ExecutionReport, EnrolmentError>>, EnrolmentError>
    where
        S: 'static,
    {
        let service = Arc::clone(self);
        let name = format!("{}-{}", self.config.executor_thread_name, batch_id);

        thread::Builder::new()
            .name(name)
            .spawn(move || service.execute(batch_id))
            .map_err(|e| EnrolmentError::Spawn(e.to_string()))
    }

    fn drain(&self, batch: &mut Batch) -> Result<ExecutionReport, EnrolmentError> {
        let mut report = ExecutionReport::new(batch.id_typed());
        let profile_id = batch.source_profile_id();
        let actor = batch.created_by().to_string();

        while let Some(item) = batch.next_pending_item() {
            let item_id = item.id_typed();
            let sequence_number = item.sequence_number();
            let input_data = item.input_data().to_string();

            batch.mark_item_in_progress(item_id)?;
            self.store.save(batch)?;

            match self.enrol(profile_id, &input_data, &actor) {
                ItemOutcome::Success(result_data) => {
                    batch.mark_item_success(item_id, result_data, self.clock.now())?;
                    batch.increment_success()?;
                    report.succeeded += 1;
                    debug!(%item_id, sequence_number, "item enrolled");
                }
                ItemOutcome::Failed(message) => {
                    info!(%item_id, sequence_number, reason = %message, "item failed");
                    batch.mark_item_failed(item_id, message, self.clock.now())?;
                    batch.increment_failed()?;
                    report.failed += 1;
                }
            }
            report.processed += 1;
            self.store.save(batch)?;
        }

        report.orphaned = batch.orphaned_items().map(|i| i.id_typed()).collect();
        if report.orphaned.is_empty() {
            batch.complete(self.clock.now())?;
            self.store.save(batch)?;
            info!(
                status = %batch.status(),
                success_count = batch.success_count(),
                failed_count = batch.failed_count(),
                "batch finished"
            );
        } else {
            warn!(
                orphaned = report.orphaned.len(),
                "items left IN_PROGRESS by an earlier run; batch not completed"
            );
        }

        report.status = batch.status();
        Ok(report)
    }

    /// Enrol one stored payload. Every failure mode becomes an item failure.
    fn enrol(&self, profile_id: ProfileId, input_data: &str, actor: &str) -> ItemOutcome {
        let request: PayorEnrolmentRequest = match serde_json::from_str(input_data) {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, "stored payor payload is unreadable");
                return ItemOutcome::Failed(format!("invalid payor data: {e}"));
            }
        };

        match self.processor.process_payor(profile_id, &request, actor) {
            Ok(PayorOutcome::Enrolled(result)) => match serde_json::to_string(&result) {
                Ok(json) => ItemOutcome::Success(json),
                Err(e) => {
                    error!(error = %e, "failed to serialize enrolment result");
                    ItemOutcome::Failed(format!("failed to serialize enrolment result: {e}"))
                }
            },
            Ok(PayorOutcome::Rejected(reason)) => ItemOutcome::Failed(reason),
            Err(fault) => {
                error!(error = %fault, "payor processor fault");
                ItemOutcome::Failed(fault_message(&fault))
            }
        }
    }
}

fn fault_message(fault: &ProcessorError) -> String {
    match fault {
        ProcessorError::Unavailable(msg) | ProcessorError::Fault(msg) => msg.clone(),
    }
}
