//! Flat persisted shape of a batch (one row per batch, one row per item).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use payorflow_batch::{
    Batch, BatchItemSnapshot, BatchItemStatus, BatchSnapshot, BatchStatus, BatchType,
};
use payorflow_core::{BatchId, BatchItemId, ProfileId};

use super::r#trait::BatchStoreError;

/// Batch row. Enum columns are stored by their wire names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub batch_id: BatchId,
    pub batch_type: String,
    pub source_profile_id: ProfileId,
    pub status: String,
    pub total_items: u32,
    pub success_count: u32,
    pub failed_count: u32,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

/// Item row, keyed by its own id and linked to the batch row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemRecord {
    pub batch_item_id: BatchItemId,
    pub batch_id: BatchId,
    pub sequence_number: u32,
    pub input_data: String,
    pub status: String,
    pub result_data: Option<String>,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl BatchRecord {
    /// Split an aggregate into its batch row and item rows.
    pub fn from_batch(batch: &Batch) -> (BatchRecord, Vec<BatchItemRecord>) {
        let s = batch.snapshot();
        let items = s
            .items
            .into_iter()
            .map(|i| BatchItemRecord {
                batch_item_id: i.id,
                batch_id: s.id,
                sequence_number: i.sequence_number,
                input_data: i.input_data,
                status: i.status.as_str().to_string(),
                result_data: i.result_data,
                error_message: i.error_message,
                processed_at: i.processed_at,
            })
            .collect();

        let record = BatchRecord {
            batch_id: s.id,
            batch_type: s.batch_type.as_str().to_string(),
            source_profile_id: s.source_profile_id,
            status: s.status.as_str().to_string(),
            total_items: s.total_items,
            success_count: s.success_count,
            failed_count: s.failed_count,
            created_at: s.created_at,
            created_by: s.created_by,
            started_at: s.started_at,
            completed_at: s.completed_at,
            failure_reason: s.failure_reason,
        };

        (record, items)
    }

    /// Rebuild the aggregate from rows, in any item order.
    pub fn into_batch(self, mut items: Vec<BatchItemRecord>) -> Result<Batch, BatchStoreError> {
        let corrupt = |msg: String| BatchStoreError::Corrupt(format!("batch {}: {msg}", self.batch_id));

        if items.len() != self.total_items as usize {
            return Err(corrupt(format!(
                "total_items is {} but {} item rows were found",
                self.total_items,
                items.len()
            )));
        }
        if let Some(foreign) = items.iter().find(|i| i.batch_id != self.batch_id) {
            return Err(corrupt(format!(
                "item {} belongs to batch {}",
                foreign.batch_item_id, foreign.batch_id
            )));
        }

        items.sort_by_key(|i| i.sequence_number);
        let mut snapshots = Vec::with_capacity(items.len());
        for (expected, item) in (1u32..).zip(items) {
            if item.sequence_number != expected {
                return Err(corrupt(format!(
                    "expected sequence number {expected}, found {}",
                    item.sequence_number
                )));
            }
            snapshots.push(BatchItemSnapshot {
                id: item.batch_item_id,
                sequence_number: item.sequence_number,
                status: item.status.parse::<BatchItemStatus>().map_err(|e| corrupt(format!("{e}")))?,
                input_data: item.input_data,
                result_data: item.result_data,
                error_message: item.error_message,
                processed_at: item.processed_at,
            });
        }

        if self.success_count + self.failed_count > self.total_items {
            return Err(corrupt(format!(
                "success_count {} + failed_count {} exceeds total_items {}",
                self.success_count, self.failed_count, self.total_items
            )));
        }
        let rows_with = |status: BatchItemStatus| {
            snapshots.iter().filter(|i| i.status == status).count() as u32
        };
        let success_rows = rows_with(BatchItemStatus::Success);
        let failed_rows = rows_with(BatchItemStatus::Failed);
        if self.success_count > success_rows || self.failed_count > failed_rows {
            return Err(corrupt(format!(
                "counters ({} succeeded, {} failed) exceed finished item rows ({success_rows}, {failed_rows})",
                self.success_count, self.failed_count
            )));
        }

        let snapshot = BatchSnapshot {
            id: self.batch_id,
            batch_type: self.batch_type.parse::<BatchType>().map_err(|e| corrupt(format!("{e}")))?,
            source_profile_id: self.source_profile_id,
            status: self.status.parse::<BatchStatus>().map_err(|e| corrupt(format!("{e}")))?,
            total_items: self.total_items,
            success_count: self.success_count,
            failed_count: self.failed_count,
            items: snapshots,
            created_at: self.created_at,
            created_by: self.created_by,
            started_at: self.started_at,
            completed_at: self.completed_at,
            failure_reason: self.failure_reason,
        };

        Ok(Batch::reconstitute(snapshot))
    }
}
