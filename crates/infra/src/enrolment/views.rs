//! Read views over batches for status polling.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use payorflow_batch::{Batch, BatchItem, BatchItemStatus, BatchStatus, EnrolmentResult};
use payorflow_core::{AggregateRoot, BatchId, BatchItemId, ProfileId};

/// Full status of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDetail {
    pub batch_id: BatchId,
    pub batch_type: &'static str,
    pub batch_type_display_name: &'static str,
    pub source_profile_id: ProfileId,
    pub status: BatchStatus,
    pub status_display_name: &'static str,
    /// Whether polling can stop.
    pub terminal: bool,
    pub total_items: u32,
    pub success_count: u32,
    pub failed_count: u32,
    pub pending_count: u32,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl From<&Batch> for BatchDetail {
    fn from(batch: &Batch) -> Self {
        Self {
            batch_id: batch.id_typed(),
            batch_type: batch.batch_type().as_str(),
            batch_type_display_name: batch.batch_type().display_name(),
            source_profile_id: batch.source_profile_id(),
            status: batch.status(),
            status_display_name: batch.status().display_name(),
            terminal: batch.is_terminal(),
            total_items: batch.total_items(),
            success_count: batch.success_count(),
            failed_count: batch.failed_count(),
            pending_count: batch.pending_count(),
            created_at: batch.created_at(),
            created_by: batch.created_by().to_string(),
            started_at: batch.started_at(),
            completed_at: batch.completed_at(),
            failure_reason: batch.failure_reason().map(str::to_owned),
        }
    }
}

/// One line of a profile's batch list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub batch_id: BatchId,
    pub batch_type: &'static str,
    pub status: BatchStatus,
    pub status_display_name: &'static str,
    pub total_items: u32,
    pub success_count: u32,
    pub failed_count: u32,
    pub created_at: DateTime<Utc>,
}

impl From<&Batch> for BatchSummary {
    fn from(batch: &Batch) -> Self {
        Self {
            batch_id: batch.id_typed(),
            batch_type: batch.batch_type().as_str(),
            status: batch.status(),
            status_display_name: batch.status().display_name(),
            total_items: batch.total_items(),
            success_count: batch.success_count(),
            failed_count: batch.failed_count(),
            created_at: batch.created_at(),
        }
    }
}

/// One item of a batch, with the business name and result decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemDetail {
    pub batch_item_id: BatchItemId,
    pub sequence_number: u32,
    pub business_name: Option<String>,
    pub status: BatchItemStatus,
    pub status_display_name: &'static str,
    pub result: Option<EnrolmentResult>,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<&BatchItem> for BatchItemDetail {
    fn from(item: &BatchItem) -> Self {
        let business_name = serde_json::from_str::<serde_json::Value>(item.input_data())
            .ok()
            .and_then(|v| v.get("businessName")?.as_str().map(str::to_owned));

        let result = item.result_data().and_then(|raw| {
            serde_json::from_str::<EnrolmentResult>(raw)
                .map_err(|e| {
                    warn!(item_id = %item.id_typed(), error = %e, "failed to parse result data");
                })
                .ok()
        });

        Self {
            batch_item_id: item.id_typed(),
            sequence_number: item.sequence_number(),
            business_name,
            status: item.status(),
            status_display_name: item.status().display_name(),
            result,
            error_message: item.error_message().map(str::to_owned),
            processed_at: item.processed_at(),
        }
    }
}
