use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use payorflow_core::{AggregateRoot, BatchId, BatchItemId, DomainError, DomainResult, ProfileId};

/// Kind of bulk operation a batch performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchType {
    PayorEnrolment,
}

impl BatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchType::PayorEnrolment => "PAYOR_ENROLMENT",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BatchType::PayorEnrolment => "Payor Enrolment",
        }
    }
}

impl FromStr for BatchType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAYOR_ENROLMENT" => Ok(BatchType::PayorEnrolment),
            other => Err(DomainError::validation(format!("unknown batch type: {other}"))),
        }
    }
}

/// Batch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Pending,
    InProgress,
    Completed,
    CompletedWithErrors,
    Failed,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::CompletedWithErrors | BatchStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "PENDING",
            BatchStatus::InProgress => "IN_PROGRESS",
            BatchStatus::Completed => "COMPLETED",
            BatchStatus::CompletedWithErrors => "COMPLETED_WITH_ERRORS",
            BatchStatus::Failed => "FAILED",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "Pending",
            BatchStatus::InProgress => "In Progress",
            BatchStatus::Completed => "Completed",
            BatchStatus::CompletedWithErrors => "Completed with Errors",
            BatchStatus::Failed => "Failed",
        }
    }
}

impl core::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BatchStatus::Pending),
            "IN_PROGRESS" => Ok(BatchStatus::InProgress),
            "COMPLETED" => Ok(BatchStatus::Completed),
            "COMPLETED_WITH_ERRORS" => Ok(BatchStatus::CompletedWithErrors),
            "FAILED" => Ok(BatchStatus::Failed),
            other => Err(DomainError::validation(format!("unknown batch status: {other}"))),
        }
    }
}

/// Line item lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchItemStatus {
    Pending,
    InProgress,
    Success,
    Failed,
}

impl BatchItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchItemStatus::Success | BatchItemStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchItemStatus::Pending => "PENDING",
            BatchItemStatus::InProgress => "IN_PROGRESS",
            BatchItemStatus::Success => "SUCCESS",
            BatchItemStatus::Failed => "FAILED",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BatchItemStatus::Pending => "Pending",
            BatchItemStatus::InProgress => "In Progress",
            BatchItemStatus::Success => "Success",
            BatchItemStatus::Failed => "Failed",
        }
    }
}

impl core::fmt::Display for BatchItemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchItemStatus {
    type Err = DomainError;

    /// Accepts the wire name in any letter case (`success`, `SUCCESS`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(BatchItemStatus::Pending),
            "IN_PROGRESS" => Ok(BatchItemStatus::InProgress),
            "SUCCESS" => Ok(BatchItemStatus::Success),
            "FAILED" => Ok(BatchItemStatus::Failed),
            _ => Err(DomainError::validation(format!("unknown batch item status: {s}"))),
        }
    }
}

/// One line record of a batch.
///
/// Only the owning [`Batch`] can change an item; outside code gets `&BatchItem`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    id: BatchItemId,
    sequence_number: u32,
    input_data: String,
    status: BatchItemStatus,
    result_data: Option<String>,
    error_message: Option<String>,
    processed_at: Option<DateTime<Utc>>,
}

impl BatchItem {
    fn new(sequence_number: u32, input_data: String) -> Self {
        Self {
            id: BatchItemId::new(),
            sequence_number,
            input_data,
            status: BatchItemStatus::Pending,
            result_data: None,
            error_message: None,
            processed_at: None,
        }
    }

    pub fn id_typed(&self) -> BatchItemId {
        self.id
    }

    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    pub fn input_data(&self) -> &str {
        &self.input_data
    }

    pub fn status(&self) -> BatchItemStatus {
        self.status
    }

    pub fn result_data(&self) -> Option<&str> {
        self.result_data.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    fn mark_in_progress(&mut self) -> DomainResult<()> {
        if self.status != BatchItemStatus::Pending {
            return Err(DomainError::invalid_state(format!(
                "can only start processing PENDING items (item {} is {})",
                self.sequence_number, self.status
            )));
        }
        self.status = BatchItemStatus::InProgress;
        Ok(())
    }

    fn mark_success(&mut self, result_data: String, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status != BatchItemStatus::InProgress {
            return Err(DomainError::invalid_state(format!(
                "can only mark IN_PROGRESS items as success (item {} is {})",
                self.sequence_number, self.status
            )));
        }
        self.status = BatchItemStatus::Success;
        self.result_data = Some(result_data);
        self.processed_at = Some(at);
        Ok(())
    }

    fn mark_failed(&mut self, error_message: String, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status != BatchItemStatus::InProgress {
            return Err(DomainError::invalid_state(format!(
                "can only mark IN_PROGRESS items as failed (item {} is {})",
                self.sequence_number, self.status
            )));
        }
        self.status = BatchItemStatus::Failed;
        self.error_message = Some(error_message);
        self.processed_at = Some(at);
        Ok(())
    }
}

/// Persisted state of a batch, as handed to [`Batch::reconstitute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSnapshot {
    pub id: BatchId,
    pub batch_type: BatchType,
    pub source_profile_id: ProfileId,
    pub status: BatchStatus,
    pub total_items: u32,
    pub success_count: u32,
    pub failed_count: u32,
    pub items: Vec<BatchItemSnapshot>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

/// Persisted state of one batch item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemSnapshot {
    pub id: BatchItemId,
    pub sequence_number: u32,
    pub input_data: String,
    pub status: BatchItemStatus,
    pub result_data: Option<String>,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Aggregate root: one bulk-enrolment run and its line items.
///
/// Invariants kept by every operation:
/// - `total_items == items.len()`
/// - `success_count + failed_count <= total_items`
/// - sequence numbers are `1..=total_items` in insertion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    id: BatchId,
    batch_type: BatchType,
    source_profile_id: ProfileId,
    status: BatchStatus,
    total_items: u32,
    success_count: u32,
    failed_count: u32,
    items: Vec<BatchItem>,
    created_at: DateTime<Utc>,
    created_by: String,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
}

impl Batch {
    /// Create a new, empty PENDING batch.
    pub fn create(
        batch_type: BatchType,
        source_profile_id: ProfileId,
        created_by: impl Into<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let created_by = created_by.into();
        if created_by.trim().is_empty() {
            return Err(DomainError::validation("created_by cannot be empty"));
        }

        Ok(Self {
            id: BatchId::new(),
            batch_type,
            source_profile_id,
            status: BatchStatus::Pending,
            total_items: 0,
            success_count: 0,
            failed_count: 0,
            items: Vec::new(),
            created_at: at,
            created_by,
            started_at: None,
            completed_at: None,
            failure_reason: None,
        })
    }

    /// Rehydrate a batch from persisted state without re-running creation checks.
    pub fn reconstitute(snapshot: BatchSnapshot) -> Self {
        let items = snapshot
            .items
            .into_iter()
            .map(|i| BatchItem {
                id: i.id,
                sequence_number: i.sequence_number,
                input_data: i.input_data,
                status: i.status,
                result_data: i.result_data,
                error_message: i.error_message,
                processed_at: i.processed_at,
            })
            .collect();

        Self {
            id: snapshot.id,
            batch_type: snapshot.batch_type,
            source_profile_id: snapshot.source_profile_id,
            status: snapshot.status,
            total_items: snapshot.total_items,
            success_count: snapshot.success_count,
            failed_count: snapshot.failed_count,
            items,
            created_at: snapshot.created_at,
            created_by: snapshot.created_by,
            started_at: snapshot.started_at,
            completed_at: snapshot.completed_at,
            failure_reason: snapshot.failure_reason,
        }
    }

    /// Export the full state for persistence.
    pub fn snapshot(&self) -> BatchSnapshot {
        BatchSnapshot {
            id: self.id,
            batch_type: self.batch_type,
            source_profile_id: self.source_profile_id,
            status: self.status,
            total_items: self.total_items,
            success_count: self.success_count,
            failed_count: self.failed_count,
            items: self
                .items
                .iter()
                .map(|i| BatchItemSnapshot {
                    id: i.id,
                    sequence_number: i.sequence_number,
                    input_data: i.input_data.clone(),
                    status: i.status,
                    result_data: i.result_data.clone(),
                    error_message: i.error_message.clone(),
                    processed_at: i.processed_at,
                })
                .collect(),
            created_at: self.created_at,
            created_by: self.created_by.clone(),
            started_at: self.started_at,
            completed_at: self.completed_at,
            failure_reason: self.failure_reason.clone(),
        }
    }

    pub fn id_typed(&self) -> BatchId {
        self.id
    }

    pub fn batch_type(&self) -> BatchType {
        self.batch_type
    }

    pub fn source_profile_id(&self) -> ProfileId {
        self.source_profile_id
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn total_items(&self) -> u32 {
        self.total_items
    }

    pub fn success_count(&self) -> u32 {
        self.success_count
    }

    pub fn failed_count(&self) -> u32 {
        self.failed_count
    }

    pub fn pending_count(&self) -> u32 {
        self.total_items
            .saturating_sub(self.success_count)
            .saturating_sub(self.failed_count)
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn item(&self, item_id: BatchItemId) -> Option<&BatchItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Reason recorded by [`Batch::fail`], if the batch was force-failed.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Append a line item. Only allowed while the batch is PENDING.
    pub fn add_item(&mut self, input_data: impl Into<String>) -> DomainResult<BatchItemId> {
        if self.status != BatchStatus::Pending {
            return Err(DomainError::invalid_state(format!(
                "cannot add items to batch in status: {}",
                self.status
            )));
        }
        let input_data = input_data.into();
        if input_data.trim().is_empty() {
            return Err(DomainError::validation("input_data cannot be empty"));
        }

        let sequence_number = self.total_items + 1;
        let item = BatchItem::new(sequence_number, input_data);
        let id = item.id;
        self.items.push(item);
        self.total_items = sequence_number;
        Ok(id)
    }

    /// PENDING -> IN_PROGRESS.
    pub fn start(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status != BatchStatus::Pending {
            return Err(DomainError::invalid_state(format!(
                "can only start PENDING batches (batch is {})",
                self.status
            )));
        }
        if self.items.is_empty() {
            return Err(DomainError::invalid_state("cannot start batch with no items"));
        }
        self.status = BatchStatus::InProgress;
        self.started_at = Some(at);
        Ok(())
    }

    pub fn increment_success(&mut self) -> DomainResult<()> {
        self.ensure_counter_room()?;
        self.success_count += 1;
        Ok(())
    }

    pub fn increment_failed(&mut self) -> DomainResult<()> {
        self.ensure_counter_room()?;
        self.failed_count += 1;
        Ok(())
    }

    /// Lowest-sequence item still PENDING.
    pub fn next_pending_item(&self) -> Option<&BatchItem> {
        self.items
            .iter()
            .filter(|i| i.status == BatchItemStatus::Pending)
            .min_by_key(|i| i.sequence_number)
    }

    /// Items stuck IN_PROGRESS (e.g. left behind by a crashed run).
    pub fn orphaned_items(&self) -> impl Iterator<Item = &BatchItem> {
        self.items
            .iter()
            .filter(|i| i.status == BatchItemStatus::InProgress)
    }

    pub fn mark_item_in_progress(&mut self, item_id: BatchItemId) -> DomainResult<()> {
        self.ensure_in_progress("update items")?;
        self.item_mut(item_id)?.mark_in_progress()
    }

    pub fn mark_item_success(
        &mut self,
        item_id: BatchItemId,
        result_data: impl Into<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_in_progress("update items")?;
        self.item_mut(item_id)?.mark_success(result_data.into(), at)
    }

    pub fn mark_item_failed(
        &mut self,
        item_id: BatchItemId,
        error_message: impl Into<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_in_progress("update items")?;
        self.item_mut(item_id)?.mark_failed(error_message.into(), at)
    }

    /// IN_PROGRESS -> terminal status derived from the counters.
    ///
    /// - no failures: COMPLETED
    /// - failures only: FAILED
    /// - otherwise: COMPLETED_WITH_ERRORS
    pub fn complete(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_in_progress("complete")?;
        self.status = if self.failed_count == 0 {
            BatchStatus::Completed
        } else if self.success_count == 0 {
            BatchStatus::Failed
        } else {
            BatchStatus::CompletedWithErrors
        };
        self.completed_at = Some(at);
        Ok(())
    }

    /// Force the batch to FAILED from any non-terminal status.
    ///
    /// Batch-level escape hatch for faults where per-item isolation does not
    /// apply. Counters and items are left as they are.
    pub fn fail(&mut self, reason: impl Into<String>, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_state(format!(
                "batch is already terminal ({})",
                self.status
            )));
        }
        self.status = BatchStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.completed_at = Some(at);
        Ok(())
    }

    fn ensure_in_progress(&self, action: &str) -> DomainResult<()> {
        if self.status != BatchStatus::InProgress {
            return Err(DomainError::invalid_state(format!(
                "can only {action} for IN_PROGRESS batches (batch is {})",
                self.status
            )));
        }
        Ok(())
    }

    fn ensure_counter_room(&self) -> DomainResult<()> {
        self.ensure_in_progress("update counts")?;
        if self.success_count + self.failed_count >= self.total_items {
            return Err(DomainError::invariant(
                "success_count + failed_count cannot exceed total_items",
            ));
        }
        Ok(())
    }

    fn item_mut(&mut self, item_id: BatchItemId) -> DomainResult<&mut BatchItem> {
        self.items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| DomainError::not_found(format!("batch item {item_id}")))
    }
}

impl AggregateRoot for Batch {
    type Id = BatchId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
