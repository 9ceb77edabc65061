//! Batch payor-enrolment domain.
//!
//! This crate contains the `Batch` aggregate, the payor import record schema,
//! the file validation rules and the ports the enrolment pipeline depends on.
//! Everything here is deterministic domain logic (no IO, no storage).

pub mod batch;
pub mod payor;
pub mod processor;
pub mod validation;

pub use batch::{
    Batch, BatchItem, BatchItemSnapshot, BatchItemStatus, BatchSnapshot, BatchStatus, BatchType,
};
pub use payor::{EnrolmentResult, PayorEnrolmentRequest, PersonRequest, PersonRole};
pub use processor::{PayorDirectory, PayorEnrolmentProcessor, PayorOutcome, ProcessorError};
pub use validation::{
    MAX_PAYORS_PER_FILE, PayorValidation, ValidationError, ValidationResult, validate_payors,
};
