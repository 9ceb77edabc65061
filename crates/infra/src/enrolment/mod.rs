//! Two-phase payor enrolment: validate a file into a PENDING batch, then
//! execute the batch item by item.

mod error;
mod executor;
mod service;
mod views;

pub use error::EnrolmentError;
pub use executor::ExecutionReport;
pub use service::EnrolmentService;
pub use views::{BatchDetail, BatchItemDetail, BatchSummary};
