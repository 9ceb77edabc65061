//! Infrastructure layer: batch storage, configuration and the enrolment
//! pipeline that ties the batch domain to its collaborators.

pub mod batch_store;
pub mod config;
pub mod enrolment;

pub use batch_store::{BatchStore, BatchStoreError, InMemoryBatchStore};
pub use config::EnrolmentConfig;
pub use enrolment::{
    BatchDetail, BatchItemDetail, BatchSummary, EnrolmentError, EnrolmentService, ExecutionReport,
};
