//! Batch persistence boundary.
//!
//! A batch is stored as one flat [`BatchRecord`] plus its ordered
//! [`BatchItemRecord`]s. Loading goes back through `Batch::reconstitute`, so
//! the aggregate never depends on how a backend orders or keys its rows.

pub mod in_memory;
pub mod record;
pub mod r#trait;

pub use in_memory::InMemoryBatchStore;
pub use record::{BatchItemRecord, BatchRecord};
pub use r#trait::{BatchStore, BatchStoreError};
