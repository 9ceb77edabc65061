use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use payorflow_batch::Batch;
use payorflow_core::{BatchId, ProfileId};

use super::record::{BatchItemRecord, BatchRecord};
use super::r#trait::{BatchStore, BatchStoreError};

#[derive(Debug, Clone)]
struct StoredBatch {
    record: BatchRecord,
    items: Vec<BatchItemRecord>,
}

/// In-memory batch store.
///
/// Keeps the persisted row shape rather than live aggregates, so every load
/// goes through the same rehydration path a database adapter would use.
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryBatchStore {
    batches: RwLock<HashMap<BatchId, StoredBatch>>,
}

impl InMemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of stored batches.
    ///
    /// A poisoned lock still holds the last committed map, so it is read as is.
    pub fn len(&self) -> usize {
        self.batches.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BatchStore for InMemoryBatchStore {
    fn find_by_id(&self, batch_id: BatchId) -> Result<Option<Batch>, BatchStoreError> {
        let batches = self
            .batches
            .read()
            .map_err(|_| BatchStoreError::Storage("lock poisoned".to_string()))?;

        batches
            .get(&batch_id)
            .cloned()
            .map(|stored| stored.record.into_batch(stored.items))
            .transpose()
    }

    fn save(&self, batch: &Batch) -> Result<(), BatchStoreError> {
        let (record, items) = BatchRecord::from_batch(batch);
        let mut batches = self
            .batches
            .write()
            .map_err(|_| BatchStoreError::Storage("lock poisoned".to_string()))?;

        batches.insert(record.batch_id, StoredBatch { record, items });
        Ok(())
    }

    fn find_by_source_profile_id(&self, profile_id: ProfileId) -> Result<Vec<Batch>, BatchStoreError> {
        let batches = self
            .batches
            .read()
            .map_err(|_| BatchStoreError::Storage("lock poisoned".to_string()))?;

        let mut owned: Vec<StoredBatch> = batches
            .values()
            .filter(|b| b.record.source_profile_id == profile_id)
            .cloned()
            .collect();
        drop(batches);

        owned.sort_by(|a, b| {
            b.record
                .created_at
                .cmp(&a.record.created_at)
                .then_with(|| b.record.batch_id.cmp(&a.record.batch_id))
        });

        owned
            .into_iter()
            .map(|stored| stored.record.into_batch(stored.items))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use payorflow_batch::{BatchStatus, BatchType};

    fn batch_for(profile: ProfileId, minutes: i64) -> Batch {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes);
        let mut batch = Batch::create(BatchType::PayorEnrolment, profile, "ops", at).unwrap();
        batch.add_item(r#"{"businessName":"X"}"#).unwrap();
        batch
    }

    #[test]
    fn save_then_find_returns_equal_batch() {
        let store = InMemoryBatchStore::new();
        let batch = batch_for(ProfileId::new(), 0);
        store.save(&batch).unwrap();

        let loaded = store.find_by_id(batch.id_typed()).unwrap().unwrap();
        assert_eq!(loaded, batch);
        assert!(store.find_by_id(BatchId::new()).unwrap().is_none());
    }

    #[test]
    fn save_overwrites_previous_state() {
        let store = InMemoryBatchStore::new();
        let mut batch = batch_for(ProfileId::new(), 0);
        store.save(&batch).unwrap();

        batch.start(Utc::now()).unwrap();
        store.save(&batch).unwrap();

        let loaded = store.find_by_id(batch.id_typed()).unwrap().unwrap();
        assert_eq!(loaded.status(), BatchStatus::InProgress);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn lists_only_the_profile_batches_newest_first() {
        let store = InMemoryBatchStore::new();
        let profile = ProfileId::new();
        let older = batch_for(profile, 0);
        let newer = batch_for(profile, 10);
        let other = batch_for(ProfileId::new(), 5);
        for b in [&older, &newer, &other] {
            store.save(b).unwrap();
        }

        let listed: Vec<BatchId> = store
            .find_by_source_profile_id(profile)
            .unwrap()
            .iter()
            .map(|b| b.id_typed())
            .collect();
        assert_eq!(listed, vec![newer.id_typed(), older.id_typed()]);
    }

    #[test]
    fn len_survives_a_poisoned_lock() {
        let store = Arc::new(InMemoryBatchStore::new());
        store.save(&batch_for(ProfileId::new(), 0)).unwrap();

        let poisoner = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.batches.write().unwrap();
            panic!("writer died");
        })
        .join();

        assert_eq!(store.len(), 1);
        assert!(matches!(
            store.find_by_id(BatchId::new()),
            Err(BatchStoreError::Storage(_))
        ));
    }

    #[test]
    fn loaded_copies_are_detached_from_the_store() {
        let store = InMemoryBatchStore::new();
        let batch = batch_for(ProfileId::new(), 0);
        store.save(&batch).unwrap();

        let mut copy = store.find_by_id(batch.id_typed()).unwrap().unwrap();
        copy.start(Utc::now()).unwrap();

        let fresh = store.find_by_id(batch.id_typed()).unwrap().unwrap();
        assert_eq!(fresh.status(), BatchStatus::Pending);
    }
}
