//! In-memory reminder store
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//!
//! DashMap-backed store used by unit tests and no-persistence runs.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::core::StoreError;
use crate::database::model::Reminder;
use crate::database::store::ReminderStore;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: std::sync::Arc<DashMap<String, Reminder>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn insert(&self, reminder: &Reminder) -> Result<(), StoreError> {
        self.records.insert(reminder.id.clone(), reminder.clone());
        Ok(())
    }

    async fn update(&self, reminder: &Reminder) -> Result<(), StoreError> {
        match self.records.get_mut(&reminder.id) {
            Some(mut entry) => {
                *entry = reminder.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(reminder.id.clone())),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.records.remove(id);
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<Reminder>, StoreError> {
        Ok(self.records.iter().map(|e| e.value().clone()).collect())
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Reminder>, StoreError> {
        Ok(self.records.get(id).map(|e| e.value().clone()))
    }
}
