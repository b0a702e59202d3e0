//! Store boundary for reminder records
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! Per-call atomicity only; the engine layers its own ordering guarantees on
//! top and never assumes multi-record transactions.

use async_trait::async_trait;

use crate::core::StoreError;
use crate::database::model::Reminder;

#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn insert(&self, reminder: &Reminder) -> Result<(), StoreError>;
    async fn update(&self, reminder: &Reminder) -> Result<(), StoreError>;
    /// Removing an id that is already gone is not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
    async fn fetch_all(&self) -> Result<Vec<Reminder>, StoreError>;
    async fn fetch_by_id(&self, id: &str) -> Result<Option<Reminder>, StoreError>;
}
