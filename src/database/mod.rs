//! # Database Module
//!
//! Reminder records and the store boundary. The engine never talks to a
//! concrete backend directly; everything goes through the [`ReminderStore`]
//! trait so the durable store stays an external collaborator.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Add in-memory store for tests and no-persistence runs
//! - 1.0.0: Initial creation with SQLite store

pub mod memory;
pub mod model;
pub mod sqlite_store;
pub mod store;

// Re-export commonly used items
pub use memory::MemoryStore;
pub use model::{Reminder, RepeatRule};
pub use sqlite_store::SqliteStore;
pub use store::ReminderStore;
