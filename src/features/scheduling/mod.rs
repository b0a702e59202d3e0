//! # Scheduling Feature
//!
//! Owns the mapping from reminder records to pending dispatcher entries and
//! keeps the two reconciled.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Launch reconciliation with orphan cleanup
//! - 1.0.0: Initial implementation with cancel-then-register upsert

pub mod coordinator;

pub use coordinator::{ReconcileReport, ScheduleOutcome, SchedulingCoordinator};
