//! # Delivery Feature
//!
//! Routes dispatcher delivery and interaction callbacks: banner versus
//! system alert, completion and rescheduling, badge upkeep.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Snooze spins repeating occurrences off as one-off children
//! - 1.0.0: Initial implementation

pub mod router;

pub use router::DeliveryRouter;
