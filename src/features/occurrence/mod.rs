//! # Occurrence Feature
//!
//! Pure expansion of repeat rules into concrete future fire times.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod expander;

pub use expander::OccurrenceExpander;
