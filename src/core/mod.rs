//! # Core Module
//!
//! Core domain types, configuration, and error handling for the chime engine.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Add lifecycle module with the process-wide foreground handle
//! - 1.1.0: Add payload module with the dispatcher wire shape
//! - 1.0.0: Initial creation with config and error modules

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod payload;

// Re-export commonly used items
pub use config::Config;
pub use error::{DispatchError, EngineError, StoreError};
pub use lifecycle::Lifecycle;
pub use payload::DeliveryPayload;
