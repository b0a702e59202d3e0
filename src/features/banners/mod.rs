//! # Banners Feature
//!
//! Deduplicated FIFO of "reminder is due now" events for in-app display.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

pub mod queue;

pub use queue::{Banner, BannerQueue};
