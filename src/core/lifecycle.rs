//! Process-wide application lifecycle handle
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0
//!
//! The dispatcher samples this handle at delivery time to decide whether a
//! delivery counts as foregrounded. The engine flips it when the hosting
//! application activates or resigns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cheaply clonable foreground/background flag
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    foregrounded: Arc<AtomicBool>,
}

impl Lifecycle {
    /// A new handle; the application starts backgrounded until the host
    /// reports activation.
    pub fn new() -> Self {
        Lifecycle::default()
    }

    pub fn is_foregrounded(&self) -> bool {
        self.foregrounded.load(Ordering::SeqCst)
    }

    pub fn set_foregrounded(&self, foregrounded: bool) {
        self.foregrounded.store(foregrounded, Ordering::SeqCst);
    }
}
