//! Dispatcher wire payload
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! The payload travels through the external dispatcher and comes back on
//! delivery and interaction callbacks. `is_test` is the sole discriminator
//! that lets a diagnostic notification bypass in-app routing.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Payload attached to every scheduled alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPayload {
    pub reminder_id: String,
    #[serde(default)]
    pub is_test: bool,
}

impl DeliveryPayload {
    pub fn for_reminder(reminder_id: impl Into<String>) -> Self {
        DeliveryPayload {
            reminder_id: reminder_id.into(),
            is_test: false,
        }
    }

    /// A diagnostic payload whose delivery keeps the system-level
    /// presentation untouched.
    pub fn test(reminder_id: impl Into<String>) -> Self {
        DeliveryPayload {
            reminder_id: reminder_id.into(),
            is_test: true,
        }
    }

    /// Encode for the dispatcher boundary.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a payload that came back from the dispatcher boundary.
    pub fn decode(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
