//! # Dispatch Module
//!
//! The notification dispatcher boundary. The OS-level alert capability is an
//! external collaborator; the engine consumes it through
//! [`NotificationDispatcher`] and receives its callbacks as
//! [`DispatcherEvent`]s on a channel owned by the delivery router.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Initial creation with the in-process timer dispatcher

pub mod in_process;

pub use in_process::InProcessDispatcher;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tokio::sync::mpsc;

use crate::core::{DeliveryPayload, DispatchError};

/// Outcome of a permission request. "Denied" and "not yet decided" are
/// distinct: an undecided prompt may never resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    NotDetermined,
}

/// What the user did with a delivered notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionAction {
    Opened,
    MarkDone,
    Snooze,
}

/// Callbacks from the dispatcher, handed to the engine's event loop before
/// they touch any shared state
#[derive(Debug, Clone)]
pub enum DispatcherEvent {
    Delivered {
        payload: DeliveryPayload,
        /// Whether the application was foregrounded at delivery time
        foregrounded: bool,
    },
    Interacted {
        payload: DeliveryPayload,
        action: InteractionAction,
    },
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// May resolve immediately if the user decided earlier; an undecided
    /// prompt stays [`PermissionStatus::NotDetermined`].
    async fn request_permission(&self) -> Result<PermissionStatus, DispatchError>;

    async fn permission_status(&self) -> PermissionStatus;

    /// Register a one-shot alert. At most one pending alert per id is
    /// guaranteed by the caller, not by the dispatcher.
    async fn schedule(
        &self,
        id: &str,
        fire_at: DateTime<Utc>,
        payload: DeliveryPayload,
    ) -> Result<(), DispatchError>;

    /// Idempotent: cancelling an unknown id is not an error.
    async fn cancel(&self, id: &str) -> Result<(), DispatchError>;

    async fn list_pending(&self) -> Result<HashSet<String>, DispatchError>;

    async fn set_badge_count(&self, count: u32);

    /// Drop the delivered-alert records (app became active).
    async fn clear_delivered(&self);

    /// Hand over the event stream. The delivery router is the sole handler;
    /// subsequent calls return `None`.
    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<DispatcherEvent>>;
}
