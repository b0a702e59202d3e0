//! In-process notification dispatcher
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! Timer-backed stand-in for the platform notification center, used by the
//! demo binary and the test suite. Pending alerts live in a DashMap; each
//! schedule spawns a sleep task that fires only if its registration is still
//! the current one for that id, so cancel and reschedule behave like the
//! real thing.
//!
//! ## Changelog
//! - 1.1.0: Track delivered records and sample the lifecycle at fire time
//! - 1.0.0: Initial implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;

use crate::core::{DeliveryPayload, DispatchError, Lifecycle};
use crate::dispatch::{DispatcherEvent, InteractionAction, NotificationDispatcher, PermissionStatus};

#[derive(Debug, Clone)]
struct PendingAlert {
    fire_at: DateTime<Utc>,
    payload: DeliveryPayload,
    seq: u64,
}

#[derive(Clone)]
pub struct InProcessDispatcher {
    pending: Arc<DashMap<String, PendingAlert>>,
    delivered: Arc<DashMap<String, DeliveryPayload>>,
    permission: Arc<RwLock<PermissionStatus>>,
    badge: Arc<AtomicU32>,
    seq: Arc<AtomicU64>,
    events_tx: mpsc::UnboundedSender<DispatcherEvent>,
    events_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<DispatcherEvent>>>>,
    lifecycle: Lifecycle,
}

impl InProcessDispatcher {
    pub fn new(lifecycle: Lifecycle) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        InProcessDispatcher {
            pending: Arc::new(DashMap::new()),
            delivered: Arc::new(DashMap::new()),
            permission: Arc::new(RwLock::new(PermissionStatus::NotDetermined)),
            badge: Arc::new(AtomicU32::new(0)),
            seq: Arc::new(AtomicU64::new(0)),
            events_tx,
            events_rx: Arc::new(Mutex::new(Some(events_rx))),
            lifecycle,
        }
    }

    pub fn with_permission(self, status: PermissionStatus) -> Self {
        self.set_permission(status);
        self
    }

    /// Simulate the user answering the system prompt.
    pub fn set_permission(&self, status: PermissionStatus) {
        *self.permission.write().unwrap_or_else(|e| e.into_inner()) = status;
    }

    /// Current badge value, as the platform would display it.
    pub fn badge_count(&self) -> u32 {
        self.badge.load(Ordering::SeqCst)
    }

    /// Fire a pending alert immediately regardless of its timer. Returns
    /// false when nothing is pending for the id.
    pub fn deliver_now(&self, id: &str) -> bool {
        match self.pending.remove(id) {
            Some((_, alert)) => {
                self.emit_delivery(id, alert.payload);
                true
            }
            None => false,
        }
    }

    /// Simulate the user acting on a delivered notification.
    pub fn interact(&self, id: &str, action: InteractionAction) {
        let payload = self
            .delivered
            .get(id)
            .map(|e| e.value().clone())
            .unwrap_or_else(|| DeliveryPayload::for_reminder(id));
        if self
            .events_tx
            .send(DispatcherEvent::Interacted { payload, action })
            .is_err()
        {
            warn!("Dropped interaction event for {id}: no handler attached");
        }
    }

    fn emit_delivery(&self, id: &str, payload: DeliveryPayload) {
        self.delivered.insert(id.to_string(), payload.clone());
        let foregrounded = self.lifecycle.is_foregrounded();
        if self
            .events_tx
            .send(DispatcherEvent::Delivered {
                payload,
                foregrounded,
            })
            .is_err()
        {
            warn!("Dropped delivery event for {id}: no handler attached");
        }
    }

    fn permission(&self) -> PermissionStatus {
        *self.permission.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl NotificationDispatcher for InProcessDispatcher {
    async fn request_permission(&self) -> Result<PermissionStatus, DispatchError> {
        // The in-process prompt has no user behind it: whatever state was
        // seeded (or set later via set_permission) is the answer, and an
        // undecided prompt stays undecided.
        Ok(self.permission())
    }

    async fn permission_status(&self) -> PermissionStatus {
        self.permission()
    }

    async fn schedule(
        &self,
        id: &str,
        fire_at: DateTime<Utc>,
        payload: DeliveryPayload,
    ) -> Result<(), DispatchError> {
        if self.permission() == PermissionStatus::Denied {
            return Err(DispatchError::PermissionDenied);
        }

        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        self.pending.insert(
            id.to_string(),
            PendingAlert {
                fire_at,
                payload,
                seq,
            },
        );
        debug!("Scheduled alert {id} for {fire_at} (seq {seq})");

        let dispatcher = self.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            let delay = (fire_at - Utc::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            tokio::time::sleep(delay).await;
            // Only the current registration for this id may fire.
            if let Some((_, alert)) = dispatcher.pending.remove_if(&id, |_, a| a.seq == seq) {
                debug!("Alert {id} fired at {}", alert.fire_at);
                dispatcher.emit_delivery(&id, alert.payload);
            }
        });

        Ok(())
    }

    async fn cancel(&self, id: &str) -> Result<(), DispatchError> {
        if self.pending.remove(id).is_some() {
            debug!("Cancelled pending alert {id}");
        }
        Ok(())
    }

    async fn list_pending(&self) -> Result<HashSet<String>, DispatchError> {
        Ok(self.pending.iter().map(|e| e.key().clone()).collect())
    }

    async fn set_badge_count(&self, count: u32) {
        self.badge.store(count, Ordering::SeqCst);
    }

    async fn clear_delivered(&self) {
        self.delivered.clear();
    }

    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<DispatcherEvent>> {
        self.events_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}
