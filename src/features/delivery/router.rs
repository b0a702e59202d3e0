//! Dispatcher event routing
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! Sole handler for the dispatcher's two event kinds. Events may arrive on
//! arbitrary tasks; they are funneled through one mpsc channel and handled
//! sequentially here, so every store/dispatcher mutation happens on a single
//! logical owner. Per occurrence the states are pending, delivered, then
//! completed or rescheduled. Test notifications bypass routing entirely and
//! keep their system-level presentation.

use chrono::{Duration, Utc};
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::core::{DeliveryPayload, EngineError};
use crate::database::{Reminder, ReminderStore};
use crate::dispatch::{DispatcherEvent, InteractionAction, NotificationDispatcher};
use crate::features::banners::BannerQueue;
use crate::features::scheduling::{ScheduleOutcome, SchedulingCoordinator};

pub struct DeliveryRouter {
    store: Arc<dyn ReminderStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    coordinator: Arc<SchedulingCoordinator>,
    banners: Arc<BannerQueue>,
    badge_tx: watch::Sender<u32>,
    snooze: Duration,
}

impl DeliveryRouter {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        coordinator: Arc<SchedulingCoordinator>,
        banners: Arc<BannerQueue>,
        snooze_minutes: i64,
    ) -> (Self, watch::Receiver<u32>) {
        let (badge_tx, badge_rx) = watch::channel(0);
        let router = DeliveryRouter {
            store,
            dispatcher,
            coordinator,
            banners,
            badge_tx,
            snooze: Duration::minutes(snooze_minutes),
        };
        (router, badge_rx)
    }

    /// Consume the dispatcher event stream until it closes.
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<DispatcherEvent>) {
        debug!("Delivery router attached as the dispatcher event handler");
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        debug!("Dispatcher event stream closed, delivery router stopping");
    }

    pub async fn handle_event(&self, event: DispatcherEvent) {
        match event {
            DispatcherEvent::Delivered {
                payload,
                foregrounded,
            } => self.on_delivered(payload, foregrounded).await,
            DispatcherEvent::Interacted { payload, action } => {
                self.on_interacted(payload, action).await
            }
        }
    }

    async fn on_delivered(&self, payload: DeliveryPayload, foregrounded: bool) {
        if payload.is_test {
            debug!(
                "Test notification {} delivered, system presentation preserved",
                payload.reminder_id
            );
            return;
        }

        let Some(reminder) = self.fetch_benign(&payload.reminder_id).await else {
            return;
        };
        if reminder.is_completed {
            debug!("Delivery for completed reminder {} ignored", reminder.id);
            return;
        }

        if foregrounded {
            // The system alert is suppressed while active; surface in-app.
            self.banners
                .add_if_not_shown(&reminder.id, &reminder.title, reminder.fire_at)
                .await;
        }

        if reminder.repeat_rule.is_repeating() {
            self.advance_after_delivery(reminder).await;
        }

        self.recompute_badge().await;
    }

    async fn on_interacted(&self, payload: DeliveryPayload, action: InteractionAction) {
        if payload.is_test {
            return;
        }

        let Some(reminder) = self.fetch_benign(&payload.reminder_id).await else {
            return;
        };
        if reminder.is_completed {
            debug!("Interaction with completed reminder {} ignored", reminder.id);
            return;
        }

        // Confirmation reaches the user regardless of entry path; enqueue
        // before the action mutates completion state.
        self.banners
            .add_if_not_shown(&reminder.id, &reminder.title, reminder.fire_at)
            .await;

        let result = match action {
            InteractionAction::Opened => Ok(()),
            InteractionAction::MarkDone => self.complete(&reminder.id).await,
            InteractionAction::Snooze => self.snooze(&reminder.id).await,
        };
        if let Err(e) = result {
            warn!(
                "Interaction {action:?} on reminder {} failed: {e}",
                reminder.id
            );
        }
    }

    /// Mark a reminder done. Non-repeating reminders complete for good; a
    /// repeating reminder advances to its next occurrence and completes only
    /// once its series is exhausted.
    pub async fn complete(&self, reminder_id: &str) -> Result<(), EngineError> {
        let Some(mut reminder) = self.store.fetch_by_id(reminder_id).await? else {
            return Err(EngineError::RecordNotFound(reminder_id.to_string()));
        };
        if reminder.is_completed {
            return Ok(());
        }

        let next = reminder.repeat_rule.is_repeating().then(|| {
            self.coordinator.expander().next_occurrence(
                &reminder.repeat_rule,
                Utc::now(),
                reminder.fire_at,
            )
        });

        match next {
            Some(Some(next)) => {
                reminder.fire_at = next;
                debug!("Reminder {} done for now, next at {next}", reminder.id);
            }
            _ => {
                reminder.is_completed = true;
                debug!("Reminder {} completed", reminder.id);
            }
        }

        self.store.update(&reminder).await?;
        self.upsert_degraded(&reminder).await;
        self.recompute_badge().await;
        Ok(())
    }

    /// Push a reminder forward by the configured snooze interval. Snoozing a
    /// repeating reminder spins the due occurrence off as a one-off child so
    /// the series cadence is untouched.
    pub async fn snooze(&self, reminder_id: &str) -> Result<(), EngineError> {
        let Some(mut reminder) = self.store.fetch_by_id(reminder_id).await? else {
            return Err(EngineError::RecordNotFound(reminder_id.to_string()));
        };
        if reminder.is_completed {
            return Ok(());
        }

        let now = Utc::now();
        let snoozed_until = now + self.snooze;

        if reminder.repeat_rule.is_repeating() {
            let child = Reminder::child_of(&reminder, snoozed_until);
            self.store.insert(&child).await?;
            self.upsert_degraded(&child).await;
            debug!(
                "Snoozed occurrence of {} as child {} until {snoozed_until}",
                reminder.id, child.id
            );

            // Move the series past the occurrence that was just snoozed.
            if let Some(next) = self.coordinator.expander().next_occurrence(
                &reminder.repeat_rule,
                now,
                reminder.fire_at,
            ) {
                reminder.fire_at = next;
            }
            self.store.update(&reminder).await?;
            self.upsert_degraded(&reminder).await;
        } else {
            reminder.fire_at = snoozed_until;
            self.store.update(&reminder).await?;
            self.upsert_degraded(&reminder).await;
            debug!("Snoozed reminder {} until {snoozed_until}", reminder.id);
        }

        self.recompute_badge().await;
        Ok(())
    }

    /// Badge value: reminders past due and not completed. Pushed to the
    /// dispatcher and to in-process observers.
    pub async fn recompute_badge(&self) {
        match self.store.fetch_all().await {
            Ok(reminders) => {
                let now = Utc::now();
                let due = reminders.iter().filter(|r| r.is_due(now)).count() as u32;
                self.dispatcher.set_badge_count(due).await;
                self.badge_tx.send_replace(due);
            }
            Err(e) => warn!("Badge recompute skipped: {e}"),
        }
    }

    /// App became active: the badge resets and delivered-alert records are
    /// dropped so stale counts cannot accumulate across sessions.
    pub async fn on_app_activated(&self) {
        self.dispatcher.set_badge_count(0).await;
        self.badge_tx.send_replace(0);
        self.dispatcher.clear_delivered().await;
        debug!("App activated: badge reset, delivered records cleared");
    }

    /// Advance a repeating reminder past the occurrence that just fired and
    /// register the next one.
    async fn advance_after_delivery(&self, mut reminder: Reminder) {
        let next = self.coordinator.expander().next_occurrence(
            &reminder.repeat_rule,
            reminder.fire_at,
            reminder.fire_at,
        );
        match next {
            Some(next) => {
                reminder.fire_at = next;
                if let Err(e) = self.store.update(&reminder).await {
                    warn!("Could not advance reminder {}: {e}", reminder.id);
                    return;
                }
                self.upsert_degraded(&reminder).await;
                debug!("Reminder {} rescheduled for {next}", reminder.id);
            }
            None => {
                debug!("Series {} exhausted after delivery", reminder.id);
            }
        }
    }

    /// Upsert where scheduling failure degrades to a log line: the record is
    /// already persisted and stays eligible for the next reconcile pass.
    async fn upsert_degraded(&self, reminder: &Reminder) {
        match self.coordinator.upsert(reminder).await {
            Ok(ScheduleOutcome::PermissionDenied) => {
                debug!("Reminder {} will not notify: permission denied", reminder.id);
            }
            Ok(_) => {}
            Err(e) => warn!("Registration for reminder {} deferred: {e}", reminder.id),
        }
    }

    async fn fetch_benign(&self, reminder_id: &str) -> Option<Reminder> {
        match self.store.fetch_by_id(reminder_id).await {
            Ok(Some(reminder)) => Some(reminder),
            Ok(None) => {
                // Benign: the record was deleted while the alert was in
                // flight.
                debug!("Event for unknown reminder {reminder_id} ignored");
                None
            }
            Err(e) => {
                warn!("Event for reminder {reminder_id} dropped: store lookup failed: {e}");
                None
            }
        }
    }
}
