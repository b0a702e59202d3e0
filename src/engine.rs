//! Engine assembly
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0
//!
//! Constructs the injected services once at startup and wires them
//! together: store and dispatcher go in, the coordinator, delivery router
//! and banner queue come up around them. Launch reconciliation runs to
//! completion before the router starts consuming events, so every later
//! mutation sees a consistent baseline.

use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::watch;

use crate::core::{Config, EngineError, Lifecycle};
use crate::database::{Reminder, ReminderStore, RepeatRule};
use crate::dispatch::{NotificationDispatcher, PermissionStatus};
use crate::features::banners::BannerQueue;
use crate::features::delivery::DeliveryRouter;
use crate::features::occurrence::OccurrenceExpander;
use crate::features::scheduling::{ReconcileReport, ScheduleOutcome, SchedulingCoordinator};

pub struct Engine {
    store: Arc<dyn ReminderStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    coordinator: Arc<SchedulingCoordinator>,
    router: Arc<DeliveryRouter>,
    banners: Arc<BannerQueue>,
    lifecycle: Lifecycle,
    badge_rx: watch::Receiver<u32>,
}

impl Engine {
    /// Bring the engine up around an externally owned store and dispatcher.
    ///
    /// Reconciliation runs first and its report is returned alongside the
    /// engine; the dispatcher event stream is claimed and consumed by the
    /// delivery router from here on.
    pub async fn start(
        config: &Config,
        store: Arc<dyn ReminderStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        lifecycle: Lifecycle,
    ) -> Result<(Self, ReconcileReport), EngineError> {
        let expander = OccurrenceExpander::new(config.custom_fire_time);
        let coordinator = Arc::new(SchedulingCoordinator::new(
            store.clone(),
            dispatcher.clone(),
            expander,
        ));
        let banners = Arc::new(BannerQueue::new(store.clone()));
        let (router, badge_rx) = DeliveryRouter::new(
            store.clone(),
            dispatcher.clone(),
            coordinator.clone(),
            banners.clone(),
            config.snooze_minutes,
        );
        let router = Arc::new(router);

        // Baseline before anything else may mutate scheduling state.
        let report = coordinator.reconcile_on_launch().await?;

        match dispatcher.take_events() {
            Some(events) => {
                tokio::spawn(router.clone().run(events));
            }
            None => {
                warn!("Dispatcher event stream already claimed; deliveries will not be routed");
            }
        }

        // Sweep banners past their display timeout.
        let sweep_banners = banners.clone();
        let timeout = Duration::seconds(config.banner_timeout_secs as i64);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
            loop {
                interval.tick().await;
                sweep_banners.sweep_expired(timeout).await;
            }
        });

        router.recompute_badge().await;

        Ok((
            Engine {
                store,
                dispatcher,
                coordinator,
                router,
                banners,
                lifecycle,
                badge_rx,
            },
            report,
        ))
    }

    /// Ask the dispatcher for notification permission. "Denied" and "not
    /// yet decided" both leave reminders unscheduled but intact.
    pub async fn request_permission(&self) -> Result<PermissionStatus, EngineError> {
        Ok(self.dispatcher.request_permission().await?)
    }

    /// Create a reminder. The record always persists; the outcome says
    /// whether it will actually notify.
    pub async fn create_reminder(
        &self,
        title: impl Into<String>,
        fire_at: DateTime<Utc>,
        repeat_rule: RepeatRule,
    ) -> Result<(Reminder, ScheduleOutcome), EngineError> {
        let reminder = Reminder::new(title, fire_at, repeat_rule);
        self.store.insert(&reminder).await?;
        let outcome = match self.coordinator.upsert(&reminder).await {
            Ok(outcome) => outcome,
            Err(e @ EngineError::SchedulingFailed { .. }) => {
                // Degrade: the reminder exists but will not notify until the
                // next reconcile pass succeeds.
                warn!("{e}");
                ScheduleOutcome::Deferred
            }
            Err(e) => return Err(e),
        };
        self.router.recompute_badge().await;
        info!("Created reminder {} ({:?})", reminder.id, outcome);
        Ok((reminder, outcome))
    }

    /// Persist an edited reminder and reconcile its dispatcher entry.
    pub async fn update_reminder(&self, reminder: &Reminder) -> Result<ScheduleOutcome, EngineError> {
        self.store.update(reminder).await?;
        let outcome = self.coordinator.upsert(reminder).await?;
        self.router.recompute_badge().await;
        Ok(outcome)
    }

    /// Delete a reminder; a series parent takes its children with it.
    pub async fn delete_reminder(&self, reminder_id: &str) -> Result<(), EngineError> {
        self.coordinator.delete(reminder_id).await?;
        self.router.recompute_badge().await;
        Ok(())
    }

    pub async fn complete_reminder(&self, reminder_id: &str) -> Result<(), EngineError> {
        self.router.complete(reminder_id).await
    }

    pub async fn snooze_reminder(&self, reminder_id: &str) -> Result<(), EngineError> {
        self.router.snooze(reminder_id).await
    }

    pub async fn list_reminders(&self) -> Result<Vec<Reminder>, EngineError> {
        Ok(self.store.fetch_all().await?)
    }

    /// Re-run store/dispatcher reconciliation, e.g. after a permission
    /// prompt resolves.
    pub async fn reconcile(&self) -> Result<ReconcileReport, EngineError> {
        self.coordinator.reconcile_on_launch().await
    }

    /// Host application reports an activation change. Transitioning to
    /// active resets the badge and clears delivered-alert records.
    pub async fn set_foregrounded(&self, foregrounded: bool) {
        let was = self.lifecycle.is_foregrounded();
        self.lifecycle.set_foregrounded(foregrounded);
        if foregrounded && !was {
            self.router.on_app_activated().await;
        }
    }

    /// The in-app banner queue, for the presentation layer.
    pub fn banners(&self) -> &Arc<BannerQueue> {
        &self.banners
    }

    /// Observable badge count.
    pub fn badge(&self) -> watch::Receiver<u32> {
        self.badge_rx.clone()
    }
}
