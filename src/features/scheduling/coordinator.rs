//! Reminder-to-dispatcher reconciliation
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! Invariants upheld here: at most one pending dispatcher entry per reminder
//! id (cancel-then-register, serialized per id), deletion cancels before it
//! removes records (fail closed), and dispatcher state is always a derived
//! projection of the store, rebuilt at launch.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::{DeliveryPayload, DispatchError, EngineError};
use crate::database::{Reminder, ReminderStore};
use crate::dispatch::NotificationDispatcher;
use crate::features::occurrence::OccurrenceExpander;

/// What happened to a reminder's dispatcher registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A single pending entry now exists at this fire time
    Scheduled(DateTime<Utc>),
    /// No future occurrence remains; any previous entry was cancelled
    SeriesComplete,
    /// The reminder exists but will not notify until permission is granted
    PermissionDenied,
    /// The dispatcher rejected the registration; the record is retained and
    /// the next reconcile pass retries
    Deferred,
}

/// Result of a launch reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub registered: usize,
    pub orphans_cancelled: usize,
}

pub struct SchedulingCoordinator {
    store: Arc<dyn ReminderStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    expander: OccurrenceExpander,
    /// Per-id serialization of cancel-then-register sequences
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SchedulingCoordinator {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        expander: OccurrenceExpander,
    ) -> Self {
        SchedulingCoordinator {
            store,
            dispatcher,
            expander,
            locks: DashMap::new(),
        }
    }

    pub fn expander(&self) -> &OccurrenceExpander {
        &self.expander
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        self.locks.entry(id.to_string()).or_default().clone()
    }

    /// Reconcile one reminder with the dispatcher: cancel whatever is
    /// pending for its id, then register its next occurrence if one exists
    /// and the reminder is not completed.
    ///
    /// An overdue repeating reminder is healed forward: its `fire_at` is
    /// advanced to the next future occurrence and persisted.
    pub async fn upsert(&self, reminder: &Reminder) -> Result<ScheduleOutcome, EngineError> {
        let lock = self.lock_for(&reminder.id);
        let _guard = lock.lock().await;

        // The previous registration must be gone (or the failure known)
        // before a new one for the same id is issued.
        self.dispatcher
            .cancel(&reminder.id)
            .await
            .map_err(|e| EngineError::CancellationFailed {
                id: reminder.id.clone(),
                source: e,
            })?;

        if reminder.is_completed {
            return Ok(ScheduleOutcome::SeriesComplete);
        }

        let now = Utc::now();
        let Some(next) =
            self.expander
                .next_occurrence(&reminder.repeat_rule, now, reminder.fire_at)
        else {
            debug!("Reminder {} has no further occurrences", reminder.id);
            return Ok(ScheduleOutcome::SeriesComplete);
        };

        if next != reminder.fire_at {
            let mut healed = reminder.clone();
            healed.fire_at = next;
            self.store.update(&healed).await?;
            debug!(
                "Advanced overdue reminder {} from {} to {}",
                reminder.id, reminder.fire_at, next
            );
        }

        match self
            .dispatcher
            .schedule(&reminder.id, next, DeliveryPayload::for_reminder(&reminder.id))
            .await
        {
            Ok(()) => {
                debug!("Registered reminder {} at {next}", reminder.id);
                Ok(ScheduleOutcome::Scheduled(next))
            }
            Err(DispatchError::PermissionDenied) => {
                info!(
                    "Reminder {} kept without a notification: permission denied",
                    reminder.id
                );
                Ok(ScheduleOutcome::PermissionDenied)
            }
            Err(e) => {
                warn!("Dispatcher rejected reminder {}: {e}", reminder.id);
                Err(EngineError::SchedulingFailed {
                    id: reminder.id.clone(),
                    source: e,
                })
            }
        }
    }

    /// Cancel and remove a reminder. A series parent takes all children that
    /// reference it down too. Every cancellation must be confirmed before
    /// any record is removed; a failed cancel leaves the store untouched so
    /// deletion can be retried.
    pub async fn delete(&self, reminder_id: &str) -> Result<(), EngineError> {
        let lock = self.lock_for(reminder_id);
        let _guard = lock.lock().await;

        let Some(reminder) = self.store.fetch_by_id(reminder_id).await? else {
            // Record already gone; make sure no orphaned alert outlives it.
            return self
                .dispatcher
                .cancel(reminder_id)
                .await
                .map_err(|e| EngineError::CancellationFailed {
                    id: reminder_id.to_string(),
                    source: e,
                });
        };

        let mut doomed = vec![reminder];
        let children = self
            .store
            .fetch_all()
            .await?
            .into_iter()
            .filter(|r| r.parent_id.as_deref() == Some(reminder_id));
        doomed.extend(children);

        for record in &doomed {
            self.dispatcher
                .cancel(&record.id)
                .await
                .map_err(|e| EngineError::CancellationFailed {
                    id: record.id.clone(),
                    source: e,
                })?;
        }
        for record in &doomed {
            self.store.delete(&record.id).await?;
        }
        info!(
            "Deleted reminder {reminder_id} ({} record(s) in lineage)",
            doomed.len()
        );
        Ok(())
    }

    /// Rebuild dispatcher state from the store: re-register active reminders
    /// the dispatcher lost, cancel entries whose record is gone or done.
    /// Runs before any other scheduling mutation at launch.
    pub async fn reconcile_on_launch(&self) -> Result<ReconcileReport, EngineError> {
        let pending = self.dispatcher.list_pending().await?;
        let reminders = self.store.fetch_all().await?;

        let mut report = ReconcileReport::default();

        let live: HashSet<&str> = reminders
            .iter()
            .filter(|r| !r.is_completed)
            .map(|r| r.id.as_str())
            .collect();

        for reminder in reminders.iter().filter(|r| !r.is_completed) {
            if pending.contains(&reminder.id) {
                continue;
            }
            match self.upsert(reminder).await {
                Ok(ScheduleOutcome::Scheduled(at)) => {
                    debug!("Reconcile re-registered {} at {at}", reminder.id);
                    report.registered += 1;
                }
                Ok(outcome) => {
                    debug!("Reconcile left {} unscheduled: {outcome:?}", reminder.id);
                }
                Err(e) => {
                    // Keep healing the rest; this reminder stays eligible
                    // for the next pass.
                    warn!("Reconcile could not register {}: {e}", reminder.id);
                }
            }
        }

        for orphan in pending.iter().filter(|id| !live.contains(id.as_str())) {
            match self.dispatcher.cancel(orphan).await {
                Ok(()) => {
                    debug!("Reconcile cancelled orphaned entry {orphan}");
                    report.orphans_cancelled += 1;
                }
                Err(e) => warn!("Reconcile could not cancel orphan {orphan}: {e}"),
            }
        }

        info!(
            "Reconcile complete: {} registered, {} orphan(s) cancelled",
            report.registered, report.orphans_cancelled
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Lifecycle;
    use crate::database::{MemoryStore, RepeatRule};
    use crate::dispatch::{InProcessDispatcher, PermissionStatus};
    use async_trait::async_trait;
    use chrono::{Duration, NaiveTime};

    fn expander() -> OccurrenceExpander {
        OccurrenceExpander::new(NaiveTime::from_hms_opt(0, 0, 0).unwrap())
    }

    fn coordinator(
        store: &MemoryStore,
        dispatcher: &InProcessDispatcher,
    ) -> SchedulingCoordinator {
        SchedulingCoordinator::new(
            Arc::new(store.clone()),
            Arc::new(dispatcher.clone()),
            expander(),
        )
    }

    fn granted_dispatcher() -> InProcessDispatcher {
        InProcessDispatcher::new(Lifecycle::new()).with_permission(PermissionStatus::Granted)
    }

    #[tokio::test]
    async fn test_double_upsert_keeps_single_pending_entry() {
        let store = MemoryStore::new();
        let dispatcher = granted_dispatcher();
        let coordinator = coordinator(&store, &dispatcher);

        let reminder = Reminder::new(
            "water plants",
            Utc::now() + Duration::hours(2),
            RepeatRule::Daily,
        );
        store.insert(&reminder).await.unwrap();

        let first = coordinator.upsert(&reminder).await.unwrap();
        let second = coordinator.upsert(&reminder).await.unwrap();
        assert_eq!(first, ScheduleOutcome::Scheduled(reminder.fire_at));
        assert_eq!(second, ScheduleOutcome::Scheduled(reminder.fire_at));

        let pending = dispatcher.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending.contains(&reminder.id));
    }

    #[tokio::test]
    async fn test_completed_reminder_cancels_entry() {
        let store = MemoryStore::new();
        let dispatcher = granted_dispatcher();
        let coordinator = coordinator(&store, &dispatcher);

        let mut reminder = Reminder::new(
            "water plants",
            Utc::now() + Duration::hours(2),
            RepeatRule::None,
        );
        store.insert(&reminder).await.unwrap();
        coordinator.upsert(&reminder).await.unwrap();
        assert_eq!(dispatcher.list_pending().await.unwrap().len(), 1);

        reminder.is_completed = true;
        store.update(&reminder).await.unwrap();
        let outcome = coordinator.upsert(&reminder).await.unwrap();
        assert_eq!(outcome, ScheduleOutcome::SeriesComplete);
        assert!(dispatcher.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_permission_denied_keeps_reminder_without_entry() {
        let store = MemoryStore::new();
        let dispatcher =
            InProcessDispatcher::new(Lifecycle::new()).with_permission(PermissionStatus::Denied);
        let coordinator = coordinator(&store, &dispatcher);

        let reminder = Reminder::new(
            "call dentist",
            Utc::now() + Duration::hours(1),
            RepeatRule::None,
        );
        store.insert(&reminder).await.unwrap();

        let outcome = coordinator.upsert(&reminder).await.unwrap();
        assert_eq!(outcome, ScheduleOutcome::PermissionDenied);
        assert!(dispatcher.list_pending().await.unwrap().is_empty());
        assert!(store.fetch_by_id(&reminder.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overdue_repeating_reminder_is_healed_forward() {
        let store = MemoryStore::new();
        let dispatcher = granted_dispatcher();
        let coordinator = coordinator(&store, &dispatcher);

        let reminder = Reminder::new(
            "standup",
            Utc::now() - Duration::days(3),
            RepeatRule::Daily,
        );
        store.insert(&reminder).await.unwrap();

        let outcome = coordinator.upsert(&reminder).await.unwrap();
        let healed = store.fetch_by_id(&reminder.id).await.unwrap().unwrap();
        assert!(healed.fire_at > Utc::now());
        assert_eq!(outcome, ScheduleOutcome::Scheduled(healed.fire_at));
    }

    #[tokio::test]
    async fn test_overdue_non_repeating_reminder_stays_due() {
        let store = MemoryStore::new();
        let dispatcher = granted_dispatcher();
        let coordinator = coordinator(&store, &dispatcher);

        let reminder = Reminder::new(
            "one off",
            Utc::now() - Duration::minutes(5),
            RepeatRule::None,
        );
        store.insert(&reminder).await.unwrap();

        let outcome = coordinator.upsert(&reminder).await.unwrap();
        assert_eq!(outcome, ScheduleOutcome::SeriesComplete);
        assert!(dispatcher.list_pending().await.unwrap().is_empty());
        // The record is untouched: still present, still overdue, not completed
        let kept = store.fetch_by_id(&reminder.id).await.unwrap().unwrap();
        assert!(!kept.is_completed);
        assert_eq!(kept.fire_at, reminder.fire_at);
    }

    #[tokio::test]
    async fn test_delete_series_parent_cascades_to_children() {
        let store = MemoryStore::new();
        let dispatcher = granted_dispatcher();
        let coordinator = coordinator(&store, &dispatcher);

        let parent = Reminder::new("standup", Utc::now() + Duration::hours(1), RepeatRule::Daily);
        let child_a = Reminder::child_of(&parent, Utc::now() + Duration::hours(2));
        let child_b = Reminder::child_of(&parent, Utc::now() + Duration::hours(3));
        for r in [&parent, &child_a, &child_b] {
            store.insert(r).await.unwrap();
            coordinator.upsert(r).await.unwrap();
        }
        assert_eq!(dispatcher.list_pending().await.unwrap().len(), 3);

        coordinator.delete(&parent.id).await.unwrap();
        assert!(dispatcher.list_pending().await.unwrap().is_empty());
        assert!(store.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_registers_missing_entry() {
        let store = MemoryStore::new();
        let dispatcher = granted_dispatcher();
        let coordinator = coordinator(&store, &dispatcher);

        let reminder = Reminder::new(
            "review budget",
            Utc::now() + Duration::hours(4),
            RepeatRule::None,
        );
        store.insert(&reminder).await.unwrap();

        let report = coordinator.reconcile_on_launch().await.unwrap();
        assert_eq!(report.registered, 1);
        assert_eq!(report.orphans_cancelled, 0);

        let pending = dispatcher.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending.contains(&reminder.id));
    }

    #[tokio::test]
    async fn test_reconcile_cancels_orphaned_entries() {
        let store = MemoryStore::new();
        let dispatcher = granted_dispatcher();
        let coordinator = coordinator(&store, &dispatcher);

        dispatcher
            .schedule(
                "ghost",
                Utc::now() + Duration::hours(1),
                DeliveryPayload::for_reminder("ghost"),
            )
            .await
            .unwrap();

        let mut done = Reminder::new("done", Utc::now() + Duration::hours(1), RepeatRule::None);
        done.is_completed = true;
        store.insert(&done).await.unwrap();
        dispatcher
            .schedule(
                &done.id,
                done.fire_at,
                DeliveryPayload::for_reminder(&done.id),
            )
            .await
            .unwrap();

        let report = coordinator.reconcile_on_launch().await.unwrap();
        assert_eq!(report.orphans_cancelled, 2);
        assert!(dispatcher.list_pending().await.unwrap().is_empty());
    }

    /// Dispatcher that refuses every registration, for the degraded path.
    struct RejectingDispatcher;

    #[async_trait]
    impl NotificationDispatcher for RejectingDispatcher {
        async fn request_permission(&self) -> Result<PermissionStatus, DispatchError> {
            Ok(PermissionStatus::Granted)
        }
        async fn permission_status(&self) -> PermissionStatus {
            PermissionStatus::Granted
        }
        async fn schedule(
            &self,
            _id: &str,
            _fire_at: DateTime<Utc>,
            _payload: DeliveryPayload,
        ) -> Result<(), DispatchError> {
            Err(DispatchError::Rejected("quota exceeded".into()))
        }
        async fn cancel(&self, _id: &str) -> Result<(), DispatchError> {
            Ok(())
        }
        async fn list_pending(&self) -> Result<HashSet<String>, DispatchError> {
            Ok(HashSet::new())
        }
        async fn set_badge_count(&self, _count: u32) {}
        async fn clear_delivered(&self) {}
        fn take_events(
            &self,
        ) -> Option<tokio::sync::mpsc::UnboundedReceiver<crate::dispatch::DispatcherEvent>> {
            None
        }
    }

    #[tokio::test]
    async fn test_rejected_registration_keeps_record_for_retry() {
        let store = MemoryStore::new();
        let coordinator = SchedulingCoordinator::new(
            Arc::new(store.clone()),
            Arc::new(RejectingDispatcher),
            expander(),
        );

        let reminder = Reminder::new("persist", Utc::now() + Duration::hours(1), RepeatRule::None);
        store.insert(&reminder).await.unwrap();

        let err = coordinator.upsert(&reminder).await.unwrap_err();
        assert!(matches!(err, EngineError::SchedulingFailed { .. }));
        // The record stays intact, eligible for the next reconcile pass
        let kept = store.fetch_by_id(&reminder.id).await.unwrap().unwrap();
        assert!(!kept.is_completed);
    }

    /// Dispatcher whose cancel never succeeds, for the fail-closed path.
    struct BrokenCancelDispatcher;

    #[async_trait]
    impl NotificationDispatcher for BrokenCancelDispatcher {
        async fn request_permission(&self) -> Result<PermissionStatus, DispatchError> {
            Ok(PermissionStatus::Granted)
        }
        async fn permission_status(&self) -> PermissionStatus {
            PermissionStatus::Granted
        }
        async fn schedule(
            &self,
            _id: &str,
            _fire_at: DateTime<Utc>,
            _payload: DeliveryPayload,
        ) -> Result<(), DispatchError> {
            Ok(())
        }
        async fn cancel(&self, _id: &str) -> Result<(), DispatchError> {
            Err(DispatchError::CancellationFailed("backend offline".into()))
        }
        async fn list_pending(&self) -> Result<HashSet<String>, DispatchError> {
            Ok(HashSet::new())
        }
        async fn set_badge_count(&self, _count: u32) {}
        async fn clear_delivered(&self) {}
        fn take_events(
            &self,
        ) -> Option<tokio::sync::mpsc::UnboundedReceiver<crate::dispatch::DispatcherEvent>> {
            None
        }
    }

    #[tokio::test]
    async fn test_failed_cancellation_blocks_deletion() {
        let store = MemoryStore::new();
        let coordinator = SchedulingCoordinator::new(
            Arc::new(store.clone()),
            Arc::new(BrokenCancelDispatcher),
            expander(),
        );

        let reminder = Reminder::new("keep me", Utc::now() + Duration::hours(1), RepeatRule::None);
        store.insert(&reminder).await.unwrap();

        let err = coordinator.delete(&reminder.id).await.unwrap_err();
        assert!(matches!(err, EngineError::CancellationFailed { .. }));
        // Fail closed: the record survives for a later retry
        assert!(store.fetch_by_id(&reminder.id).await.unwrap().is_some());
    }
}
