//! In-app banner queue
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//!
//! A reminder id is surfaced at most once per app session: dismissal and
//! display timeout remove a banner from the visible queue but leave the id
//! in the shown set, so an OS redelivery cannot bring it back. The shown set
//! dies with the process; cross-restart protection is the delivery router's
//! job, not this queue's.

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::database::ReminderStore;

/// Capacity of the visible-list broadcast channel
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// One on-screen banner
#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub reminder_id: String,
    pub title: String,
    pub fire_at: DateTime<Utc>,
    pub shown_at: DateTime<Utc>,
}

pub struct BannerQueue {
    store: Arc<dyn ReminderStore>,
    visible: RwLock<VecDeque<Banner>>,
    /// Session-scoped dedup: id -> when it was first surfaced
    shown: DashMap<String, DateTime<Utc>>,
    updates_tx: broadcast::Sender<Vec<Banner>>,
}

impl BannerQueue {
    pub fn new(store: Arc<dyn ReminderStore>) -> Self {
        let (updates_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        BannerQueue {
            store,
            visible: RwLock::new(VecDeque::new()),
            shown: DashMap::new(),
            updates_tx,
        }
    }

    /// Observe visible-list changes. Every mutation broadcasts a fresh
    /// snapshot in display order.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<Banner>> {
        self.updates_tx.subscribe()
    }

    /// Enqueue a due banner unless this session already surfaced the id or
    /// the reminder is gone/completed. Returns whether a banner was added.
    pub async fn add_if_not_shown(
        &self,
        reminder_id: &str,
        title: &str,
        fire_at: DateTime<Utc>,
    ) -> bool {
        match self.store.fetch_by_id(reminder_id).await {
            Ok(Some(reminder)) if !reminder.is_completed => {}
            Ok(_) => {
                debug!("Banner for {reminder_id} rejected: reminder gone or completed");
                return false;
            }
            Err(e) => {
                warn!("Banner for {reminder_id} rejected: store lookup failed: {e}");
                return false;
            }
        }

        let shown_at = Utc::now();
        match self.shown.entry(reminder_id.to_string()) {
            Entry::Occupied(_) => {
                debug!("Banner for {reminder_id} rejected: already shown this session");
                return false;
            }
            Entry::Vacant(slot) => {
                slot.insert(shown_at);
            }
        }

        self.visible.write().await.push_back(Banner {
            reminder_id: reminder_id.to_string(),
            title: title.to_string(),
            fire_at,
            shown_at,
        });
        self.publish().await;
        true
    }

    /// User dismissed a banner. The id stays in the shown set.
    pub async fn dismiss(&self, reminder_id: &str) -> bool {
        let mut visible = self.visible.write().await;
        let before = visible.len();
        visible.retain(|b| b.reminder_id != reminder_id);
        let removed = visible.len() != before;
        drop(visible);
        if removed {
            self.publish().await;
        }
        removed
    }

    /// Drop banners older than the display timeout. The ids stay in the
    /// shown set. Returns how many were swept.
    pub async fn sweep_expired(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let mut visible = self.visible.write().await;
        let before = visible.len();
        visible.retain(|b| b.shown_at > cutoff);
        let swept = before - visible.len();
        drop(visible);
        if swept > 0 {
            debug!("Swept {swept} expired banner(s)");
            self.publish().await;
        }
        swept
    }

    /// Current visible banners in display (FIFO) order.
    pub async fn visible(&self) -> Vec<Banner> {
        self.visible.read().await.iter().cloned().collect()
    }

    async fn publish(&self) {
        let snapshot = self.visible().await;
        // No observers is fine; the next subscriber asks for a snapshot.
        let _ = self.updates_tx.send(snapshot);
    }
}
