// Core layer - shared types, configuration, and errors
pub mod core;

// Features layer - all feature modules
pub mod features;

// Infrastructure layer - persistence and the dispatcher boundary
pub mod database;
pub mod dispatch;

// Application layer
pub mod engine;

// Re-export core items for convenience
pub use crate::core::{Config, DeliveryPayload, EngineError, Lifecycle};

// Re-export feature items
pub use crate::features::{
    get_engine_version, get_features, Banner, BannerQueue, DeliveryRouter, FeatureInfo,
    OccurrenceExpander, ReconcileReport, ScheduleOutcome, SchedulingCoordinator,
};

// Re-export infrastructure items
pub use crate::database::{MemoryStore, Reminder, ReminderStore, RepeatRule, SqliteStore};
pub use crate::dispatch::{
    DispatcherEvent, InProcessDispatcher, InteractionAction, NotificationDispatcher,
    PermissionStatus,
};

pub use crate::engine::Engine;
