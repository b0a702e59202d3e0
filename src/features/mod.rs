//! # Features Layer
//!
//! The engine's feature modules: occurrence expansion, scheduling,
//! delivery routing and the in-app banner queue.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Feature version registry for the startup report
//! - 1.0.0: Initial creation

pub mod banners;
pub mod delivery;
pub mod occurrence;
pub mod scheduling;

// Re-export feature items
pub use banners::{Banner, BannerQueue};
pub use delivery::DeliveryRouter;
pub use occurrence::OccurrenceExpander;
pub use scheduling::{ReconcileReport, ScheduleOutcome, SchedulingCoordinator};

/// Name and version of one feature, for the startup report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureInfo {
    pub name: &'static str,
    pub version: &'static str,
}

/// Engine package version
pub fn get_engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Versions of the feature modules, mirrored from their module headers
pub fn get_features() -> Vec<FeatureInfo> {
    vec![
        FeatureInfo {
            name: "occurrence",
            version: "1.0.0",
        },
        FeatureInfo {
            name: "scheduling",
            version: "1.1.0",
        },
        FeatureInfo {
            name: "delivery",
            version: "1.1.0",
        },
        FeatureInfo {
            name: "banners",
            version: "1.0.0",
        },
    ]
}
