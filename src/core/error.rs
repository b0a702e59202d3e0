//! Typed errors at the engine seams
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! Scheduling and permission failures degrade to "reminder exists but will
//! not notify"; only storage and cancellation problems surface as hard
//! errors, and none of them crash the process.

use thiserror::Error;

/// Errors from a reminder store implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reminder {0} not found")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Errors from a notification dispatcher implementation
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The user denied notification permission. Non-fatal: callers keep the
    /// reminder and simply do not schedule a delivery.
    #[error("notification permission denied")]
    PermissionDenied,
    /// The dispatcher refused the registration (quota, malformed request).
    #[error("dispatcher rejected registration: {0}")]
    Rejected(String),
    /// A cancel request could not be confirmed.
    #[error("cancellation failed: {0}")]
    CancellationFailed(String),
}

/// Engine-level error taxonomy
///
/// Permission denial is not listed here: it is a schedule outcome, not a
/// failure (the reminder is kept and simply will not notify).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("scheduling failed for reminder {id}: {source}")]
    SchedulingFailed {
        id: String,
        #[source]
        source: DispatchError,
    },
    /// A callback referenced a reminder no longer in the store. Callers
    /// treat this as a benign no-op, not a failure.
    #[error("reminder {0} not found")]
    RecordNotFound(String),
    /// Cancellation could not be confirmed; dependent deletion is blocked.
    #[error("cancellation failed for reminder {id}: {source}")]
    CancellationFailed {
        id: String,
        #[source]
        source: DispatchError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let e = StoreError::NotFound("abc".to_string());
        assert_eq!(e.to_string(), "reminder abc not found");
    }

    #[test]
    fn test_engine_error_wraps_store_error() {
        let e: EngineError = StoreError::Backend("disk full".to_string()).into();
        assert!(e.to_string().contains("disk full"));
    }

    #[test]
    fn test_scheduling_failed_carries_source() {
        let e = EngineError::SchedulingFailed {
            id: "r1".to_string(),
            source: DispatchError::Rejected("quota exceeded".to_string()),
        };
        assert!(e.to_string().contains("r1"));
        assert!(e.to_string().contains("quota exceeded"));
    }
}
