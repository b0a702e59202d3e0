//! Reminder record and repeat rules
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Add series spin-off constructor
//! - 1.0.0: Initial implementation

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a reminder recurs after its first occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepeatRule {
    /// Fires once at the anchor time
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    /// Fires on each listed calendar date; time-of-day comes from engine
    /// configuration, the dates' own time components are ignored
    CustomDates { dates: Vec<NaiveDate> },
}

impl RepeatRule {
    pub fn is_repeating(&self) -> bool {
        !matches!(self, RepeatRule::None)
    }
}

/// A single reminder record
///
/// `id` is assigned at creation, stays stable for the record's lifetime and
/// doubles as the dispatcher scheduling key. `parent_id` links a one-off
/// spin-off back to the repeating series it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub fire_at: DateTime<Utc>,
    pub repeat_rule: RepeatRule,
    pub is_completed: bool,
    pub parent_id: Option<String>,
}

impl Reminder {
    pub fn new(title: impl Into<String>, fire_at: DateTime<Utc>, repeat_rule: RepeatRule) -> Self {
        Reminder {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            fire_at,
            repeat_rule,
            is_completed: false,
            parent_id: None,
        }
    }

    /// A one-off spin-off of a repeating series (snoozed occurrence).
    pub fn child_of(parent: &Reminder, fire_at: DateTime<Utc>) -> Self {
        Reminder {
            id: Uuid::new_v4().to_string(),
            title: parent.title.clone(),
            fire_at,
            repeat_rule: RepeatRule::None,
            is_completed: false,
            parent_id: Some(parent.id.clone()),
        }
    }

    /// Due means not completed and past its fire time.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed && self.fire_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_new_reminder_gets_unique_id() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let a = Reminder::new("water plants", at, RepeatRule::Daily);
        let b = Reminder::new("water plants", at, RepeatRule::Daily);
        assert_ne!(a.id, b.id);
        assert!(!a.is_completed);
        assert!(a.parent_id.is_none());
    }

    #[test]
    fn test_child_links_back_to_parent() {
        let at = ts("2024-01-01T09:00:00Z");
        let parent = Reminder::new("standup", at, RepeatRule::Daily);
        let child = Reminder::child_of(&parent, ts("2024-01-01T09:10:00Z"));
        assert_eq!(child.parent_id.as_deref(), Some(parent.id.as_str()));
        assert_eq!(child.repeat_rule, RepeatRule::None);
        assert_eq!(child.title, parent.title);
    }

    #[test]
    fn test_is_due() {
        let r = Reminder::new("x", ts("2024-01-01T09:00:00Z"), RepeatRule::None);
        assert!(r.is_due(ts("2024-01-01T09:00:00Z")));
        assert!(!r.is_due(ts("2024-01-01T08:59:59Z")));

        let mut done = r.clone();
        done.is_completed = true;
        assert!(!done.is_due(ts("2024-01-02T00:00:00Z")));
    }

    #[test]
    fn test_repeat_rule_serialization() {
        let rule = RepeatRule::CustomDates {
            dates: vec![NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()],
        };
        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains("custom_dates"));
        let back: RepeatRule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);

        let daily: RepeatRule = serde_json::from_str(r#"{"type":"daily"}"#).unwrap();
        assert_eq!(daily, RepeatRule::Daily);
        assert!(daily.is_repeating());
        assert!(!RepeatRule::None.is_repeating());
    }
}
