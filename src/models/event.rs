//! Calendar events

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A calendar event as stored in the `events` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    /// Wall-clock time, `HH:MM` (the store may append `:SS`)
    pub time: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Time trimmed to `HH:MM` for display
    pub fn short_time(&self) -> &str {
        self.time.get(..5).unwrap_or(&self.time)
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.created_by == user_id
    }
}

/// Insert payload for `events`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: String,
    pub created_by: String,
}

/// Update payload for `events`; ownership never changes
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EventChanges {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_row_deserialize() {
        let row = r#"{
            "id": "e-1",
            "title": "Hot Sale",
            "description": "Preparar stock",
            "date": "2024-05-13",
            "time": "09:00:00",
            "created_by": "u-1",
            "created_at": "2024-05-01T10:00:00.123456+00:00"
        }"#;

        let event: Event = serde_json::from_str(row).unwrap();
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2024, 5, 13).unwrap());
        assert_eq!(event.short_time(), "09:00");
        assert!(event.is_owned_by("u-1"));
        assert!(!event.is_owned_by("u-2"));
    }
}
