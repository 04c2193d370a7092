//! Calendar event form

use chrono::{NaiveDate, NaiveTime};

use super::{required, ValidationError, ValidationResult};
use crate::models::{Event, EventChanges, NewEvent};

/// Time pre-filled for new events
pub const DEFAULT_EVENT_TIME: &str = "09:00";

/// Create / edit form for an event
#[derive(Debug, Clone, PartialEq)]
pub struct EventForm {
    pub title: String,
    pub description: String,
    pub date: Option<NaiveDate>,
    pub time: String,
}

struct ValidEvent {
    title: String,
    description: String,
    date: NaiveDate,
    time: String,
}

impl EventForm {
    /// Empty form for a day picked on the calendar
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            date: Some(date),
            time: DEFAULT_EVENT_TIME.to_string(),
        }
    }

    /// Form pre-filled from an existing event
    pub fn from_event(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            description: event.description.clone(),
            date: Some(event.date),
            time: event.short_time().to_string(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn time(mut self, time: impl Into<String>) -> Self {
        self.time = time.into();
        self
    }

    fn validate(&self) -> ValidationResult<ValidEvent> {
        let title = required(&self.title, "Title")?;
        let description = required(&self.description, "Description")?;
        let date = self.date.ok_or(ValidationError::Required("Date"))?;
        let time = parse_time(&self.time)?;
        Ok(ValidEvent {
            title,
            description,
            date,
            time,
        })
    }

    /// Insert payload owned by `created_by`
    pub fn to_new_event(&self, created_by: &str) -> ValidationResult<NewEvent> {
        let valid = self.validate()?;
        Ok(NewEvent {
            title: valid.title,
            description: valid.description,
            date: valid.date,
            time: valid.time,
            created_by: created_by.to_string(),
        })
    }

    pub fn to_changes(&self) -> ValidationResult<EventChanges> {
        let valid = self.validate()?;
        Ok(EventChanges {
            title: valid.title,
            description: valid.description,
            date: valid.date,
            time: valid.time,
        })
    }
}

/// Normalise `H:MM` / `HH:MM` to `HH:MM`
fn parse_time(value: &str) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required("Time"));
    }
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| ValidationError::InvalidTime(trimmed.to_string()))
}
