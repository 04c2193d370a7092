//! Calendar events and the month grid

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};

use super::{Dashboard, DashboardError, DashboardResult};
use crate::forms::EventForm;
use crate::models::Event;

impl Dashboard {
    /// All events ordered by date
    pub async fn events(&self) -> DashboardResult<Vec<Event>> {
        self.require_user()?;
        let events = self.call("list_events", self.store.list_events()).await?;
        self.remember(&events);
        Ok(events)
    }

    /// Events on one day ordered by time
    pub async fn events_on(&self, date: NaiveDate) -> DashboardResult<Vec<Event>> {
        self.require_user()?;
        let events = self
            .call("list_events_on", self.store.list_events_on(date))
            .await?;
        self.remember(&events);
        Ok(events)
    }

    pub async fn create_event(&self, form: &EventForm) -> DashboardResult<Event> {
        let user = self.require_user()?;
        let event = form.to_new_event(&user.id)?;

        let created = self.call("create_event", self.store.create_event(&event)).await?;
        tracing::info!(event_id = %created.id, date = %created.date, "Event created");
        self.remember(std::slice::from_ref(&created));
        Ok(created)
    }

    /// Edit an event the current user created
    pub async fn update_event(&self, id: &str, form: &EventForm) -> DashboardResult<Event> {
        let user = self.require_user()?;
        self.check_owner(id, &user.id)?;
        let changes = form.to_changes()?;

        let updated = self
            .call("update_event", self.store.update_event(id, &changes))
            .await?;
        tracing::info!(event_id = %updated.id, "Event updated");
        self.remember(std::slice::from_ref(&updated));
        Ok(updated)
    }

    /// Delete an event the current user created
    pub async fn delete_event(&self, id: &str) -> DashboardResult<()> {
        let user = self.require_user()?;
        self.check_owner(id, &user.id)?;

        self.call("delete_event", self.store.delete_event(id)).await?;
        self.event_cache().remove(id);
        tracing::info!(event_id = %id, "Event deleted");
        Ok(())
    }

    /// Refuse before any backend call unless `user_id` created the event
    fn check_owner(&self, id: &str, user_id: &str) -> DashboardResult<()> {
        let cache = self.event_cache();
        let event = cache
            .get(id)
            .ok_or_else(|| DashboardError::UnknownEvent(id.to_string()))?;
        if !event.is_owned_by(user_id) {
            tracing::warn!(event_id = %id, "Refusing to modify another user's event");
            return Err(DashboardError::NotOwner(id.to_string()));
        }
        Ok(())
    }

    fn remember(&self, events: &[Event]) {
        let mut cache = self.event_cache();
        for event in events {
            cache.insert(event.id.clone(), event.clone());
        }
    }
}

/// Sunday-first layout of one month
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    first_day: NaiveDate,
    days_in_month: u32,
}

impl MonthGrid {
    /// Grid for `month` (1-12) of `year`; `None` for an invalid month
    pub fn for_month(year: i32, month: u32) -> Option<Self> {
        let first_day = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next_month = first_day.checked_add_months(Months::new(1))?;
        let days_in_month = next_month.signed_duration_since(first_day).num_days() as u32;
        Some(Self {
            first_day,
            days_in_month,
        })
    }

    /// Grid for the month containing `date`
    pub fn containing(date: NaiveDate) -> Self {
        Self::for_month(date.year(), date.month()).unwrap_or(Self {
            first_day: date,
            days_in_month: 1,
        })
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn days_in_month(&self) -> u32 {
        self.days_in_month
    }

    /// Empty cells before the 1st
    pub fn leading_blanks(&self) -> usize {
        self.first_day.weekday().num_days_from_sunday() as usize
    }

    /// Every day of the month in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.first_day.iter_days().take(self.days_in_month as usize)
    }

    /// Leading blanks followed by day cells
    pub fn cells(&self) -> Vec<Option<NaiveDate>> {
        std::iter::repeat(None)
            .take(self.leading_blanks())
            .chain(self.days().map(Some))
            .collect()
    }

    /// Cells split into rows of seven, the last row padded with blanks
    pub fn weeks(&self) -> Vec<Vec<Option<NaiveDate>>> {
        let mut cells = self.cells();
        let padding = (7 - cells.len() % 7) % 7;
        cells.extend(std::iter::repeat(None).take(padding));
        cells.chunks(7).map(|week| week.to_vec()).collect()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.first_day.year() && date.month() == self.first_day.month()
    }

    /// e.g. "May 2024"
    pub fn title(&self) -> String {
        self.first_day.format("%B %Y").to_string()
    }

    pub fn previous(&self) -> Option<Self> {
        let date = self.first_day.checked_sub_months(Months::new(1))?;
        Self::for_month(date.year(), date.month())
    }

    pub fn next(&self) -> Option<Self> {
        let date = self.first_day.checked_add_months(Months::new(1))?;
        Self::for_month(date.year(), date.month())
    }

    /// Events in this month bucketed by day, each day ordered by time
    pub fn events_by_day<'a>(&self, events: &'a [Event]) -> BTreeMap<NaiveDate, Vec<&'a Event>> {
        let mut buckets: BTreeMap<NaiveDate, Vec<&'a Event>> = BTreeMap::new();
        for event in events.iter().filter(|e| self.contains(e.date)) {
            buckets.entry(event.date).or_default().push(event);
        }
        for day in buckets.values_mut() {
            day.sort_by(|a, b| a.short_time().cmp(b.short_time()));
        }
        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(id: &str, day: NaiveDate, time: &str) -> Event {
        Event {
            id: id.to_string(),
            title: id.to_uppercase(),
            description: String::new(),
            date: day,
            time: time.to_string(),
            created_by: "u-1".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_month_layout() {
        // 1 May 2024 is a Wednesday
        let grid = MonthGrid::for_month(2024, 5).unwrap();
        assert_eq!(grid.leading_blanks(), 3);
        assert_eq!(grid.days_in_month(), 31);
        assert_eq!(grid.title(), "May 2024");

        let cells = grid.cells();
        assert_eq!(cells.len(), 34);
        assert_eq!(cells[2], None);
        assert_eq!(cells[3], Some(date(2024, 5, 1)));
        assert_eq!(cells.last().copied().flatten(), Some(date(2024, 5, 31)));

        let weeks = grid.weeks();
        assert_eq!(weeks.len(), 5);
        assert!(weeks.iter().all(|w| w.len() == 7));
    }

    #[test]
    fn test_leap_february_and_sunday_start() {
        let feb = MonthGrid::for_month(2024, 2).unwrap();
        assert_eq!(feb.days_in_month(), 29);
        assert_eq!(feb.leading_blanks(), 4);

        // 1 September 2024 is a Sunday
        let sept = MonthGrid::for_month(2024, 9).unwrap();
        assert_eq!(sept.leading_blanks(), 0);
        assert_eq!(sept.days_in_month(), 30);
    }

    #[test]
    fn test_invalid_month() {
        assert!(MonthGrid::for_month(2024, 13).is_none());
        assert!(MonthGrid::for_month(2024, 0).is_none());
    }

    #[test]
    fn test_navigation_across_years() {
        let dec = MonthGrid::for_month(2024, 12).unwrap();
        assert_eq!(dec.next().unwrap().first_day(), date(2025, 1, 1));
        let jan = MonthGrid::containing(date(2025, 1, 17));
        assert_eq!(jan.previous().unwrap(), dec);
    }

    #[test]
    fn test_events_by_day() {
        let events = vec![
            event("late", date(2024, 5, 13), "18:00:00"),
            event("early", date(2024, 5, 13), "09:00"),
            event("other", date(2024, 5, 20), "12:00"),
            event("june", date(2024, 6, 1), "10:00"),
        ];

        let grid = MonthGrid::for_month(2024, 5).unwrap();
        let buckets = grid.events_by_day(&events);

        assert_eq!(buckets.len(), 2);
        let ids: Vec<_> = buckets[&date(2024, 5, 13)]
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert!(!buckets.contains_key(&date(2024, 6, 1)));
    }
}
