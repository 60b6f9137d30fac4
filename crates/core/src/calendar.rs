use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::event::{CalendarEvent, NewCalendarEvent};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("calendar request failed: {0}")]
    Request(String),
    #[error("calendar response could not be decoded: {0}")]
    Decode(String),
    #[error("calendar rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Remote calendar the bot reads today's events from and inserts events into.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// Events overlapping `day` in the calendar timezone, ordered by start.
    async fn list_events_for_day(&self, day: NaiveDate)
        -> Result<Vec<CalendarEvent>, CalendarError>;

    /// Inserts `event` and returns its external link.
    async fn insert_event(&self, event: NewCalendarEvent) -> Result<String, CalendarError>;
}

/// Calendar kept in process memory. Records every insert so tests can assert
/// on exactly what was committed.
#[derive(Default)]
pub struct InMemoryCalendarGateway {
    events: Mutex<Vec<CalendarEvent>>,
    inserted: Mutex<Vec<NewCalendarEvent>>,
    fail_with: Mutex<Option<CalendarError>>,
}

impl InMemoryCalendarGateway {
    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self { events: Mutex::new(events), ..Self::default() }
    }

    /// Makes every subsequent call fail with `error`.
    pub fn fail_with(&self, error: CalendarError) {
        if let Ok(mut slot) = self.fail_with.lock() {
            *slot = Some(error);
        }
    }

    pub fn inserted(&self) -> Vec<NewCalendarEvent> {
        self.inserted.lock().map(|inserted| inserted.clone()).unwrap_or_default()
    }

    fn check_failure(&self) -> Result<(), CalendarError> {
        match self.fail_with.lock() {
            Ok(slot) => slot.clone().map_or(Ok(()), Err),
            Err(_) => Err(CalendarError::Request("calendar fake lock poisoned".to_owned())),
        }
    }
}

#[async_trait]
impl CalendarGateway for InMemoryCalendarGateway {
    async fn list_events_for_day(
        &self,
        day: NaiveDate,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        self.check_failure()?;
        let events = self
            .events
            .lock()
            .map_err(|_| CalendarError::Request("calendar fake lock poisoned".to_owned()))?;

        let mut matching: Vec<CalendarEvent> = events
            .iter()
            .filter(|event| event.start.date() <= day && day <= event.end.date())
            .cloned()
            .collect();
        matching.sort_by_key(|event| event.start);
        Ok(matching)
    }

    async fn insert_event(&self, event: NewCalendarEvent) -> Result<String, CalendarError> {
        self.check_failure()?;
        let mut inserted = self
            .inserted
            .lock()
            .map_err(|_| CalendarError::Request("calendar fake lock poisoned".to_owned()))?;
        let mut events = self
            .events
            .lock()
            .map_err(|_| CalendarError::Request("calendar fake lock poisoned".to_owned()))?;

        events.push(CalendarEvent::timed(
            event.title.clone(),
            event.start,
            event.end,
            event.description.clone(),
        ));
        inserted.push(event);
        Ok(format!("memory://calendar/events/{}", inserted.len()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{CalendarError, CalendarGateway, InMemoryCalendarGateway};
    use crate::domain::event::{CalendarEvent, EventDraft};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).expect("valid date")
    }

    fn at(d: u32, hour: u32) -> NaiveDateTime {
        day(d).and_hms_opt(hour, 0, 0).expect("valid time")
    }

    #[tokio::test]
    async fn lists_only_the_requested_day_in_start_order() {
        let gateway = InMemoryCalendarGateway::with_events(vec![
            CalendarEvent::timed("late", at(10, 16), at(10, 17), ""),
            CalendarEvent::timed("tomorrow", at(11, 9), at(11, 10), ""),
            CalendarEvent::all_day("holiday", day(10), day(10), "office closed"),
            CalendarEvent::timed("early", at(10, 8), at(10, 9), ""),
        ]);

        let events = gateway.list_events_for_day(day(10)).await.expect("list");
        let titles: Vec<&str> = events.iter().map(|event| event.title.as_str()).collect();
        assert_eq!(titles, ["holiday", "early", "late"]);
    }

    #[tokio::test]
    async fn insert_records_and_becomes_listable() {
        let gateway = InMemoryCalendarGateway::default();
        let draft = EventDraft::new("retro", at(12, 14));

        let link = gateway.insert_event(draft.to_new_event("UTC")).await.expect("insert");
        assert_eq!(link, "memory://calendar/events/1");
        assert_eq!(gateway.inserted().len(), 1);
        assert_eq!(gateway.list_events_for_day(day(12)).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn injected_failures_surface_on_every_call() {
        let gateway = InMemoryCalendarGateway::default();
        gateway.fail_with(CalendarError::Rejected { status: 403, message: "forbidden".to_owned() });

        assert!(gateway.list_events_for_day(day(1)).await.is_err());
        assert!(gateway.insert_event(EventDraft::new("x", at(1, 9)).to_new_event("UTC")).await.is_err());
        assert!(gateway.inserted().is_empty());
    }
}
