use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Fixed length of every event proposed through an event-creation session.
pub const EVENT_DURATION_HOURS: i64 = 1;

/// An event being edited before it is committed to the calendar.
///
/// Times are wall-clock times in the calendar's timezone. `end` always sits
/// exactly [`EVENT_DURATION_HOURS`] after `start`; the only mutator is
/// [`EventDraft::shift`], which moves both ends together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    summary: String,
    description: String,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl EventDraft {
    pub fn new(summary: impl Into<String>, start: NaiveDateTime) -> Self {
        Self {
            summary: summary.into(),
            description: String::new(),
            start,
            end: start + Self::duration(),
        }
    }

    /// Draft starting at the next whole hour after `now`.
    pub fn starting_next_hour(summary: impl Into<String>, now: NaiveDateTime) -> Self {
        Self::new(summary, next_whole_hour(now))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn duration() -> Duration {
        Duration::hours(EVENT_DURATION_HOURS)
    }

    pub fn shift(&mut self, offset: Duration) {
        self.start += offset;
        self.end += offset;
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn to_new_event(&self, timezone: impl Into<String>) -> NewCalendarEvent {
        NewCalendarEvent {
            title: self.summary.clone(),
            description: self.description.clone(),
            start: self.start,
            end: self.end,
            timezone: timezone.into(),
        }
    }
}

/// Truncates to the hour and adds one hour, so 09:00 and 09:59 both give 10:00.
pub fn next_whole_hour(now: NaiveDateTime) -> NaiveDateTime {
    let truncated = now
        .with_nanosecond(0)
        .and_then(|value| value.with_second(0))
        .and_then(|value| value.with_minute(0))
        .unwrap_or(now);
    truncated + Duration::hours(1)
}

/// An event to insert into the calendar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCalendarEvent {
    pub title: String,
    pub description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub timezone: String,
}

/// An event read back from the calendar, with times in the calendar timezone.
///
/// All-day events carry midnight of their first and last day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub description: String,
    pub all_day: bool,
}

impl CalendarEvent {
    pub fn timed(
        title: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        description: impl Into<String>,
    ) -> Self {
        Self { title: title.into(), start, end, description: description.into(), all_day: false }
    }

    pub fn all_day(
        title: impl Into<String>,
        first_day: NaiveDate,
        last_day: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            start: first_day.and_time(chrono::NaiveTime::MIN),
            end: last_day.and_time(chrono::NaiveTime::MIN),
            description: description.into(),
            all_day: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    use super::{next_whole_hour, EventDraft};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .and_then(|date| date.and_hms_opt(hour, minute, 27))
            .expect("valid timestamp")
    }

    #[test]
    fn next_whole_hour_rounds_up_from_any_minute() {
        assert_eq!(next_whole_hour(at(9, 0)), at(10, 0) - Duration::seconds(27));
        assert_eq!(next_whole_hour(at(9, 59)), at(10, 0) - Duration::seconds(27));
    }

    #[test]
    fn next_whole_hour_rolls_over_midnight() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 15)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("valid timestamp");
        assert_eq!(next_whole_hour(at(23, 30)), expected);
    }

    #[test]
    fn shift_moves_both_ends() {
        let mut draft = EventDraft::starting_next_hour("standup", at(9, 12));
        draft.shift(Duration::days(-1));
        draft.shift(Duration::hours(3));

        assert_eq!(draft.end() - draft.start(), EventDraft::duration());
        assert_eq!(draft.start().format("%Y-%m-%d %H:%M").to_string(), "2026-03-13 13:00");
    }

    #[test]
    fn new_event_carries_draft_fields() {
        let draft = EventDraft::new("review", at(14, 0)).with_description("quarterly");
        let event = draft.to_new_event("America/Toronto");

        assert_eq!(event.title, "review");
        assert_eq!(event.description, "quarterly");
        assert_eq!(event.end - event.start, Duration::hours(1));
        assert_eq!(event.timezone, "America/Toronto");
    }
}
