use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use fern_core::config::CalendarConfig;
use fern_core::{CalendarError, CalendarEvent, CalendarGateway, NewCalendarEvent};
use reqwest::{Client, Response, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Google Calendar v3 over REST, authenticated with a bearer access token.
pub struct GoogleCalendarGateway {
    client: Client,
    base_url: String,
    calendar_id: String,
    access_token: SecretString,
    timezone: Tz,
}

impl GoogleCalendarGateway {
    pub fn from_config(config: &CalendarConfig, timezone: Tz) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            calendar_id: config.calendar_id.clone(),
            access_token: config.access_token.clone(),
            timezone,
        })
    }

    fn events_url(&self) -> Result<Url, CalendarError> {
        events_url(&self.base_url, &self.calendar_id)
    }
}

#[async_trait]
impl CalendarGateway for GoogleCalendarGateway {
    async fn list_events_for_day(
        &self,
        day: NaiveDate,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let start = local_midnight(day, self.timezone);
        let end = local_midnight(day + chrono::Duration::days(1), self.timezone);

        let response = self
            .client
            .get(self.events_url()?)
            .bearer_auth(self.access_token.expose_secret())
            .query(&[
                ("timeMin", start.to_rfc3339()),
                ("timeMax", end.to_rfc3339()),
                ("singleEvents", "true".to_owned()),
                ("orderBy", "startTime".to_owned()),
                ("timeZone", self.timezone.name().to_owned()),
            ])
            .send()
            .await
            .map_err(|error| CalendarError::Request(error.to_string()))?;

        let page: EventsPage = accept(response)
            .await?
            .json()
            .await
            .map_err(|error| CalendarError::Decode(error.to_string()))?;

        let events: Vec<CalendarEvent> =
            page.items.into_iter().filter_map(|item| item.into_event(self.timezone)).collect();
        debug!(day = %day, count = events.len(), "calendar events fetched");
        Ok(events)
    }

    async fn insert_event(&self, event: NewCalendarEvent) -> Result<String, CalendarError> {
        let response = self
            .client
            .post(self.events_url()?)
            .bearer_auth(self.access_token.expose_secret())
            .json(&InsertBody::from(&event))
            .send()
            .await
            .map_err(|error| CalendarError::Request(error.to_string()))?;

        let inserted: InsertedEvent = accept(response)
            .await?
            .json()
            .await
            .map_err(|error| CalendarError::Decode(error.to_string()))?;

        inserted.html_link.or(inserted.id).ok_or_else(|| {
            CalendarError::Decode("inserted event carried neither htmlLink nor id".to_owned())
        })
    }
}

fn events_url(base_url: &str, calendar_id: &str) -> Result<Url, CalendarError> {
    let mut url = Url::parse(base_url)
        .map_err(|error| CalendarError::Request(format!("invalid calendar base url: {error}")))?;
    {
        let mut segments = url.path_segments_mut().map_err(|()| {
            CalendarError::Request("calendar base url cannot carry a path".to_owned())
        })?;
        segments.pop_if_empty().extend(["calendars", calendar_id, "events"]);
    }
    Ok(url)
}

async fn accept(response: Response) -> Result<Response, CalendarError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(CalendarError::Rejected { status: status.as_u16(), message })
}

/// Start of `day` in `timezone`. A midnight skipped by a DST jump falls back
/// to the same wall-clock reading in UTC.
fn local_midnight(day: NaiveDate, timezone: Tz) -> DateTime<Tz> {
    let naive = day.and_time(NaiveTime::MIN);
    timezone
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| timezone.from_utc_datetime(&naive))
}

#[derive(Debug, Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    start: EventTime,
    end: EventTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    #[serde(default)]
    date_time: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

impl EventItem {
    fn into_event(self, timezone: Tz) -> Option<CalendarEvent> {
        let title = self.summary.unwrap_or_else(|| "(untitled)".to_owned());
        let description = self.description.unwrap_or_default();

        if let (Some(first), Some(end)) = (self.start.date.as_deref(), self.end.date.as_deref()) {
            let first = NaiveDate::parse_from_str(first, "%Y-%m-%d").ok()?;
            // All-day end dates are exclusive.
            let last = NaiveDate::parse_from_str(end, "%Y-%m-%d")
                .ok()
                .and_then(|end| end.pred_opt())
                .filter(|last| *last >= first)
                .unwrap_or(first);
            return Some(CalendarEvent::all_day(title, first, last, description));
        }

        let (Some(start), Some(end)) = (
            local_time(self.start.date_time.as_deref(), timezone),
            local_time(self.end.date_time.as_deref(), timezone),
        ) else {
            warn!(title = %title, "skipping calendar event without readable times");
            return None;
        };
        Some(CalendarEvent::timed(title, start, end, description))
    }
}

fn local_time(raw: Option<&str>, timezone: Tz) -> Option<NaiveDateTime> {
    let parsed = DateTime::parse_from_rfc3339(raw?).ok()?;
    Some(parsed.with_timezone(&timezone).naive_local())
}

#[derive(Debug, Serialize)]
struct InsertBody<'a> {
    summary: &'a str,
    description: &'a str,
    start: InsertTime<'a>,
    end: InsertTime<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertTime<'a> {
    date_time: String,
    time_zone: &'a str,
}

impl<'a> From<&'a NewCalendarEvent> for InsertBody<'a> {
    fn from(event: &'a NewCalendarEvent) -> Self {
        let wall_clock = |at: NaiveDateTime| at.format("%Y-%m-%dT%H:%M:%S").to_string();
        Self {
            summary: &event.title,
            description: &event.description,
            start: InsertTime { date_time: wall_clock(event.start), time_zone: &event.timezone },
            end: InsertTime { date_time: wall_clock(event.end), time_zone: &event.timezone },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertedEvent {
    #[serde(default)]
    html_link: Option<String>,
    #[serde(default)]
    id: Option<String>,
}
