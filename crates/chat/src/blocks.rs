use chrono::NaiveDateTime;
use fern_core::{CalendarEvent, EventDraft, UserId};
use serde::Serialize;

pub const EMBED_COLOR: u32 = 0x00ff00;
pub const NOTICE_COLOR: u32 = 0xffa500;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

impl Embed {
    pub fn field(&self, name: &str) -> Option<&EmbedField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Everything the bot can put into one chat message: plain content, one embed,
/// or both.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
}

impl MessageTemplate {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), embed: None }
    }

    pub fn embed(embed: Embed) -> Self {
        Self { content: None, embed: Some(embed) }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Content plus every embed field, for logs and assertions.
    pub fn plain_text(&self) -> String {
        let mut parts = Vec::new();
        if let Some(content) = &self.content {
            parts.push(content.clone());
        }
        if let Some(embed) = &self.embed {
            parts.push(embed.title.clone());
            if !embed.description.is_empty() {
                parts.push(embed.description.clone());
            }
            for field in &embed.fields {
                parts.push(format!("{}: {}", field.name, field.value));
            }
        }
        parts.join("\n")
    }
}

pub struct MessageBuilder {
    title: String,
    description: String,
    color: u32,
    fields: Vec<EmbedField>,
}

impl MessageBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            color: EMBED_COLOR,
            fields: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn fields<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut FieldsBuilder),
    {
        let mut builder = FieldsBuilder::default();
        build(&mut builder);
        self.fields.extend(builder.build());
        self
    }

    pub fn build_embed(self) -> Embed {
        Embed {
            title: self.title,
            description: self.description,
            color: self.color,
            fields: self.fields,
        }
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate::embed(self.build_embed())
    }
}

#[derive(Default)]
pub struct FieldsBuilder {
    fields: Vec<EmbedField>,
}

impl FieldsBuilder {
    pub fn block(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(name, value, false)
    }

    pub fn inline(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(name, value, true)
    }

    fn push(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> &mut Self {
        self.fields.push(EmbedField { name: name.into(), value: value.into(), inline });
        self
    }

    fn build(self) -> Vec<EmbedField> {
        self.fields
    }
}

pub fn help_message(author: &UserId) -> MessageTemplate {
    MessageTemplate::text(format!(
        "{} Here are the commands you can use:\n\
         - `task [description]`: Add a new task.\n\
         - `my tasks`: List your tasks with options to delete.\n\
         - `fern list please`: List today's scheduled events.\n\
         - `event [title]`: Add a new event to the calendar.\n\
         - `remove task [x]`: Remove task number x.",
        author.mention()
    ))
}

pub fn task_added_message(task: &str) -> MessageTemplate {
    MessageTemplate::text(format!("Task added to your list: `{task}`"))
}

pub fn task_missing_message() -> MessageTemplate {
    MessageTemplate::text("Please specify a task after 'task'.")
}

pub fn task_removed_message(task: &str) -> MessageTemplate {
    MessageTemplate::text(format!("Task removed: `{task}`"))
}

pub fn invalid_task_number_message() -> MessageTemplate {
    MessageTemplate::text("Invalid task number.")
}

pub fn remove_task_usage_message() -> MessageTemplate {
    MessageTemplate::text("Please specify the task number to remove, e.g., 'remove task 2'.")
}

pub fn event_title_missing_message() -> MessageTemplate {
    MessageTemplate::text("Please specify an event after 'event'.")
}

pub fn no_tasks_message(user: &UserId) -> MessageTemplate {
    MessageTemplate::text(format!("{}, you have no tasks.", user.mention()))
}

/// Task list embed. `highlight` marks the cursor entry as `> text <`.
pub fn task_list_embed(display_name: &str, tasks: &[String], highlight: Option<usize>) -> Embed {
    let builder = MessageBuilder::new(format!("{display_name}'s Task List"));
    if tasks.is_empty() {
        return builder.description("No tasks left. Nice work!").build_embed();
    }

    builder
        .description("You really need to get this stuff done...")
        .fields(|fields| {
            for (index, task) in tasks.iter().enumerate() {
                let value = if highlight == Some(index) {
                    format!("> {task} <")
                } else {
                    task.clone()
                };
                fields.block(task_field_name(index + 1), value);
            }
        })
        .build_embed()
}

pub fn task_field_name(number: usize) -> String {
    format!(":lotus: Task {number}")
}

pub fn task_list_message(
    user: &UserId,
    display_name: &str,
    tasks: &[String],
    highlight: Option<usize>,
) -> MessageTemplate {
    MessageTemplate::embed(task_list_embed(display_name, tasks, highlight))
        .with_content(format!("{}, here are your tasks:", user.mention()))
}

pub fn event_draft_message(draft: &EventDraft) -> MessageTemplate {
    MessageBuilder::new("Event Details")
        .description(
            "React with the arrows to adjust the event time, ✅ to confirm, or ❌ to cancel.",
        )
        .fields(|fields| {
            event_fields(fields, draft);
        })
        .build()
}

pub fn event_confirmed_message(draft: &EventDraft, link: &str) -> MessageTemplate {
    MessageBuilder::new("Event Created")
        .description(format!("Added to the calendar: {link}"))
        .fields(|fields| {
            event_fields(fields, draft);
        })
        .build()
}

pub fn event_cancelled_message() -> MessageTemplate {
    MessageBuilder::new("Event Cancelled")
        .description("Nothing was added to the calendar.")
        .color(NOTICE_COLOR)
        .build()
}

pub fn event_failed_message(
    draft: &EventDraft,
    summary: &str,
    correlation_id: &str,
) -> MessageTemplate {
    MessageBuilder::new("Event Not Created")
        .description(format!(":warning: {summary}"))
        .color(NOTICE_COLOR)
        .fields(|fields| {
            event_fields(fields, draft);
            fields.block("Correlation ID", correlation_id);
        })
        .build()
}

fn event_fields(fields: &mut FieldsBuilder, draft: &EventDraft) {
    fields
        .block("Summary", draft.summary())
        .inline("Date", draft.start().format("%Y-%m-%d").to_string())
        .inline("Start Time", draft.start().format("%H:%M").to_string())
        .inline("End Time", draft.end().format("%H:%M").to_string());
}

pub fn events_list_message(events: &[CalendarEvent]) -> MessageTemplate {
    if events.is_empty() {
        return MessageTemplate::text("No events found for today.");
    }

    MessageBuilder::new("Today's Events")
        .fields(|fields| {
            for event in events {
                fields.block(event.title.clone(), event_time_range(event));
            }
        })
        .build()
}

fn event_time_range(event: &CalendarEvent) -> String {
    if event.all_day {
        return "All day".to_owned();
    }
    format!("{} - {}", twelve_hour(event.start), twelve_hour(event.end))
}

fn twelve_hour(at: NaiveDateTime) -> String {
    at.format("%I:%M %p").to_string()
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageTemplate::text(format!(":warning: {summary}\nCorrelation ID: {correlation_id}"))
}

pub fn digest_greeting_message() -> MessageTemplate {
    MessageTemplate::text("Good morning! Here are everyone's tasks and events for today:")
}

pub fn digest_nobody_message() -> MessageTemplate {
    MessageTemplate::text("There are no tasks for anyone today.")
}

pub fn digest_user_tasks_message(
    user: &UserId,
    display_name: &str,
    tasks: &[String],
) -> MessageTemplate {
    MessageTemplate::embed(task_list_embed(display_name, tasks, None))
        .with_content(format!("{}, here are your tasks for today:", user.mention()))
}

pub fn digest_user_no_tasks_message(user: &UserId) -> MessageTemplate {
    MessageTemplate::text(format!("{}, you have no tasks for today.", user.mention()))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use fern_core::{CalendarEvent, EventDraft, UserId};

    use super::{
        event_draft_message, events_list_message, help_message, task_field_name,
        task_list_embed, task_list_message, MessageBuilder,
    };

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn builder_collects_fields_in_order() {
        let message = MessageBuilder::new("title")
            .description("desc")
            .fields(|fields| {
                fields.block("a", "1").inline("b", "2");
            })
            .build();

        let embed = message.embed.expect("embed");
        assert_eq!(embed.fields.len(), 2);
        assert!(!embed.fields[0].inline);
        assert!(embed.fields[1].inline);
        assert!(message.content.is_none());
    }

    #[test]
    fn help_mentions_the_author_and_lists_commands() {
        let message = help_message(&UserId("U42".to_owned()));
        let text = message.content.expect("help is plain text");
        assert!(text.starts_with("<@U42>"));
        for command in ["task", "my tasks", "fern list please", "event", "remove task"] {
            assert!(text.contains(command), "help should mention `{command}`");
        }
    }

    #[test]
    fn task_list_highlights_only_the_cursor_entry() {
        let tasks = vec!["buy milk".to_owned(), "walk dog".to_owned()];
        let embed = task_list_embed("Ada", &tasks, Some(1));

        assert_eq!(embed.title, "Ada's Task List");
        assert_eq!(embed.field(&task_field_name(1)).map(|f| f.value.as_str()), Some("buy milk"));
        assert_eq!(embed.field(&task_field_name(2)).map(|f| f.value.as_str()), Some("> walk dog <"));
    }

    #[test]
    fn empty_task_list_renders_explicit_empty_state() {
        let embed = task_list_embed("Ada", &[], None);
        assert!(embed.fields.is_empty());
        assert!(embed.description.contains("No tasks left"));
    }

    #[test]
    fn task_list_message_addresses_the_owner() {
        let message =
            task_list_message(&UserId("U1".to_owned()), "Ada", &["x".to_owned()], Some(0));
        assert_eq!(message.content.as_deref(), Some("<@U1>, here are your tasks:"));
    }

    #[test]
    fn event_draft_shows_date_and_times() {
        let draft = EventDraft::new("standup", at(9, 10, 0));
        let embed = event_draft_message(&draft).embed.expect("embed");

        assert_eq!(embed.field("Summary").map(|f| f.value.as_str()), Some("standup"));
        assert_eq!(embed.field("Date").map(|f| f.value.as_str()), Some("2026-03-09"));
        assert_eq!(embed.field("Start Time").map(|f| f.value.as_str()), Some("10:00"));
        assert_eq!(embed.field("End Time").map(|f| f.value.as_str()), Some("11:00"));
    }

    #[test]
    fn events_list_uses_twelve_hour_ranges_and_all_day() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).expect("date");
        let events = vec![
            CalendarEvent::all_day("holiday", date, date, ""),
            CalendarEvent::timed("review", at(9, 13, 30), at(9, 14, 15), ""),
        ];

        let embed = events_list_message(&events).embed.expect("embed");
        assert_eq!(embed.title, "Today's Events");
        assert_eq!(embed.field("holiday").map(|f| f.value.as_str()), Some("All day"));
        assert_eq!(embed.field("review").map(|f| f.value.as_str()), Some("01:30 PM - 02:15 PM"));
    }

    #[test]
    fn no_events_is_plain_text() {
        let message = events_list_message(&[]);
        assert_eq!(message.content.as_deref(), Some("No events found for today."));
        assert!(message.embed.is_none());
    }
}
