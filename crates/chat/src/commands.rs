use async_trait::async_trait;
use fern_core::domain::task::parse_task_number;
use fern_core::{ChannelId, MessageRef, TaskError, UserId};
use thiserror::Error;

use crate::blocks::{self, MessageTemplate};
use crate::client::ChatClientError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandContext {
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub correlation_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    AddTask { text: String },
    ListEvents,
    ListTasks,
    RemoveTask { number: Option<String> },
    CreateEvent { title: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandResponse {
    /// Reply to post into the originating channel.
    Reply(MessageTemplate),
    /// The service already posted; carries the live message.
    Posted(MessageRef),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
    #[error(transparent)]
    Chat(#[from] ChatClientError),
}

/// Parses a channel message into a command. Keywords are matched
/// case-insensitively; arguments keep the author's casing. Returns `None` for
/// ordinary chatter.
pub fn parse_chat_command(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    let lowered = trimmed.to_lowercase();

    match lowered.as_str() {
        "fern help" => return Some(ChatCommand::Help),
        "fern list please" => return Some(ChatCommand::ListEvents),
        "my tasks" => return Some(ChatCommand::ListTasks),
        _ => {}
    }

    if let Some(args) = strip_keyword(trimmed, "remove task") {
        // The number must be its own word: `remove task2` carries none.
        let number = args
            .strip_prefix(char::is_whitespace)
            .and_then(|args| args.split_whitespace().next())
            .map(str::to_owned);
        return Some(ChatCommand::RemoveTask { number });
    }

    let (head, rest) = split_first_word(trimmed);
    if head.eq_ignore_ascii_case("task") {
        return Some(ChatCommand::AddTask { text: rest.to_owned() });
    }
    if head.eq_ignore_ascii_case("event") {
        return Some(ChatCommand::CreateEvent { title: rest.to_owned() });
    }

    None
}

/// Text after `keyword` when `text` starts with it, ignoring ASCII case.
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    head.eq_ignore_ascii_case(keyword).then(|| &text[keyword.len()..])
}

fn split_first_word(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (text, ""),
    }
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: ChatCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn route(
        &self,
        command: ChatCommand,
        ctx: &CommandContext,
    ) -> Result<CommandResponse, CommandRouteError> {
        match command {
            ChatCommand::Help => Ok(CommandResponse::Reply(blocks::help_message(&ctx.user_id))),
            ChatCommand::AddTask { text } if text.is_empty() => {
                Ok(CommandResponse::Reply(blocks::task_missing_message()))
            }
            ChatCommand::AddTask { text } => self.service.add_task(text, ctx).await,
            ChatCommand::ListEvents => self.service.list_events(ctx).await,
            ChatCommand::ListTasks => self.service.list_tasks(ctx).await,
            ChatCommand::RemoveTask { number } => match parse_task_number(number.as_deref()) {
                Ok(number) => self.service.remove_task(number, ctx).await,
                Err(TaskError::MissingIndex) => {
                    Ok(CommandResponse::Reply(blocks::remove_task_usage_message()))
                }
                Err(TaskError::InvalidIndex { .. }) => {
                    Ok(CommandResponse::Reply(blocks::invalid_task_number_message()))
                }
            },
            ChatCommand::CreateEvent { title } if title.is_empty() => {
                Ok(CommandResponse::Reply(blocks::event_title_missing_message()))
            }
            ChatCommand::CreateEvent { title } => self.service.begin_event(title, ctx).await,
        }
    }
}

#[async_trait]
pub trait ChatCommandService: Send + Sync {
    async fn add_task(
        &self,
        task: String,
        ctx: &CommandContext,
    ) -> Result<CommandResponse, CommandRouteError>;

    async fn list_events(&self, ctx: &CommandContext)
        -> Result<CommandResponse, CommandRouteError>;

    async fn list_tasks(&self, ctx: &CommandContext) -> Result<CommandResponse, CommandRouteError>;

    /// `number` is 1-based.
    async fn remove_task(
        &self,
        number: usize,
        ctx: &CommandContext,
    ) -> Result<CommandResponse, CommandRouteError>;

    async fn begin_event(
        &self,
        title: String,
        ctx: &CommandContext,
    ) -> Result<CommandResponse, CommandRouteError>;
}
