use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use fern_core::{ChannelId, MessageRef, UserId};
use thiserror::Error;
use tracing::debug;

use crate::{
    client::{ChatClient, ChatClientError},
    commands::{
        parse_chat_command, ChatCommandService, CommandContext, CommandResponse,
        CommandRouteError, CommandRouter,
    },
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEnvelope {
    pub envelope_id: String,
    pub event: ChatEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    Message(MessageEvent),
    ReactionAdded(ReactionAddedEvent),
    Unsupported { event_type: String },
}

impl ChatEvent {
    pub fn event_type(&self) -> ChatEventType {
        match self {
            Self::Message(_) => ChatEventType::Message,
            Self::ReactionAdded(_) => ChatEventType::ReactionAdded,
            Self::Unsupported { .. } => ChatEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatEventType {
    Message,
    ReactionAdded,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author_is_bot: bool,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactionAddedEvent {
    pub message: MessageRef,
    pub user_id: UserId,
    pub user_is_bot: bool,
    pub emoji: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// A message was posted in response.
    Responded(MessageRef),
    /// State changed or an existing message was edited.
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Route(#[from] CommandRouteError),
    #[error(transparent)]
    Chat(#[from] ChatClientError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> ChatEventType;
    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<ChatEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Turns channel messages into commands and posts plain replies.
pub struct MessageHandler<S> {
    router: CommandRouter<S>,
    client: Arc<dyn ChatClient>,
}

impl<S> MessageHandler<S>
where
    S: ChatCommandService,
{
    pub fn new(service: S, client: Arc<dyn ChatClient>) -> Self {
        Self { router: CommandRouter::new(service), client }
    }
}

#[async_trait]
impl<S> EventHandler for MessageHandler<S>
where
    S: ChatCommandService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::Message
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::Message(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.author_is_bot {
            return Ok(HandlerResult::Ignored);
        }
        let Some(command) = parse_chat_command(&event.content) else {
            return Ok(HandlerResult::Ignored);
        };

        debug!(
            event_name = "ingress.chat.command_parsed",
            correlation_id = %ctx.correlation_id,
            user_id = %event.author_id,
            command = ?command,
            "parsed chat command"
        );

        let command_ctx = CommandContext {
            channel_id: event.channel_id.clone(),
            user_id: event.author_id.clone(),
            correlation_id: ctx.correlation_id.clone(),
        };
        match self.router.route(command, &command_ctx).await? {
            CommandResponse::Reply(message) => {
                let posted = self.client.post_message(&event.channel_id, &message).await?;
                Ok(HandlerResult::Responded(posted))
            }
            CommandResponse::Posted(posted) => Ok(HandlerResult::Responded(posted)),
        }
    }
}

#[async_trait]
pub trait ReactionService: Send + Sync {
    async fn handle_reaction(
        &self,
        event: &ReactionAddedEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

pub struct ReactionAddedHandler<S> {
    service: S,
}

impl<S> ReactionAddedHandler<S>
where
    S: ReactionService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for ReactionAddedHandler<S>
where
    S: ReactionService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::ReactionAdded
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::ReactionAdded(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.handle_reaction(event, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use fern_core::{ChannelId, MessageRef, UserId};

    use super::{
        ChatEnvelope, ChatEvent, EventContext, EventDispatcher, EventHandlerError, HandlerResult,
        MessageEvent, MessageHandler, ReactionAddedEvent, ReactionAddedHandler, ReactionService,
    };
    use crate::client::RecordingChatClient;
    use crate::commands::{
        ChatCommandService, CommandContext, CommandResponse, CommandRouteError,
    };
    use crate::blocks::MessageTemplate;

    struct EchoService;

    #[async_trait]
    impl ChatCommandService for EchoService {
        async fn add_task(
            &self,
            task: String,
            _ctx: &CommandContext,
        ) -> Result<CommandResponse, CommandRouteError> {
            Ok(CommandResponse::Reply(MessageTemplate::text(format!("added {task}"))))
        }

        async fn list_events(
            &self,
            _ctx: &CommandContext,
        ) -> Result<CommandResponse, CommandRouteError> {
            Err(CommandRouteError::Service("calendar offline".to_owned()))
        }

        async fn list_tasks(
            &self,
            _ctx: &CommandContext,
        ) -> Result<CommandResponse, CommandRouteError> {
            Ok(CommandResponse::Posted(MessageRef::new("C1", "live")))
        }

        async fn remove_task(
            &self,
            _number: usize,
            _ctx: &CommandContext,
        ) -> Result<CommandResponse, CommandRouteError> {
            Ok(CommandResponse::Reply(MessageTemplate::text("removed")))
        }

        async fn begin_event(
            &self,
            _title: String,
            _ctx: &CommandContext,
        ) -> Result<CommandResponse, CommandRouteError> {
            Ok(CommandResponse::Posted(MessageRef::new("C1", "draft")))
        }
    }

    struct CountingReactions;

    #[async_trait]
    impl ReactionService for CountingReactions {
        async fn handle_reaction(
            &self,
            event: &ReactionAddedEvent,
            _ctx: &EventContext,
        ) -> Result<HandlerResult, EventHandlerError> {
            Ok(if event.emoji == "✅" { HandlerResult::Processed } else { HandlerResult::Ignored })
        }
    }

    fn message(content: &str, author_is_bot: bool) -> ChatEnvelope {
        ChatEnvelope {
            envelope_id: "env-1".to_owned(),
            event: ChatEvent::Message(MessageEvent {
                channel_id: ChannelId("C1".to_owned()),
                author_id: UserId("U1".to_owned()),
                author_is_bot,
                content: content.to_owned(),
            }),
        }
    }

    fn dispatcher(client: Arc<RecordingChatClient>) -> EventDispatcher {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(MessageHandler::new(EchoService, client));
        dispatcher.register(ReactionAddedHandler::new(CountingReactions));
        dispatcher
    }

    #[tokio::test]
    async fn replies_are_posted_to_the_originating_channel() {
        let client = Arc::new(RecordingChatClient::new());
        let dispatcher = dispatcher(client.clone());

        let result = dispatcher
            .dispatch(&message("task buy milk", false), &EventContext::default())
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Responded(MessageRef::new("C1", "M1")));
        assert_eq!(client.posted(), vec![MessageTemplate::text("added buy milk")]);
    }

    #[tokio::test]
    async fn interactive_commands_are_not_posted_twice() {
        let client = Arc::new(RecordingChatClient::new());
        let dispatcher = dispatcher(client.clone());

        let result = dispatcher
            .dispatch(&message("my tasks", false), &EventContext::default())
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Responded(MessageRef::new("C1", "live")));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn bot_authors_and_chatter_are_ignored() {
        let client = Arc::new(RecordingChatClient::new());
        let dispatcher = dispatcher(client.clone());
        let ctx = EventContext::default();

        let from_bot = dispatcher.dispatch(&message("task x", true), &ctx).await.expect("bot");
        let chatter = dispatcher.dispatch(&message("good morning", false), &ctx).await.expect("chat");

        assert_eq!(from_bot, HandlerResult::Ignored);
        assert_eq!(chatter, HandlerResult::Ignored);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn service_failures_surface_as_dispatch_errors() {
        let client = Arc::new(RecordingChatClient::new());
        let dispatcher = dispatcher(client);

        let result =
            dispatcher.dispatch(&message("fern list please", false), &EventContext::default()).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn reactions_reach_the_reaction_service() {
        let dispatcher = dispatcher(Arc::new(RecordingChatClient::new()));
        let envelope = ChatEnvelope {
            envelope_id: "env-2".to_owned(),
            event: ChatEvent::ReactionAdded(ReactionAddedEvent {
                message: MessageRef::new("C1", "M1"),
                user_id: UserId("U1".to_owned()),
                user_is_bot: false,
                emoji: "✅".to_owned(),
            }),
        };

        let result =
            dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");
        assert_eq!(result, HandlerResult::Processed);
    }

    #[tokio::test]
    async fn unregistered_event_types_are_ignored() {
        let dispatcher = dispatcher(Arc::new(RecordingChatClient::new()));
        let envelope = ChatEnvelope {
            envelope_id: "env-3".to_owned(),
            event: ChatEvent::Unsupported { event_type: "typing_start".to_owned() },
        };

        let result =
            dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");
        assert_eq!(result, HandlerResult::Ignored);
        assert_eq!(dispatcher.handler_count(), 2);
    }
}
