use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use chrono_tz::Tz;
use fern_core::sessions::{
    route_reaction, BrowseTransition, EventDraftSession, EventTransition, ReactionInput,
    RouteOutcome, TaskBrowseSession,
};
use fern_core::{
    ApplicationError, CalendarGateway, Clock, EventDraft, MessageRef, Reaction, Session,
    SharedBotState, SystemClock, UserId,
};
use tracing::{debug, info, warn};

use crate::blocks;
use crate::client::ChatClient;
use crate::commands::{ChatCommandService, CommandContext, CommandResponse, CommandRouteError};
use crate::events::{
    EventContext, EventDispatcher, EventHandlerError, HandlerResult, MessageHandler,
    ReactionAddedEvent, ReactionAddedHandler, ReactionService,
};

/// The bot's behaviour: command handling and both reaction-driven sessions.
///
/// Cheap to clone; every clone shares the same state, calendar and client.
#[derive(Clone)]
pub struct FernBot {
    state: SharedBotState,
    calendar: Arc<dyn CalendarGateway>,
    client: Arc<dyn ChatClient>,
    timezone: Tz,
    clock: Arc<dyn Clock>,
    bot_user: Option<UserId>,
}

impl FernBot {
    pub fn new(
        state: SharedBotState,
        calendar: Arc<dyn CalendarGateway>,
        client: Arc<dyn ChatClient>,
        timezone: Tz,
    ) -> Self {
        Self { state, calendar, client, timezone, clock: Arc::new(SystemClock), bot_user: None }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Reactions by this account are ignored even if the transport does not
    /// flag them as bot reactions.
    pub fn with_bot_user(mut self, user: UserId) -> Self {
        self.bot_user = Some(user);
        self
    }

    pub fn state(&self) -> &SharedBotState {
        &self.state
    }

    pub fn client(&self) -> Arc<dyn ChatClient> {
        self.client.clone()
    }

    fn local_now(&self) -> NaiveDateTime {
        self.clock.now().with_timezone(&self.timezone).naive_local()
    }

    async fn display_name(&self, user: &UserId) -> String {
        match self.client.fetch_user(user).await {
            Ok(chat_user) => chat_user.display_name,
            Err(error) => {
                debug!(user_id = %user, error = %error, "user lookup failed; using fallback name");
                "User".to_owned()
            }
        }
    }

    async fn retract(&self, message: &MessageRef, event: &ReactionAddedEvent) {
        if let Err(error) = self.client.remove_reaction(message, &event.emoji, &event.user_id).await
        {
            warn!(
                event_name = "sessions.reaction.retract_failed",
                user_id = %event.user_id,
                error = %error,
                "failed to retract reaction"
            );
        }
    }

    async fn commit_event(
        &self,
        message: &MessageRef,
        draft: &EventDraft,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        let update = match self.calendar.insert_event(draft.to_new_event(self.timezone.name())).await
        {
            Ok(link) => {
                info!(
                    event_name = "sessions.event.confirmed",
                    correlation_id = %ctx.correlation_id,
                    summary = draft.summary(),
                    start = %draft.start(),
                    link = %link,
                    "event added to calendar"
                );
                blocks::event_confirmed_message(draft, &link)
            }
            Err(error) => {
                let interface =
                    ApplicationError::from(error).into_interface(ctx.correlation_id.clone());
                warn!(
                    event_name = "sessions.event.insert_failed",
                    correlation_id = %ctx.correlation_id,
                    summary = draft.summary(),
                    error = %interface,
                    "calendar insert failed"
                );
                blocks::event_failed_message(
                    draft,
                    interface.user_message(),
                    interface.correlation_id(),
                )
            }
        };
        self.client.edit_message(message, &update).await?;
        Ok(())
    }

    async fn open_session(&self, user: &UserId, session: Session) {
        let kind = session.kind();
        let replaced = self.state.lock().await.sessions.open(user.clone(), session);
        debug!(
            event_name = "sessions.opened",
            user_id = %user,
            kind = ?kind,
            replaced = ?replaced.map(|old| old.kind()),
            "session opened"
        );
    }
}

/// Dispatcher wired with the bot's message and reaction handlers.
pub fn fern_dispatcher(bot: FernBot) -> EventDispatcher {
    let client = bot.client();
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MessageHandler::new(bot.clone(), client));
    dispatcher.register(ReactionAddedHandler::new(bot));
    dispatcher
}

#[async_trait]
impl ChatCommandService for FernBot {
    async fn add_task(
        &self,
        task: String,
        ctx: &CommandContext,
    ) -> Result<CommandResponse, CommandRouteError> {
        let position = self.state.lock().await.tasks.add(&ctx.user_id, task.clone());
        info!(
            event_name = "tasks.added",
            correlation_id = %ctx.correlation_id,
            user_id = %ctx.user_id,
            position,
            "task added"
        );
        Ok(CommandResponse::Reply(blocks::task_added_message(&task)))
    }

    async fn list_events(
        &self,
        ctx: &CommandContext,
    ) -> Result<CommandResponse, CommandRouteError> {
        let today = self.local_now().date();
        match self.calendar.list_events_for_day(today).await {
            Ok(events) => {
                debug!(
                    event_name = "calendar.events.listed",
                    correlation_id = %ctx.correlation_id,
                    day = %today,
                    count = events.len(),
                    "listed today's events"
                );
                Ok(CommandResponse::Reply(blocks::events_list_message(&events)))
            }
            Err(error) => {
                let interface =
                    ApplicationError::from(error).into_interface(ctx.correlation_id.clone());
                warn!(
                    event_name = "calendar.events.list_failed",
                    correlation_id = %ctx.correlation_id,
                    day = %today,
                    error = %interface,
                    "calendar list failed"
                );
                Ok(CommandResponse::Reply(blocks::error_message(
                    interface.user_message(),
                    interface.correlation_id(),
                )))
            }
        }
    }

    async fn list_tasks(&self, ctx: &CommandContext) -> Result<CommandResponse, CommandRouteError> {
        let tasks = self.state.lock().await.tasks.tasks_for(&ctx.user_id).to_vec();
        if tasks.is_empty() {
            return Ok(CommandResponse::Reply(blocks::no_tasks_message(&ctx.user_id)));
        }

        let name = self.display_name(&ctx.user_id).await;
        let message = blocks::task_list_message(&ctx.user_id, &name, &tasks, Some(0));
        let posted = self.client.post_message(&ctx.channel_id, &message).await?;
        self.open_session(
            &ctx.user_id,
            Session::TaskBrowsing(TaskBrowseSession::new(posted.clone(), tasks.len())),
        )
        .await;
        self.client.add_reactions(&posted, &Reaction::symbols(&Reaction::BROWSE_MARKERS)).await?;
        Ok(CommandResponse::Posted(posted))
    }

    async fn remove_task(
        &self,
        number: usize,
        ctx: &CommandContext,
    ) -> Result<CommandResponse, CommandRouteError> {
        let removed = self.state.lock().await.tasks.remove_number(&ctx.user_id, number);
        match removed {
            Ok(task) => {
                info!(
                    event_name = "tasks.removed",
                    correlation_id = %ctx.correlation_id,
                    user_id = %ctx.user_id,
                    number,
                    "task removed"
                );
                Ok(CommandResponse::Reply(blocks::task_removed_message(&task)))
            }
            Err(error) => {
                let interface =
                    ApplicationError::from(error).into_interface(ctx.correlation_id.clone());
                debug!(
                    event_name = "tasks.remove_rejected",
                    correlation_id = %interface.correlation_id(),
                    user_id = %ctx.user_id,
                    error = %interface,
                    "rejected task number"
                );
                Ok(CommandResponse::Reply(blocks::invalid_task_number_message()))
            }
        }
    }

    async fn begin_event(
        &self,
        title: String,
        ctx: &CommandContext,
    ) -> Result<CommandResponse, CommandRouteError> {
        let draft = EventDraft::starting_next_hour(title, self.local_now());
        let posted =
            self.client.post_message(&ctx.channel_id, &blocks::event_draft_message(&draft)).await?;
        self.open_session(
            &ctx.user_id,
            Session::EventEditing(EventDraftSession { draft, message: posted.clone() }),
        )
        .await;
        self.client.add_reactions(&posted, &Reaction::symbols(&Reaction::EVENT_MARKERS)).await?;
        Ok(CommandResponse::Posted(posted))
    }
}

#[async_trait]
impl ReactionService for FernBot {
    async fn handle_reaction(
        &self,
        event: &ReactionAddedEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let actor_is_bot = event.user_is_bot || self.bot_user.as_ref() == Some(&event.user_id);
        let outcome = {
            let mut state = self.state.lock().await;
            route_reaction(
                &mut state,
                ReactionInput {
                    user: &event.user_id,
                    message: &event.message,
                    symbol: &event.emoji,
                    actor_is_bot,
                },
            )
        };

        match outcome {
            RouteOutcome::Ignored(reason) => {
                debug!(
                    event_name = "sessions.reaction.ignored",
                    correlation_id = %ctx.correlation_id,
                    user_id = %event.user_id,
                    reason = reason.label(),
                    "reaction ignored"
                );
                Ok(HandlerResult::Ignored)
            }
            RouteOutcome::Event { message, reaction, transition } => {
                debug!(
                    event_name = "sessions.event.transition",
                    correlation_id = %ctx.correlation_id,
                    user_id = %event.user_id,
                    reaction = ?reaction,
                    "event session reaction"
                );
                match transition {
                    EventTransition::Adjusted(draft) => {
                        self.client
                            .edit_message(&message, &blocks::event_draft_message(&draft))
                            .await?;
                        self.retract(&message, event).await;
                    }
                    EventTransition::Confirmed(draft) => {
                        self.commit_event(&message, &draft, ctx).await?;
                    }
                    EventTransition::Cancelled => {
                        info!(
                            event_name = "sessions.event.cancelled",
                            correlation_id = %ctx.correlation_id,
                            user_id = %event.user_id,
                            "event creation cancelled"
                        );
                        self.client
                            .edit_message(&message, &blocks::event_cancelled_message())
                            .await?;
                    }
                }
                Ok(HandlerResult::Processed)
            }
            RouteOutcome::Browse { message, reaction, transition, tasks } => {
                let cursor = match transition {
                    BrowseTransition::Moved { cursor } => cursor,
                    BrowseTransition::Removed { task, cursor } => {
                        info!(
                            event_name = "tasks.removed",
                            correlation_id = %ctx.correlation_id,
                            user_id = %event.user_id,
                            task = %task,
                            "task removed from browse list"
                        );
                        cursor
                    }
                    BrowseTransition::Closed => {
                        self.client.delete_message(&message).await?;
                        return Ok(HandlerResult::Processed);
                    }
                    BrowseTransition::Ignored => return Ok(HandlerResult::Ignored),
                };
                debug!(
                    event_name = "sessions.browse.transition",
                    correlation_id = %ctx.correlation_id,
                    user_id = %event.user_id,
                    reaction = ?reaction,
                    cursor = ?cursor,
                    "browse session reaction"
                );

                let name = self.display_name(&event.user_id).await;
                let update = blocks::task_list_message(&event.user_id, &name, &tasks, cursor);
                self.client.edit_message(&message, &update).await?;
                self.retract(&message, event).await;
                Ok(HandlerResult::Processed)
            }
        }
    }
}
