use crate::domain::chat::{MessageRef, UserId};
use crate::sessions::engine::{transition_browse, transition_event};
use crate::sessions::states::{BrowseTransition, EventTransition, Reaction, Session};
use crate::state::BotState;

/// A reaction as delivered by the chat transport.
#[derive(Clone, Copy, Debug)]
pub struct ReactionInput<'a> {
    pub user: &'a UserId,
    pub message: &'a MessageRef,
    pub symbol: &'a str,
    pub actor_is_bot: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    BotActor,
    UnknownSymbol,
    NoSession,
    OtherMessage,
    NotInVocabulary,
}

impl IgnoreReason {
    pub fn label(self) -> &'static str {
        match self {
            Self::BotActor => "bot_actor",
            Self::UnknownSymbol => "unknown_symbol",
            Self::NoSession => "no_session",
            Self::OtherMessage => "other_message",
            Self::NotInVocabulary => "not_in_vocabulary",
        }
    }
}

/// What a routed reaction did to the bot state. Chat I/O is left to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    Ignored(IgnoreReason),
    Event {
        message: MessageRef,
        reaction: Reaction,
        transition: EventTransition,
    },
    Browse {
        message: MessageRef,
        reaction: Reaction,
        transition: BrowseTransition,
        /// The user's list after the transition, for re-rendering.
        tasks: Vec<String>,
    },
}

/// Routes one reaction to the machine matching the user's session tag and
/// applies the transition to `state`.
///
/// Terminal transitions remove the session before returning, so a late
/// reaction arriving after confirm or cancel finds nothing and is ignored.
pub fn route_reaction(state: &mut BotState, input: ReactionInput<'_>) -> RouteOutcome {
    if input.actor_is_bot {
        return RouteOutcome::Ignored(IgnoreReason::BotActor);
    }
    let Some(reaction) = Reaction::from_symbol(input.symbol) else {
        return RouteOutcome::Ignored(IgnoreReason::UnknownSymbol);
    };

    let BotState { sessions, tasks } = state;
    let Some(session) = sessions.get_mut(input.user) else {
        return RouteOutcome::Ignored(IgnoreReason::NoSession);
    };
    if session.message() != input.message {
        return RouteOutcome::Ignored(IgnoreReason::OtherMessage);
    }

    match session {
        Session::EventEditing(editing) => {
            let transition = transition_event(&editing.draft, reaction);
            let message = editing.message.clone();
            match &transition {
                EventTransition::Adjusted(draft) => editing.draft = draft.clone(),
                EventTransition::Confirmed(_) | EventTransition::Cancelled => {
                    sessions.close(input.user);
                }
            }
            RouteOutcome::Event { message, reaction, transition }
        }
        Session::TaskBrowsing(browsing) => {
            let transition = transition_browse(browsing, reaction, tasks, input.user);
            let message = browsing.message.clone();
            match transition {
                BrowseTransition::Ignored => {
                    return RouteOutcome::Ignored(IgnoreReason::NotInVocabulary);
                }
                // An emptied list ends the session, whether this reaction
                // removed the last task or `remove task N` did it earlier.
                BrowseTransition::Closed
                | BrowseTransition::Moved { cursor: None }
                | BrowseTransition::Removed { cursor: None, .. } => {
                    sessions.close(input.user);
                }
                BrowseTransition::Moved { .. } | BrowseTransition::Removed { .. } => {}
            }
            RouteOutcome::Browse {
                message,
                reaction,
                transition,
                tasks: tasks.tasks_for(input.user).to_vec(),
            }
        }
    }
}
