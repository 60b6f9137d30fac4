use serde::{Deserialize, Serialize};

use crate::domain::chat::MessageRef;
use crate::domain::event::EventDraft;

/// The reaction vocabulary shared by both interactive protocols.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reaction {
    Left,
    Right,
    Up,
    Down,
    Confirm,
    Cancel,
}

impl Reaction {
    /// Markers seeded on an event-creation message, in display order.
    pub const EVENT_MARKERS: [Reaction; 6] =
        [Self::Left, Self::Right, Self::Up, Self::Down, Self::Confirm, Self::Cancel];

    /// Markers seeded on a task-browse message, in display order.
    pub const BROWSE_MARKERS: [Reaction; 4] = [Self::Left, Self::Right, Self::Confirm, Self::Cancel];

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Left => "⬅️",
            Self::Right => "➡️",
            Self::Up => "⬆️",
            Self::Down => "⬇️",
            Self::Confirm => "✅",
            Self::Cancel => "❌",
        }
    }

    /// Accepts the emoji itself (with or without the U+FE0F variation
    /// selector) and the common shortcode aliases.
    pub fn from_symbol(raw: &str) -> Option<Self> {
        let normalized = normalize_reaction_token(raw);
        match normalized.as_str() {
            "⬅" | "arrow_left" | "left" => Some(Self::Left),
            "➡" | "arrow_right" | "right" => Some(Self::Right),
            "⬆" | "arrow_up" | "up" => Some(Self::Up),
            "⬇" | "arrow_down" | "down" => Some(Self::Down),
            "✅" | "white_check_mark" | "check" => Some(Self::Confirm),
            "❌" | "x" | "cross_mark" => Some(Self::Cancel),
            _ => None,
        }
    }

    pub fn symbols(reactions: &[Reaction]) -> Vec<&'static str> {
        reactions.iter().map(|reaction| reaction.symbol()).collect()
    }
}

fn normalize_reaction_token(reaction: &str) -> String {
    reaction.trim().trim_matches(':').replace('\u{fe0f}', "").to_ascii_lowercase()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraftSession {
    pub draft: EventDraft,
    pub message: MessageRef,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBrowseSession {
    pub message: MessageRef,
    /// `None` once the browsed list is empty.
    pub cursor: Option<usize>,
}

impl TaskBrowseSession {
    pub fn new(message: MessageRef, task_count: usize) -> Self {
        Self { message, cursor: (task_count > 0).then_some(0) }
    }
}

/// The single interactive session a user may own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Session {
    EventEditing(EventDraftSession),
    TaskBrowsing(TaskBrowseSession),
}

impl Session {
    pub fn kind(&self) -> SessionKind {
        match self {
            Self::EventEditing(_) => SessionKind::EventEditing,
            Self::TaskBrowsing(_) => SessionKind::TaskBrowsing,
        }
    }

    pub fn message(&self) -> &MessageRef {
        match self {
            Self::EventEditing(session) => &session.message,
            Self::TaskBrowsing(session) => &session.message,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    EventEditing,
    TaskBrowsing,
}

/// Result of feeding one reaction into the event-creation machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventTransition {
    Adjusted(EventDraft),
    Confirmed(EventDraft),
    Cancelled,
}

/// Result of feeding one reaction into the task-pagination machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrowseTransition {
    Moved { cursor: Option<usize> },
    Removed { task: String, cursor: Option<usize> },
    Closed,
    Ignored,
}
