use chrono::Duration;

use crate::domain::chat::UserId;
use crate::domain::event::EventDraft;
use crate::domain::task::TaskList;
use crate::sessions::states::{BrowseTransition, EventTransition, Reaction, TaskBrowseSession};

/// Event-creation machine: arrows move the draft, confirm/cancel terminate.
///
/// The draft passed in is never mutated; the adjusted copy is returned so the
/// caller decides when to write it back into the store.
pub fn transition_event(current: &EventDraft, reaction: Reaction) -> EventTransition {
    let offset = match reaction {
        Reaction::Left => Duration::days(-1),
        Reaction::Right => Duration::days(1),
        Reaction::Up => Duration::hours(1),
        Reaction::Down => Duration::hours(-1),
        Reaction::Confirm => return EventTransition::Confirmed(current.clone()),
        Reaction::Cancel => return EventTransition::Cancelled,
    };

    let mut next = current.clone();
    next.shift(offset);
    EventTransition::Adjusted(next)
}

/// Task-pagination machine over `user`'s list.
///
/// The cursor is clamped against the live list length before every step, since
/// the list can shrink underneath an open session through `remove task N`.
pub fn transition_browse(
    session: &mut TaskBrowseSession,
    reaction: Reaction,
    tasks: &mut TaskList,
    user: &UserId,
) -> BrowseTransition {
    let len = tasks.len_for(user);
    let cursor = clamp_cursor(session.cursor, len);

    let outcome = match (reaction, cursor) {
        (Reaction::Cancel, _) => return BrowseTransition::Closed,
        (Reaction::Up | Reaction::Down, _) => return BrowseTransition::Ignored,
        (_, None) => BrowseTransition::Moved { cursor: None },
        (Reaction::Left, Some(index)) => BrowseTransition::Moved { cursor: Some(index.saturating_sub(1)) },
        (Reaction::Right, Some(index)) => {
            BrowseTransition::Moved { cursor: Some((index + 1).min(len - 1)) }
        }
        (Reaction::Confirm, Some(index)) => match tasks.remove_at(user, index) {
            Some(task) => {
                BrowseTransition::Removed { task, cursor: clamp_cursor(Some(index), len - 1) }
            }
            None => BrowseTransition::Moved { cursor },
        },
    };

    session.cursor = match &outcome {
        BrowseTransition::Moved { cursor } | BrowseTransition::Removed { cursor, .. } => *cursor,
        BrowseTransition::Closed | BrowseTransition::Ignored => session.cursor,
    };
    outcome
}

/// Pulls a cursor back into `[0, len - 1]`, or to the empty sentinel.
pub fn clamp_cursor(cursor: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(cursor.unwrap_or(0).min(len - 1))
}
