use std::collections::HashMap;

use crate::domain::chat::UserId;
use crate::sessions::states::Session;

/// At most one interactive session per user.
#[derive(Clone, Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<UserId, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `session` for `user`, handing back whatever it replaced.
    pub fn open(&mut self, user: UserId, session: Session) -> Option<Session> {
        self.sessions.insert(user, session)
    }

    pub fn get(&self, user: &UserId) -> Option<&Session> {
        self.sessions.get(user)
    }

    pub fn get_mut(&mut self, user: &UserId) -> Option<&mut Session> {
        self.sessions.get_mut(user)
    }

    pub fn close(&mut self, user: &UserId) -> Option<Session> {
        self.sessions.remove(user)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::SessionStore;
    use crate::domain::chat::{MessageRef, UserId};
    use crate::domain::event::EventDraft;
    use crate::sessions::states::{EventDraftSession, Session, SessionKind, TaskBrowseSession};

    #[test]
    fn opening_a_second_session_replaces_the_first() {
        let mut store = SessionStore::new();
        let user = UserId("U1".to_owned());
        let start = NaiveDate::from_ymd_opt(2026, 1, 2)
            .and_then(|date| date.and_hms_opt(10, 0, 0))
            .expect("valid timestamp");

        let first = Session::EventEditing(EventDraftSession {
            draft: EventDraft::new("standup", start),
            message: MessageRef::new("C1", "M1"),
        });
        assert!(store.open(user.clone(), first).is_none());

        let second = Session::TaskBrowsing(TaskBrowseSession::new(MessageRef::new("C1", "M2"), 2));
        let replaced = store.open(user.clone(), second).expect("previous session");
        assert_eq!(replaced.kind(), SessionKind::EventEditing);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&user).map(Session::kind), Some(SessionKind::TaskBrowsing));
    }

    #[test]
    fn close_is_idempotent() {
        let mut store = SessionStore::new();
        let user = UserId("U1".to_owned());
        store.open(
            user.clone(),
            Session::TaskBrowsing(TaskBrowseSession::new(MessageRef::new("C1", "M1"), 1)),
        );

        assert!(store.close(&user).is_some());
        assert!(store.close(&user).is_none());
        assert!(store.is_empty());
    }
}
