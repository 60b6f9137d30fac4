use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use fern_core::{ChannelId, MessageRef, UserId};
use thiserror::Error;

use crate::blocks::MessageTemplate;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatClientError {
    #[error("chat request failed: {0}")]
    Request(String),
    #[error("chat resource not found: {0}")]
    NotFound(String),
    #[error("chat api rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("chat response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatUser {
    pub id: UserId,
    pub display_name: String,
    pub bot: bool,
}

/// Outbound half of the chat transport.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn post_message(
        &self,
        channel: &ChannelId,
        message: &MessageTemplate,
    ) -> Result<MessageRef, ChatClientError>;

    async fn edit_message(
        &self,
        message: &MessageRef,
        update: &MessageTemplate,
    ) -> Result<(), ChatClientError>;

    async fn delete_message(&self, message: &MessageRef) -> Result<(), ChatClientError>;

    /// Adds `symbols` in order, as the bot.
    async fn add_reactions(
        &self,
        message: &MessageRef,
        symbols: &[&str],
    ) -> Result<(), ChatClientError>;

    async fn remove_reaction(
        &self,
        message: &MessageRef,
        symbol: &str,
        user: &UserId,
    ) -> Result<(), ChatClientError>;

    async fn fetch_user(&self, user: &UserId) -> Result<ChatUser, ChatClientError>;

    /// The authenticated bot account. Used as the login check.
    async fn current_user(&self) -> Result<ChatUser, ChatClientError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatCall {
    Post { channel: ChannelId, message: MessageRef, template: MessageTemplate },
    Edit { message: MessageRef, template: MessageTemplate },
    Delete { message: MessageRef },
    AddReactions { message: MessageRef, symbols: Vec<String> },
    RemoveReaction { message: MessageRef, symbol: String, user: UserId },
}

#[derive(Default)]
struct RecorderState {
    calls: Vec<ChatCall>,
    next_message: u64,
    users: HashMap<UserId, ChatUser>,
    missing_users: HashSet<UserId>,
    failing_posts: HashSet<String>,
    login_failure: Option<ChatClientError>,
}

/// Chat client kept in memory. Every call is recorded in order, posted
/// messages get sequential ids (`M1`, `M2`, ...) and unknown users resolve to
/// a display name equal to their id.
#[derive(Default)]
pub struct RecordingChatClient {
    state: Mutex<RecorderState>,
}

impl RecordingChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, id: &str, display_name: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            let user = UserId(id.to_owned());
            state.users.insert(
                user.clone(),
                ChatUser { id: user, display_name: display_name.to_owned(), bot: false },
            );
        }
        self
    }

    /// `fetch_user` fails with `NotFound` for `id`.
    pub fn with_missing_user(self, id: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.missing_users.insert(UserId(id.to_owned()));
        }
        self
    }

    /// `post_message` fails for any message whose content contains `needle`.
    pub fn failing_posts_containing(self, needle: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.failing_posts.insert(needle.to_owned());
        }
        self
    }

    pub fn failing_login(self, error: ChatClientError) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.login_failure = Some(error);
        }
        self
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.state.lock().map(|state| state.calls.clone()).unwrap_or_default()
    }

    pub fn posted(&self) -> Vec<MessageTemplate> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ChatCall::Post { template, .. } => Some(template),
                _ => None,
            })
            .collect()
    }

    pub fn last_edit(&self, message: &MessageRef) -> Option<MessageTemplate> {
        self.calls().into_iter().rev().find_map(|call| match call {
            ChatCall::Edit { message: edited, template } if &edited == message => Some(template),
            _ => None,
        })
    }

    fn record(&self, call: ChatCall) -> Result<(), ChatClientError> {
        let mut state = self.lock()?;
        state.calls.push(call);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, RecorderState>, ChatClientError> {
        self.state.lock().map_err(|_| ChatClientError::Request("recorder lock poisoned".to_owned()))
    }
}

#[async_trait]
impl ChatClient for RecordingChatClient {
    async fn post_message(
        &self,
        channel: &ChannelId,
        message: &MessageTemplate,
    ) -> Result<MessageRef, ChatClientError> {
        let mut state = self.lock()?;
        let content = message.content.as_deref().unwrap_or_default();
        if state.failing_posts.iter().any(|needle| content.contains(needle.as_str())) {
            return Err(ChatClientError::Rejected { status: 500, message: "send failed".to_owned() });
        }

        state.next_message += 1;
        let posted = MessageRef::new(channel.0.clone(), format!("M{}", state.next_message));
        state.calls.push(ChatCall::Post {
            channel: channel.clone(),
            message: posted.clone(),
            template: message.clone(),
        });
        Ok(posted)
    }

    async fn edit_message(
        &self,
        message: &MessageRef,
        update: &MessageTemplate,
    ) -> Result<(), ChatClientError> {
        self.record(ChatCall::Edit { message: message.clone(), template: update.clone() })
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<(), ChatClientError> {
        self.record(ChatCall::Delete { message: message.clone() })
    }

    async fn add_reactions(
        &self,
        message: &MessageRef,
        symbols: &[&str],
    ) -> Result<(), ChatClientError> {
        self.record(ChatCall::AddReactions {
            message: message.clone(),
            symbols: symbols.iter().map(|symbol| (*symbol).to_owned()).collect(),
        })
    }

    async fn remove_reaction(
        &self,
        message: &MessageRef,
        symbol: &str,
        user: &UserId,
    ) -> Result<(), ChatClientError> {
        self.record(ChatCall::RemoveReaction {
            message: message.clone(),
            symbol: symbol.to_owned(),
            user: user.clone(),
        })
    }

    async fn fetch_user(&self, user: &UserId) -> Result<ChatUser, ChatClientError> {
        let state = self.lock()?;
        if state.missing_users.contains(user) {
            return Err(ChatClientError::NotFound(format!("user {user}")));
        }
        Ok(state.users.get(user).cloned().unwrap_or_else(|| ChatUser {
            id: user.clone(),
            display_name: user.0.clone(),
            bot: false,
        }))
    }

    async fn current_user(&self) -> Result<ChatUser, ChatClientError> {
        let state = self.lock()?;
        if let Some(error) = state.login_failure.clone() {
            return Err(error);
        }
        Ok(ChatUser { id: UserId("fern-bot".to_owned()), display_name: "Fern".to_owned(), bot: true })
    }
}
