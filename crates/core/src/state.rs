use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::task::TaskList;
use crate::sessions::store::SessionStore;

/// Everything the bot keeps in memory. Nothing here survives a restart.
#[derive(Clone, Debug, Default)]
pub struct BotState {
    pub sessions: SessionStore,
    pub tasks: TaskList,
}

/// Bot state shared between the event loop, the digest loop and the health
/// endpoint. Handlers hold the lock only for their read-modify-write step and
/// never across calendar or chat calls.
pub type SharedBotState = Arc<Mutex<BotState>>;

pub fn shared_state() -> SharedBotState {
    Arc::new(Mutex::new(BotState::default()))
}
