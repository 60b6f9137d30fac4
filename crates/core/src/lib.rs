pub mod calendar;
pub mod clock;
pub mod config;
pub mod digest;
pub mod domain;
pub mod errors;
pub mod sessions;
pub mod state;

pub use calendar::{CalendarError, CalendarGateway, InMemoryCalendarGateway};
pub use clock::{Clock, FixedClock, SystemClock};
pub use digest::{plan_digest, DigestEntry, DigestPlan, DigestSchedule};
pub use domain::chat::{ChannelId, MessageId, MessageRef, UserId};
pub use domain::event::{CalendarEvent, EventDraft, NewCalendarEvent};
pub use domain::task::{TaskError, TaskList};
pub use errors::{ApplicationError, InterfaceError};
pub use sessions::{Reaction, Session, SessionStore};
pub use state::{shared_state, BotState, SharedBotState};
