pub mod engine;
pub mod router;
pub mod states;
pub mod store;

pub use engine::{clamp_cursor, transition_browse, transition_event};
pub use router::{route_reaction, IgnoreReason, ReactionInput, RouteOutcome};
pub use states::{
    BrowseTransition, EventDraftSession, EventTransition, Reaction, Session, SessionKind,
    TaskBrowseSession,
};
pub use store::SessionStore;
