//! Chat interface for Fern
//!
//! This crate connects the chat channel to the bot's behaviour:
//! - **Transport runner** (`socket`) - pumps inbound envelopes with reconnection logic
//! - **Events** (`events`) - channel messages and reaction events, dispatched by type
//! - **Commands** (`commands`) - `task`, `my tasks`, `remove task N`, `event`, `fern list please`, `fern help`
//! - **Bot** (`bot`) - command handling plus the event-creation and task-browsing sessions
//! - **Digest** (`digest`) - the scheduled morning broadcast
//! - **Messages** (`blocks`) - embed and reply builders
//! - **Client** (`client`) - outbound chat API port
//!
//! # Architecture
//!
//! ```text
//! Transport → SocketRunner → EventDispatcher → MessageHandler  → CommandRouter → FernBot
//!                                           → ReactionHandler → route_reaction → FernBot
//!                                                                       ↓
//!                                                        ChatClient ← embeds/replies
//! ```
//!
//! # Key Types
//!
//! - `SocketRunner` - inbound event loop with reconnection logic
//! - `EventDispatcher` - routes envelopes to the registered handler
//! - `FernBot` - the bot service behind both handlers
//! - `DigestRunner` - polls the clock and sends the daily digest

pub mod blocks;
pub mod bot;
pub mod client;
pub mod commands;
pub mod digest;
pub mod events;
pub mod socket;

pub use bot::{fern_dispatcher, FernBot};
pub use client::{ChatClient, ChatClientError, ChatUser, RecordingChatClient};
pub use digest::{DigestBroadcaster, DigestReport, DigestRunner};
pub use socket::{NoopSocketTransport, ReconnectPolicy, SocketRunner, SocketTransport};
