//! # Pinwheel Core
//!
//! Platform-facing building blocks for Pinwheel widgets.
//!
//! - **Model**: messages, embeds, reactions and users ([`Message`], [`Embed`], [`Reaction`])
//! - **Events**: typed gateway events ([`GatewayEvent`], [`EventKind`])
//! - **Event Hub**: callback registry the host publishes events into ([`EventHub`], [`Subscription`])
//! - **Session**: the chat-platform client abstraction ([`Session`])
//!
//! ## Wiring
//!
//! ```text
//! ┌──────────────┐ publish ┌──────────┐ callbacks ┌──────────┐
//! │ Gateway feed │────────▶│ EventHub │──────────▶│ Widgets  │
//! └──────────────┘         └──────────┘           └────┬─────┘
//!                                                      │ REST calls
//!                                                 ┌────▼─────┐
//!                                                 │ Session  │
//!                                                 └──────────┘
//! ```
//!
//! ## Feature Flags
//!
//! - `testing`: enables [`testing::MockSession`], an in-memory session

pub mod error;
pub mod event;
pub mod hub;
pub mod model;
pub mod session;

#[cfg(feature = "testing")]
pub mod testing;

pub use error::{ApiError, ApiResult};
pub use event::{
    ChannelDelete, EventKind, GatewayEvent, GuildDelete, MessageDelete, MessageDeleteBulk,
};
pub use hub::{EventCallback, EventHub, Subscription};
pub use model::{Embed, EmbedField, EmbedFooter, Emoji, Message, Reaction, User};
pub use session::{BoxedSession, Session};
