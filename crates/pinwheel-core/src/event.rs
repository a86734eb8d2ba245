//! Gateway events relevant to widgets.
//!
//! - [`EventKind`] - Event classification used to key subscriptions
//! - [`GatewayEvent`] - Typed event payloads
//!
//! Hosts usually receive dispatches from their gateway client as a name plus a
//! JSON payload; [`GatewayEvent::parse`] maps those onto typed events:
//!
//! ```rust
//! use pinwheel_core::{EventKind, GatewayEvent};
//! use serde_json::json;
//!
//! let event = GatewayEvent::parse(
//!     "MESSAGE_DELETE",
//!     &json!({"id": "1", "channel_id": "2"}),
//! )
//! .unwrap()
//! .unwrap();
//! assert_eq!(event.kind(), EventKind::MessageDelete);
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiResult;
use crate::model::{Message, Reaction};

// ============================================================================
// Event Kind
// ============================================================================

/// Classification of gateway events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MessageCreate,
    MessageDelete,
    MessageDeleteBulk,
    ReactionAdd,
    ReactionRemove,
    ChannelDelete,
    GuildDelete,
}

impl EventKind {
    /// Returns the gateway dispatch name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::MessageDelete => "MESSAGE_DELETE",
            Self::MessageDeleteBulk => "MESSAGE_DELETE_BULK",
            Self::ReactionAdd => "MESSAGE_REACTION_ADD",
            Self::ReactionRemove => "MESSAGE_REACTION_REMOVE",
            Self::ChannelDelete => "CHANNEL_DELETE",
            Self::GuildDelete => "GUILD_DELETE",
        }
    }
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_uppercase().as_str() {
            "MESSAGE_CREATE" => Self::MessageCreate,
            "MESSAGE_DELETE" => Self::MessageDelete,
            "MESSAGE_DELETE_BULK" => Self::MessageDeleteBulk,
            "MESSAGE_REACTION_ADD" => Self::ReactionAdd,
            "MESSAGE_REACTION_REMOVE" => Self::ReactionRemove,
            "CHANNEL_DELETE" => Self::ChannelDelete,
            "GUILD_DELETE" => Self::GuildDelete,
            _ => return Err(()),
        })
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// A single message was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDelete {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
}

/// Several messages of one channel were deleted at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDeleteBulk {
    pub ids: Vec<String>,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
}

/// A channel was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDelete {
    pub id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
}

/// The bot left a guild, or the guild became unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildDelete {
    pub id: String,
    #[serde(default)]
    pub unavailable: bool,
}

// ============================================================================
// Gateway Event
// ============================================================================

/// A typed gateway event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    MessageCreate(Message),
    MessageDelete(MessageDelete),
    MessageDeleteBulk(MessageDeleteBulk),
    ReactionAdd(Reaction),
    ReactionRemove(Reaction),
    ChannelDelete(ChannelDelete),
    GuildDelete(GuildDelete),
}

impl GatewayEvent {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MessageCreate(_) => EventKind::MessageCreate,
            Self::MessageDelete(_) => EventKind::MessageDelete,
            Self::MessageDeleteBulk(_) => EventKind::MessageDeleteBulk,
            Self::ReactionAdd(_) => EventKind::ReactionAdd,
            Self::ReactionRemove(_) => EventKind::ReactionRemove,
            Self::ChannelDelete(_) => EventKind::ChannelDelete,
            Self::GuildDelete(_) => EventKind::GuildDelete,
        }
    }

    /// Parses a gateway dispatch.
    ///
    /// Returns `Ok(None)` for dispatch names widgets do not care about, and
    /// an error when a known dispatch carries a malformed payload.
    pub fn parse(name: &str, payload: &Value) -> ApiResult<Option<Self>> {
        let Ok(kind) = name.parse::<EventKind>() else {
            return Ok(None);
        };

        let data = payload.clone();
        let event = match kind {
            EventKind::MessageCreate => Self::MessageCreate(serde_json::from_value(data)?),
            EventKind::MessageDelete => Self::MessageDelete(serde_json::from_value(data)?),
            EventKind::MessageDeleteBulk => {
                Self::MessageDeleteBulk(serde_json::from_value(data)?)
            }
            EventKind::ReactionAdd => Self::ReactionAdd(serde_json::from_value(data)?),
            EventKind::ReactionRemove => Self::ReactionRemove(serde_json::from_value(data)?),
            EventKind::ChannelDelete => Self::ChannelDelete(serde_json::from_value(data)?),
            EventKind::GuildDelete => Self::GuildDelete(serde_json::from_value(data)?),
        };
        Ok(Some(event))
    }
}
