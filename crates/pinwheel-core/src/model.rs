//! Platform data model.
//!
//! These types mirror the subset of the chat platform's REST and gateway
//! objects that widgets care about. Field names follow the platform's JSON
//! payloads so gateway dispatches can be deserialized directly.
//!
//! Identifiers are kept as opaque strings.

use serde::{Deserialize, Serialize};

// ============================================================================
// Users & Emoji
// ============================================================================

/// A platform user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    /// Whether the account is a bot account.
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// Creates a user with only an id set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// An emoji as carried by reaction events.
///
/// Unicode emoji have no `id`; custom emoji carry both `id` and `name`.
/// Widgets key their handlers by `name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Emoji {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

impl Emoji {
    /// Creates a unicode emoji.
    pub fn unicode(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    /// Returns the form the REST API expects in reaction routes:
    /// the bare name for unicode emoji, `name:id` for custom emoji.
    pub fn api_name(&self) -> String {
        match &self.id {
            Some(id) => format!("{}:{}", self.name, id),
            None => self.name.clone(),
        }
    }
}

// ============================================================================
// Embeds
// ============================================================================

/// A single name/value field inside an [`Embed`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Footer line of an [`Embed`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// Rich message content.
///
/// Build with the chained setters:
///
/// ```rust
/// use pinwheel_core::Embed;
///
/// let embed = Embed::new()
///     .title("Poll")
///     .description("Pick one")
///     .color(0x00ff00);
/// assert_eq!(embed.description.as_deref(), Some("Pick one"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

impl Embed {
    /// Creates an empty embed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    /// Appends a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.into() });
        self
    }
}

// ============================================================================
// Messages & Reactions
// ============================================================================

/// A message as returned by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub author: User,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

impl Message {
    /// Returns the first embed of the message, if any.
    pub fn first_embed(&self) -> Option<&Embed> {
        self.embeds.first()
    }
}

/// A reaction added to (or removed from) a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub user_id: String,
    pub message_id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub emoji: Emoji,
}
