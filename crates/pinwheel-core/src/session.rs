//! Session trait.
//!
//! A [`Session`] is the chat-platform client a widget drives. Authentication,
//! rate limiting and gateway reconnects are the implementor's concern; widgets
//! only need the handful of calls below plus access to the [`EventHub`] the
//! host publishes gateway events into.
//!
//! # Example Implementation
//!
//! ```rust,ignore
//! struct MyClient {
//!     http: HttpClient,
//!     me: String,
//!     hub: EventHub,
//! }
//!
//! #[async_trait]
//! impl Session for MyClient {
//!     fn current_user_id(&self) -> &str {
//!         &self.me
//!     }
//!
//!     fn events(&self) -> &EventHub {
//!         &self.hub
//!     }
//!
//!     async fn send_embed(&self, channel_id: &str, embed: &Embed) -> ApiResult<Message> {
//!         self.http.create_message(channel_id, json!({ "embeds": [embed] })).await
//!     }
//!
//!     // ...
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::hub::EventHub;
use crate::model::{Embed, Message};

/// The chat-platform client used by widgets.
#[async_trait]
pub trait Session: Send + Sync {
    /// Returns the user id the session is logged in as.
    ///
    /// Reactions from this user never trigger widget handlers.
    fn current_user_id(&self) -> &str;

    /// Returns the hub gateway events for this session are published to.
    fn events(&self) -> &EventHub;

    /// Sends a plain-text message.
    async fn send_message(&self, channel_id: &str, content: &str) -> ApiResult<Message>;

    /// Sends a message carrying a single embed.
    async fn send_embed(&self, channel_id: &str, embed: &Embed) -> ApiResult<Message>;

    /// Replaces the embed of an existing message.
    async fn edit_embed(
        &self,
        channel_id: &str,
        message_id: &str,
        embed: &Embed,
    ) -> ApiResult<Message>;

    /// Deletes a message.
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> ApiResult<()>;

    /// Adds a reaction as the current user.
    async fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str)
    -> ApiResult<()>;

    /// Removes `user_id`'s reaction.
    async fn remove_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
        user_id: &str,
    ) -> ApiResult<()>;

    /// Fetches a single message.
    async fn fetch_message(&self, channel_id: &str, message_id: &str) -> ApiResult<Message>;
}

/// A shared Session trait object.
pub type BoxedSession = Arc<dyn Session>;
