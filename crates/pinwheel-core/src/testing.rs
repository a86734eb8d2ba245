//! Testing utilities.
//!
//! [`MockSession`] is an in-memory [`Session`] that records every call and
//! keeps sent messages around so they can be fetched again. Gateway events are
//! simulated by publishing into [`MockSession::events`].
//!
//! # Example
//!
//! ```rust,ignore
//! let session = Arc::new(MockSession::new("bot"));
//! let msg = session.send_embed("chan", &Embed::new()).await?;
//!
//! session.events().publish(&GatewayEvent::ReactionAdd(reaction));
//! assert_eq!(session.calls().len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{ApiError, ApiResult};
use crate::hub::EventHub;
use crate::model::{Embed, Emoji, Message, Reaction, User};
use crate::session::Session;

/// A call recorded by [`MockSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SendMessage {
        channel_id: String,
        content: String,
    },
    SendEmbed {
        channel_id: String,
        embed: Embed,
    },
    EditEmbed {
        channel_id: String,
        message_id: String,
        embed: Embed,
    },
    DeleteMessage {
        channel_id: String,
        message_id: String,
    },
    AddReaction {
        channel_id: String,
        message_id: String,
        emoji: String,
    },
    RemoveReaction {
        channel_id: String,
        message_id: String,
        emoji: String,
        user_id: String,
    },
    FetchMessage {
        channel_id: String,
        message_id: String,
    },
}

/// In-memory [`Session`] for tests.
pub struct MockSession {
    user: User,
    hub: EventHub,
    calls: Mutex<Vec<Call>>,
    messages: Mutex<HashMap<String, Message>>,
    next_id: AtomicU64,
    fail_sends: AtomicBool,
    fail_reactions: AtomicBool,
    on_send: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl MockSession {
    /// Creates a session logged in as `user_id`.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user: User {
                id: user_id.into(),
                username: "pinwheel".to_string(),
                bot: true,
            },
            hub: EventHub::new(),
            calls: Mutex::new(Vec::new()),
            messages: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1000),
            fail_sends: AtomicBool::new(false),
            fail_reactions: AtomicBool::new(false),
            on_send: Mutex::new(None),
        }
    }

    /// Makes `send_message` and `send_embed` fail.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Makes `add_reaction` fail.
    pub fn set_fail_reactions(&self, fail: bool) {
        self.fail_reactions.store(fail, Ordering::SeqCst);
    }

    /// Runs `f` once, inside the next `send_embed`, after the message is stored.
    ///
    /// Lets tests act while a send is still in flight.
    pub fn on_next_send(&self, f: impl FnOnce() + Send + 'static) {
        *self.on_send.lock() = Some(Box::new(f));
    }

    /// Stores a message so it can be fetched.
    pub fn insert_message(&self, message: Message) {
        self.messages.lock().insert(message.id.clone(), message);
    }

    /// Returns `true` if the message exists (was inserted or sent, and not deleted).
    pub fn has_message(&self, message_id: &str) -> bool {
        self.messages.lock().contains_key(message_id)
    }

    /// Returns a snapshot of all recorded calls.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Returns the recorded calls matching `predicate`.
    pub fn calls_matching(&self, predicate: impl Fn(&Call) -> bool) -> Vec<Call> {
        self.calls.lock().iter().filter(|c| predicate(c)).cloned().collect()
    }

    /// Builds a reaction-add payload for one of this session's messages.
    pub fn reaction(&self, message: &Message, user_id: &str, emoji: &str) -> Reaction {
        Reaction {
            user_id: user_id.to_string(),
            message_id: message.id.clone(),
            channel_id: message.channel_id.clone(),
            guild_id: message.guild_id.clone(),
            emoji: Emoji::unicode(emoji),
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn store_new(&self, channel_id: &str, content: &str, embeds: Vec<Embed>) -> Message {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let message = Message {
            id: id.clone(),
            channel_id: channel_id.to_string(),
            guild_id: None,
            author: self.user.clone(),
            content: content.to_string(),
            embeds,
        };
        self.messages.lock().insert(id, message.clone());
        message
    }
}

#[async_trait]
impl Session for MockSession {
    fn current_user_id(&self) -> &str {
        &self.user.id
    }

    fn events(&self) -> &EventHub {
        &self.hub
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> ApiResult<Message> {
        self.record(Call::SendMessage {
            channel_id: channel_id.to_string(),
            content: content.to_string(),
        });
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ApiError::Forbidden("SEND_MESSAGES".to_string()));
        }
        Ok(self.store_new(channel_id, content, Vec::new()))
    }

    async fn send_embed(&self, channel_id: &str, embed: &Embed) -> ApiResult<Message> {
        self.record(Call::SendEmbed {
            channel_id: channel_id.to_string(),
            embed: embed.clone(),
        });
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ApiError::Forbidden("SEND_MESSAGES".to_string()));
        }
        let message = self.store_new(channel_id, "", vec![embed.clone()]);
        let hook = self.on_send.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        Ok(message)
    }

    async fn edit_embed(
        &self,
        channel_id: &str,
        message_id: &str,
        embed: &Embed,
    ) -> ApiResult<Message> {
        self.record(Call::EditEmbed {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
            embed: embed.clone(),
        });
        let mut messages = self.messages.lock();
        let message = messages
            .get_mut(message_id)
            .ok_or_else(|| ApiError::not_found(format!("message {message_id}")))?;
        message.embeds = vec![embed.clone()];
        Ok(message.clone())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> ApiResult<()> {
        self.record(Call::DeleteMessage {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
        });
        self.messages
            .lock()
            .remove(message_id)
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found(format!("message {message_id}")))
    }

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> ApiResult<()> {
        self.record(Call::AddReaction {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
            emoji: emoji.to_string(),
        });
        if self.fail_reactions.load(Ordering::SeqCst) {
            return Err(ApiError::Forbidden("ADD_REACTIONS".to_string()));
        }
        Ok(())
    }

    async fn remove_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
        user_id: &str,
    ) -> ApiResult<()> {
        self.record(Call::RemoveReaction {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
            emoji: emoji.to_string(),
            user_id: user_id.to_string(),
        });
        Ok(())
    }

    async fn fetch_message(&self, channel_id: &str, message_id: &str) -> ApiResult<Message> {
        self.record(Call::FetchMessage {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
        });
        self.messages
            .lock()
            .get(message_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("message {message_id}")))
    }
}
