//! Event bridge.
//!
//! Turns [`EventHub`] callbacks into awaitable channels. Each channel owns
//! the [`Subscription`]s it registered and releases them when cancelled or
//! dropped, so a bridged channel never outlives its consumer.
//!
//! | Function | Semantics |
//! |---|---|
//! | [`next_message_create`] | single-shot: the next message created anywhere |
//! | [`messages_from_user`] | persistent: messages created by one user |
//! | [`reaction_add_for_message`] | persistent: reactions on one message, excluding its author |
//! | [`message_removed`] | resolves once the message, its channel or its guild is deleted |

use std::sync::Arc;

use parking_lot::Mutex;
use pinwheel_core::{EventHub, EventKind, GatewayEvent, Message, Reaction, Subscription};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

// =============================================================================
// Next message
// =============================================================================

/// The next `MESSAGE_CREATE` event.
pub struct NextMessage {
    rx: oneshot::Receiver<Message>,
    _subscription: Subscription,
}

impl NextMessage {
    /// Waits for the message. Returns `None` if the hub went away first.
    pub async fn recv(self) -> Option<Message> {
        self.rx.await.ok()
    }
}

/// Subscribes to the very next message created, system-wide.
pub fn next_message_create(hub: &EventHub) -> NextMessage {
    let (tx, rx) = oneshot::channel();
    let tx = Mutex::new(Some(tx));
    let subscription = hub.add_handler_once(EventKind::MessageCreate, move |event| {
        if let GatewayEvent::MessageCreate(message) = event
            && let Some(tx) = tx.lock().take()
        {
            let _ = tx.send(message.clone());
        }
    });

    NextMessage {
        rx,
        _subscription: subscription,
    }
}

/// Stream of messages created by one user.
pub struct MessageStream {
    rx: mpsc::UnboundedReceiver<Message>,
    subscription: Subscription,
}

impl MessageStream {
    /// Receives the next message. Returns `None` once cancelled and drained.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Stops delivering messages. Safe to call more than once.
    pub fn cancel(&self) {
        self.subscription.cancel();
    }
}

/// Subscribes to every message created by `user_id`, in any channel.
///
/// Messages by other users are dropped inside the callback, so the
/// subscription stays registered between deliveries.
pub fn messages_from_user(hub: &EventHub, user_id: &str) -> MessageStream {
    let (tx, rx) = mpsc::unbounded_channel();
    let user_id = user_id.to_string();

    let subscription = hub.add_handler(EventKind::MessageCreate, move |event| {
        if let GatewayEvent::MessageCreate(message) = event
            && message.author.id == user_id
        {
            let _ = tx.send(message.clone());
        }
    });

    MessageStream { rx, subscription }
}

// =============================================================================
// Reactions
// =============================================================================

/// Stream of reactions added to one message.
pub struct ReactionStream {
    rx: mpsc::UnboundedReceiver<Reaction>,
    subscription: Subscription,
}

impl ReactionStream {
    /// Receives the next reaction. Returns `None` once cancelled and drained.
    pub async fn recv(&mut self) -> Option<Reaction> {
        self.rx.recv().await
    }

    /// Stops delivering reactions. Safe to call more than once.
    pub fn cancel(&self) {
        self.subscription.cancel();
    }
}

/// Subscribes to reactions added to `message` by anyone but its author.
pub fn reaction_add_for_message(hub: &EventHub, message: &Message) -> ReactionStream {
    let (tx, rx) = mpsc::unbounded_channel();
    let message_id = message.id.clone();
    let author_id = message.author.id.clone();

    let subscription = hub.add_handler(EventKind::ReactionAdd, move |event| {
        if let GatewayEvent::ReactionAdd(reaction) = event
            && reaction.message_id == message_id
            && reaction.user_id != author_id
        {
            let _ = tx.send(reaction.clone());
        }
    });

    ReactionStream { rx, subscription }
}

// =============================================================================
// Message removal
// =============================================================================

/// Signal that a message is gone.
pub struct MessageRemoved {
    signal: CancellationToken,
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
}

impl MessageRemoved {
    /// Waits until the message is removed.
    ///
    /// Never resolves if the watch is cancelled first.
    pub async fn wait(&self) {
        self.signal.cancelled().await;
    }

    /// Returns `true` once removal was observed.
    pub fn is_removed(&self) -> bool {
        self.signal.is_cancelled()
    }

    /// Stops watching without signaling.
    pub fn cancel(&self) {
        self.subscriptions.lock().clear();
    }
}

/// Watches for `message` disappearing.
///
/// Matches a message delete, a bulk delete containing the message, deletion
/// of its channel, or deletion of its guild. All four subscriptions are
/// released before the signal fires.
pub fn message_removed(hub: &EventHub, message: &Message) -> MessageRemoved {
    let signal = CancellationToken::new();
    let subscriptions: Arc<Mutex<Vec<Subscription>>> = Arc::default();

    let fire: Arc<dyn Fn(&'static str) + Send + Sync> = {
        let signal = signal.clone();
        let subscriptions = Arc::downgrade(&subscriptions);
        let message_id = message.id.clone();
        Arc::new(move |cause: &'static str| {
            if let Some(subscriptions) = subscriptions.upgrade() {
                subscriptions.lock().clear();
            }
            if !signal.is_cancelled() {
                debug!(message_id = %message_id, cause, "Widget message removed");
                signal.cancel();
            }
        })
    };

    let mut subs = Vec::with_capacity(4);

    let id = message.id.clone();
    let on_remove = Arc::clone(&fire);
    subs.push(hub.add_handler(EventKind::MessageDelete, move |event| {
        if let GatewayEvent::MessageDelete(deleted) = event
            && deleted.id == id
        {
            on_remove("message delete");
        }
    }));

    let id = message.id.clone();
    let on_remove = Arc::clone(&fire);
    subs.push(hub.add_handler(EventKind::MessageDeleteBulk, move |event| {
        if let GatewayEvent::MessageDeleteBulk(deleted) = event
            && deleted.ids.contains(&id)
        {
            on_remove("bulk delete");
        }
    }));

    let channel_id = message.channel_id.clone();
    let on_remove = Arc::clone(&fire);
    subs.push(hub.add_handler(EventKind::ChannelDelete, move |event| {
        if let GatewayEvent::ChannelDelete(channel) = event
            && channel.id == channel_id
        {
            on_remove("channel delete");
        }
    }));

    if let Some(guild_id) = message.guild_id.clone() {
        let on_remove = Arc::clone(&fire);
        subs.push(hub.add_handler(EventKind::GuildDelete, move |event| {
            if let GatewayEvent::GuildDelete(guild) = event
                && guild.id == guild_id
            {
                on_remove("guild delete");
            }
        }));
    }

    *subscriptions.lock() = subs;
    if signal.is_cancelled() {
        subscriptions.lock().clear();
    }
    MessageRemoved {
        signal,
        subscriptions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinwheel_core::{ChannelDelete, Emoji, GuildDelete, MessageDelete, MessageDeleteBulk, User};

    fn bot_message() -> Message {
        Message {
            id: "m1".to_string(),
            channel_id: "c1".to_string(),
            guild_id: Some("g1".to_string()),
            author: User::new("bot"),
            ..Default::default()
        }
    }

    fn reaction(message_id: &str, user_id: &str) -> GatewayEvent {
        GatewayEvent::ReactionAdd(Reaction {
            user_id: user_id.to_string(),
            message_id: message_id.to_string(),
            channel_id: "c1".to_string(),
            guild_id: None,
            emoji: Emoji::unicode("👍"),
        })
    }

    #[tokio::test]
    async fn test_next_message_create_is_single_shot() {
        let hub = EventHub::new();
        let next = next_message_create(&hub);

        let first = Message {
            id: "a".to_string(),
            ..Default::default()
        };
        assert_eq!(hub.publish(&GatewayEvent::MessageCreate(first.clone())), 1);
        assert_eq!(hub.publish(&GatewayEvent::MessageCreate(Message::default())), 0);
        assert_eq!(next.recv().await, Some(first));
    }

    #[test]
    fn test_dropping_next_message_deregisters() {
        let hub = EventHub::new();
        drop(next_message_create(&hub));
        assert_eq!(hub.handler_count(), 0);
    }

    #[tokio::test]
    async fn test_messages_from_user_skips_other_authors() {
        let hub = EventHub::new();
        let mut stream = messages_from_user(&hub, "alice");

        let by = |id: &str, author: &str| {
            GatewayEvent::MessageCreate(Message {
                id: id.to_string(),
                author: User::new(author),
                ..Default::default()
            })
        };
        hub.publish(&by("1", "bob"));
        hub.publish(&by("2", "alice"));
        hub.publish(&by("3", "bob"));
        hub.publish(&by("4", "alice"));
        assert_eq!(hub.handler_count(), 1);

        assert_eq!(stream.recv().await.unwrap().id, "2");
        assert_eq!(stream.recv().await.unwrap().id, "4");
        assert!(stream.rx.try_recv().is_err());

        stream.cancel();
        assert_eq!(hub.handler_count(), 0);
        assert_eq!(stream.recv().await, None);
    }

    #[tokio::test]
    async fn test_reaction_stream_filters_message_and_author() {
        let hub = EventHub::new();
        let message = bot_message();
        let mut stream = reaction_add_for_message(&hub, &message);

        hub.publish(&reaction("other", "alice"));
        hub.publish(&reaction("m1", "bot"));
        hub.publish(&reaction("m1", "alice"));

        let got = stream.recv().await.unwrap();
        assert_eq!(got.user_id, "alice");
        assert!(stream.rx.try_recv().is_err());

        stream.cancel();
        stream.cancel();
        assert_eq!(hub.handler_count(), 0);
    }

    #[tokio::test]
    async fn test_message_removed_by_delete() {
        let hub = EventHub::new();
        let watch = message_removed(&hub, &bot_message());
        assert_eq!(hub.handler_count(), 4);

        hub.publish(&GatewayEvent::MessageDelete(MessageDelete {
            id: "unrelated".to_string(),
            channel_id: "c1".to_string(),
            guild_id: None,
        }));
        assert!(!watch.is_removed());

        hub.publish(&GatewayEvent::MessageDelete(MessageDelete {
            id: "m1".to_string(),
            channel_id: "c1".to_string(),
            guild_id: None,
        }));
        watch.wait().await;
        assert!(watch.is_removed());
        assert_eq!(hub.handler_count(), 0);
    }

    #[test]
    fn test_message_removed_by_bulk_channel_and_guild() {
        let events = [
            GatewayEvent::MessageDeleteBulk(MessageDeleteBulk {
                ids: vec!["x".to_string(), "m1".to_string()],
                channel_id: "c1".to_string(),
                guild_id: None,
            }),
            GatewayEvent::ChannelDelete(ChannelDelete {
                id: "c1".to_string(),
                guild_id: None,
            }),
            GatewayEvent::GuildDelete(GuildDelete {
                id: "g1".to_string(),
                unavailable: false,
            }),
        ];

        for event in events {
            let hub = EventHub::new();
            let watch = message_removed(&hub, &bot_message());
            hub.publish(&event);
            assert!(watch.is_removed(), "{:?}", event.kind());
            assert_eq!(hub.handler_count(), 0);
        }
    }

    #[test]
    fn test_message_removed_cancel() {
        let hub = EventHub::new();
        let watch = message_removed(&hub, &bot_message());
        watch.cancel();
        watch.cancel();
        assert_eq!(hub.handler_count(), 0);
        assert!(!watch.is_removed());
    }
}
