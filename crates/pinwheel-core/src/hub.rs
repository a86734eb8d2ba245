//! Event subscription registry.
//!
//! The [`EventHub`] sits between the host's gateway client and the widgets.
//! The host publishes every gateway dispatch it receives; widgets (through the
//! bridge in `pinwheel-widget`) register callbacks keyed by [`EventKind`].
//!
//! ```text
//! Gateway client ──publish──▶ EventHub ──callback──▶ bridge channel ──▶ Widget
//! ```
//!
//! Every registration returns a [`Subscription`]. Cancelling it (explicitly
//! or by dropping it) removes the callback; cancelling twice is a no-op.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::trace;

use crate::error::ApiResult;
use crate::event::{EventKind, GatewayEvent};

/// A callback invoked for each published event of the subscribed kind.
pub type EventCallback = Arc<dyn Fn(&GatewayEvent) + Send + Sync>;

struct Entry {
    kind: EventKind,
    once: bool,
    callback: EventCallback,
}

struct HubInner {
    next_id: AtomicU64,
    /// Keyed by registration id so callbacks run in registration order.
    handlers: Mutex<BTreeMap<u64, Entry>>,
}

impl HubInner {
    fn remove(&self, id: u64) -> bool {
        self.handlers.lock().remove(&id).is_some()
    }
}

// =============================================================================
// EventHub
// =============================================================================

/// Registry of event callbacks.
///
/// `EventHub` is cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                next_id: AtomicU64::new(1),
                handlers: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Registers a persistent callback for `kind`.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// cancelled or dropped.
    pub fn add_handler<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        self.register(kind, false, Arc::new(callback))
    }

    /// Registers a callback that fires for the next event of `kind` only.
    ///
    /// Dropping the returned [`Subscription`] before the event arrives
    /// deregisters the callback.
    pub fn add_handler_once<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        self.register(kind, true, Arc::new(callback))
    }

    fn register(&self, kind: EventKind, once: bool, callback: EventCallback) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.handlers.lock().insert(
            id,
            Entry {
                kind,
                once,
                callback,
            },
        );
        trace!(id, kind = %kind, once, "Registered event handler");

        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
            active: AtomicBool::new(true),
        }
    }

    /// Publishes an event to every callback subscribed to its kind.
    ///
    /// Single-shot callbacks are removed before any callback runs, and no
    /// lock is held while callbacks execute, so callbacks may freely cancel
    /// subscriptions or register new ones.
    ///
    /// Returns the number of callbacks invoked.
    pub fn publish(&self, event: &GatewayEvent) -> usize {
        let kind = event.kind();
        let callbacks: Vec<EventCallback> = {
            let mut handlers = self.inner.handlers.lock();
            let matching: Vec<(u64, bool)> = handlers
                .iter()
                .filter(|(_, entry)| entry.kind == kind)
                .map(|(id, entry)| (*id, entry.once))
                .collect();

            matching
                .into_iter()
                .filter_map(|(id, once)| {
                    if once {
                        handlers.remove(&id).map(|entry| entry.callback)
                    } else {
                        handlers.get(&id).map(|entry| Arc::clone(&entry.callback))
                    }
                })
                .collect()
        };

        trace!(kind = %kind, count = callbacks.len(), "Publishing event");
        for callback in &callbacks {
            callback(event);
        }
        callbacks.len()
    }

    /// Parses a raw gateway dispatch and publishes it.
    ///
    /// Dispatches widgets do not care about are dropped and count as zero
    /// invocations.
    pub fn publish_raw(&self, name: &str, payload: &Value) -> ApiResult<usize> {
        Ok(GatewayEvent::parse(name, payload)?
            .map(|event| self.publish(&event))
            .unwrap_or(0))
    }

    /// Returns the number of registered callbacks.
    pub fn handler_count(&self) -> usize {
        self.inner.handlers.lock().len()
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("handler_count", &self.handler_count())
            .finish()
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Handle to a registered callback.
///
/// Cancels the registration when dropped.
pub struct Subscription {
    id: u64,
    hub: Weak<HubInner>,
    active: AtomicBool,
}

impl Subscription {
    /// Deregisters the callback. Subsequent calls do nothing.
    pub fn cancel(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(hub) = self.hub.upgrade()
            && hub.remove(self.id)
        {
            trace!(id = self.id, "Cancelled event handler");
        }
    }

    /// Returns `true` while the callback is still registered.
    ///
    /// A single-shot callback stops being registered once it has fired.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
            && self
                .hub
                .upgrade()
                .is_some_and(|hub| hub.handlers.lock().contains_key(&self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MessageDelete;
    use crate::model::Message;
    use std::sync::atomic::AtomicUsize;

    fn delete_event(id: &str) -> GatewayEvent {
        GatewayEvent::MessageDelete(MessageDelete {
            id: id.to_string(),
            channel_id: "c".to_string(),
            guild_id: None,
        })
    }

    fn counter_handler(
        counter: &Arc<AtomicUsize>,
    ) -> impl Fn(&GatewayEvent) + Send + Sync + use<> {
        let counter = Arc::clone(counter);
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_persistent_handler_fires_until_cancelled() {
        let hub = EventHub::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let sub = hub.add_handler(EventKind::MessageDelete, counter_handler(&counter));

        hub.publish(&delete_event("1"));
        hub.publish(&delete_event("2"));
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        sub.cancel();
        sub.cancel();
        hub.publish(&delete_event("3"));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(hub.handler_count(), 0);
    }

    #[test]
    fn test_once_handler_fires_once() {
        let hub = EventHub::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let sub = hub.add_handler_once(EventKind::MessageDelete, counter_handler(&counter));
        assert!(sub.is_active());

        assert_eq!(hub.publish(&delete_event("1")), 1);
        assert_eq!(hub.publish(&delete_event("2")), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!sub.is_active());
    }

    #[test]
    fn test_handlers_only_see_their_kind() {
        let hub = EventHub::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let _sub = hub.add_handler(EventKind::MessageCreate, counter_handler(&counter));

        hub.publish(&delete_event("1"));
        hub.publish(&GatewayEvent::MessageCreate(Message::default()));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_cancels_subscription() {
        let hub = EventHub::new();
        {
            let _sub = hub.add_handler(EventKind::GuildDelete, |_| {});
            assert_eq!(hub.handler_count(), 1);
        }
        assert_eq!(hub.handler_count(), 0);
    }

    #[test]
    fn test_callback_may_cancel_itself() {
        let hub = EventHub::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let slot_clone = Arc::clone(&slot);
        let sub = hub.add_handler(EventKind::MessageDelete, move |_| {
            if let Some(sub) = slot_clone.lock().take() {
                sub.cancel();
            }
        });
        *slot.lock() = Some(sub);

        assert_eq!(hub.publish(&delete_event("1")), 1);
        assert_eq!(hub.handler_count(), 0);
    }

    #[test]
    fn test_publish_raw_skips_unknown_dispatch() {
        let hub = EventHub::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let _sub = hub.add_handler(EventKind::MessageDelete, counter_handler(&counter));

        let invoked = hub
            .publish_raw("TYPING_START", &serde_json::json!({}))
            .unwrap();
        assert_eq!(invoked, 0);

        let invoked = hub
            .publish_raw(
                "MESSAGE_DELETE",
                &serde_json::json!({"id": "1", "channel_id": "2"}),
            )
            .unwrap();
        assert_eq!(invoked, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
