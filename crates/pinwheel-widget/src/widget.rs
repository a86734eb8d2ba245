//! Reaction-driven embed widget.
//!
//! A [`Widget`] is a message embed with reactions acting as buttons. Each
//! button is an emoji bound to an async handler. Once spawned (or hooked onto
//! an existing message) the widget runs a listen loop until it is closed, its
//! timeout expires, or the message disappears.
//!
//! ```text
//!          spawn / hook                close / timeout / removed
//!   idle ───────────────▶ running ───────────────────────────▶ idle
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let widget = Widget::builder(session, channel_id)
//!     .embed(Embed::new().description("Vote!"))
//!     .timeout(Duration::from_secs(60))
//!     .build();
//!
//! widget
//!     .handle("👍", |widget, reaction| async move {
//!         let embed = Embed::new().description(format!("{} voted", reaction.user_id));
//!         widget.update_embed(embed).await.ok();
//!     })
//!     .await?;
//!
//! let reason = widget.spawn().await?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use pinwheel_core::{ApiError, BoxedSession, Embed, Message, Reaction};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, debug_span, info, warn};

use crate::bridge;
use crate::error::{WidgetError, WidgetResult};
use crate::options::WidgetOptions;

/// An async callback bound to an emoji.
pub type WidgetHandler = Arc<dyn Fn(Arc<Widget>, Reaction) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async closure into a [`WidgetHandler`].
pub fn into_handler<F, Fut>(handler: F) -> WidgetHandler
where
    F: Fn(Arc<Widget>, Reaction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |widget, reaction| Box::pin(handler(widget, reaction)))
}

/// Why a listen loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// [`Widget::close`] was called.
    Closed,
    /// The configured timeout expired.
    TimedOut,
    /// The message, its channel or its guild was deleted.
    MessageRemoved,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Closed => "closed",
            Self::TimedOut => "timed out",
            Self::MessageRemoved => "message removed",
        })
    }
}

// =============================================================================
// Handler registry
// =============================================================================

#[derive(Default)]
struct Handlers {
    /// Emoji in registration order; decides the order buttons are added.
    keys: Vec<String>,
    map: HashMap<String, WidgetHandler>,
}

impl Handlers {
    /// Returns `false` if the emoji already has a handler.
    fn insert(&mut self, emoji: String, handler: WidgetHandler) -> bool {
        if self.map.contains_key(&emoji) {
            return false;
        }
        self.keys.push(emoji.clone());
        self.map.insert(emoji, handler);
        true
    }
}

// =============================================================================
// Run state
// =============================================================================

struct RunSlot {
    generation: u64,
    token: CancellationToken,
}

/// Proof that the widget was switched to running.
///
/// Dropping it returns the widget to idle unless a newer run took over, so
/// every early return after [`Widget::begin`] resets the running flag.
struct ActiveRun<'a> {
    widget: &'a Widget,
    generation: u64,
    token: CancellationToken,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.widget.finish(self.generation);
    }
}

// =============================================================================
// Widget
// =============================================================================

/// A message embed with reactions for buttons.
pub struct Widget {
    session: RwLock<BoxedSession>,
    channel_id: RwLock<String>,
    embed: RwLock<Option<Embed>>,
    message: RwLock<Option<Message>>,
    handlers: RwLock<Handlers>,
    options: RwLock<WidgetOptions>,
    running: AtomicBool,
    run: Mutex<Option<RunSlot>>,
    generation: AtomicU64,
    tasks: TaskTracker,
    task_wait: tokio::sync::Mutex<()>,
}

impl Widget {
    /// Creates a widget for `channel_id` with default options.
    pub fn new(
        session: BoxedSession,
        channel_id: impl Into<String>,
        embed: Option<Embed>,
    ) -> Arc<Self> {
        let mut builder = Self::builder(session, channel_id);
        builder.embed = embed;
        builder.build()
    }

    /// Starts building a widget.
    pub fn builder(session: BoxedSession, channel_id: impl Into<String>) -> WidgetBuilder {
        WidgetBuilder {
            session,
            channel_id: channel_id.into(),
            embed: None,
            options: WidgetOptions::default(),
            handlers: Handlers::default(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns `true` while a listen loop is active.
    pub fn running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn session(&self) -> BoxedSession {
        Arc::clone(&self.session.read())
    }

    pub fn channel_id(&self) -> String {
        self.channel_id.read().clone()
    }

    /// The current embed.
    pub fn embed(&self) -> Option<Embed> {
        self.embed.read().clone()
    }

    /// Replaces the embed used by the next [`spawn`](Self::spawn).
    ///
    /// Does not touch a live message; use [`update_embed`](Self::update_embed) for that.
    pub fn set_embed(&self, embed: Embed) {
        *self.embed.write() = Some(embed);
    }

    /// The spawned or hooked message.
    pub fn message(&self) -> Option<Message> {
        self.message.read().clone()
    }

    /// Registered emoji in registration order.
    pub fn handler_keys(&self) -> Vec<String> {
        self.handlers.read().keys.clone()
    }

    pub fn options(&self) -> WidgetOptions {
        self.options.read().clone()
    }

    /// Changes the options. Takes effect for the next listen loop.
    pub fn update_options(&self, f: impl FnOnce(&mut WidgetOptions)) {
        f(&mut self.options.write());
    }

    fn handler(&self, emoji: &str) -> Option<WidgetHandler> {
        self.handlers.read().map.get(emoji).cloned()
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    /// Binds `handler` to the emoji `emoji_name`.
    ///
    /// A second registration for the same emoji is ignored. If the widget is
    /// running, the reaction button is added to the live message right away.
    pub async fn handle<F, Fut>(
        &self,
        emoji_name: impl Into<String>,
        handler: F,
    ) -> WidgetResult<()>
    where
        F: Fn(Arc<Widget>, Reaction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let emoji = emoji_name.into();
        if !self.handlers.write().insert(emoji.clone(), into_handler(handler)) {
            debug!(emoji = %emoji, "Handler already registered, ignoring");
            return Ok(());
        }

        if self.running()
            && let Some(message) = self.message()
        {
            self.session()
                .add_reaction(&message.channel_id, &message.id, &emoji)
                .await?;
        }
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn begin(&self) -> WidgetResult<ActiveRun<'_>> {
        let mut slot = self.run.lock();
        if self.running.load(Ordering::Acquire) {
            return Err(WidgetError::AlreadyRunning);
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();
        *slot = Some(RunSlot {
            generation,
            token: token.clone(),
        });
        self.running.store(true, Ordering::Release);

        Ok(ActiveRun {
            widget: self,
            generation,
            token,
        })
    }

    fn is_current(&self, generation: u64) -> bool {
        self.run
            .lock()
            .as_ref()
            .is_some_and(|run| run.generation == generation)
    }

    /// Stores `message` as the live message unless run `generation` ended.
    fn store_message(&self, generation: u64, message: &Message) -> bool {
        let slot = self.run.lock();
        if !slot.as_ref().is_some_and(|run| run.generation == generation) {
            return false;
        }
        *self.message.write() = Some(message.clone());
        true
    }

    fn finish(&self, generation: u64) {
        let mut slot = self.run.lock();
        if slot.as_ref().is_some_and(|run| run.generation == generation) {
            *slot = None;
            self.running.store(false, Ordering::Release);
        }
    }

    /// Sends the embed as a new message, adds the buttons and listens.
    ///
    /// Returns once the listen loop ends.
    pub async fn spawn(self: &Arc<Self>) -> WidgetResult<StopReason> {
        let run = self.begin()?;
        let embed = self.embed().ok_or(WidgetError::NilEmbed)?;

        let session = self.session();
        let channel_id = self.channel_id();
        let message = session.send_embed(&channel_id, &embed).await?;
        if !self.store_message(run.generation, &message) {
            debug!(message_id = %message.id, "Widget closed while sending, discarding message");
            if let Err(e) = session.delete_message(&message.channel_id, &message.id).await {
                debug!(error = %e, "Failed to delete discarded widget message");
            }
            return Ok(StopReason::Closed);
        }
        info!(channel_id = %channel_id, message_id = %message.id, "Widget spawned");

        for emoji in self.handler_keys() {
            if !self.is_current(run.generation) {
                break;
            }
            if let Err(e) = session
                .add_reaction(&message.channel_id, &message.id, &emoji)
                .await
            {
                warn!(emoji = %emoji, error = %e, "Failed to add reaction button");
            }
        }

        self.listen(run, message).await
    }

    /// Attaches the widget to an existing message and listens.
    ///
    /// The message's first embed becomes the widget's embed. Reaction buttons
    /// are assumed to be present already and are not added again.
    pub async fn hook(
        self: &Arc<Self>,
        session: BoxedSession,
        channel_id: &str,
        message_id: &str,
    ) -> WidgetResult<StopReason> {
        let run = self.begin()?;
        *self.session.write() = Arc::clone(&session);

        let message = session.fetch_message(channel_id, message_id).await?;
        if !self.store_message(run.generation, &message) {
            return Ok(StopReason::Closed);
        }
        let embed = message.first_embed().cloned().ok_or(WidgetError::NilEmbed)?;
        *self.embed.write() = Some(embed);
        *self.channel_id.write() = message.channel_id.clone();
        info!(channel_id = %channel_id, message_id = %message_id, "Widget hooked");

        self.listen(run, message).await
    }

    /// Stops the listen loop.
    pub fn close(&self) -> WidgetResult<()> {
        let mut slot = self.run.lock();
        let Some(run) = slot.take() else {
            return Err(WidgetError::NotRunning);
        };
        run.token.cancel();
        self.running.store(false, Ordering::Release);
        debug!(generation = run.generation, "Widget closed");
        Ok(())
    }

    async fn listen(
        self: &Arc<Self>,
        run: ActiveRun<'_>,
        message: Message,
    ) -> WidgetResult<StopReason> {
        let span = debug_span!("widget", message_id = %message.id);
        let reason = self.listen_loop(&run.token, &message).instrument(span).await;
        drop(run);
        Ok(reason)
    }

    async fn listen_loop(
        self: &Arc<Self>,
        token: &CancellationToken,
        message: &Message,
    ) -> StopReason {
        let session = self.session();
        let options = self.options();
        let hub = session.events();

        let mut reactions = bridge::reaction_add_for_message(hub, message);
        let removed = bridge::message_removed(hub, message);

        let timeout = options.timeout();
        let deadline = async move {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);

        let reason = loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break StopReason::Closed,
                _ = &mut deadline => break StopReason::TimedOut,
                _ = removed.wait() => break StopReason::MessageRemoved,
                Some(reaction) = reactions.recv() => {
                    self.on_reaction(&session, &options, message, reaction);
                }
            }
        };

        reactions.cancel();
        removed.cancel();

        if reason == StopReason::TimedOut && options.delete_on_timeout {
            if let Err(e) = session.delete_message(&message.channel_id, &message.id).await {
                debug!(error = %e, "Failed to delete widget message on timeout");
            }
        }

        info!(reason = %reason, "Widget stopped");
        reason
    }

    fn on_reaction(
        self: &Arc<Self>,
        session: &BoxedSession,
        options: &WidgetOptions,
        message: &Message,
        reaction: Reaction,
    ) {
        if reaction.message_id != message.id || reaction.user_id == session.current_user_id() {
            return;
        }

        if options.is_user_allowed(&reaction.user_id)
            && let Some(handler) = self.handler(&reaction.emoji.name)
        {
            debug!(
                emoji = %reaction.emoji.name,
                user_id = %reaction.user_id,
                "Dispatching handler"
            );
            self.tasks.spawn(handler(Arc::clone(self), reaction.clone()));
        }

        if options.delete_reactions {
            let session = Arc::clone(session);
            let delay = options.reaction_reset_delay();
            self.tasks.spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = session
                    .remove_reaction(
                        &reaction.channel_id,
                        &reaction.message_id,
                        &reaction.emoji.api_name(),
                        &reaction.user_id,
                    )
                    .await
                {
                    debug!(error = %e, "Failed to reset reaction");
                }
            });
        }
    }

    /// Waits for handler and reaction-reset tasks spawned so far.
    ///
    /// Concurrent callers wait one after another.
    pub async fn wait_tasks(&self) {
        let _waiting = self.task_wait.lock().await;
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Asks `user_id` for text input in the widget's channel.
    ///
    /// Both the prompt and the reply are deleted. Returns
    /// [`WidgetError::Timeout`] if the user does not answer within `timeout`.
    pub async fn query_input(
        &self,
        prompt: &str,
        user_id: &str,
        timeout: Duration,
    ) -> WidgetResult<Message> {
        let session = self.session();
        let channel_id = self.channel_id();
        let replies = bridge::messages_from_user(session.events(), user_id);
        let prompt_message = session
            .send_message(&channel_id, &format!("<@{user_id}>,  {prompt}"))
            .await?;

        let result = Self::await_reply(&session, replies, timeout).await;

        if let Err(e) = session
            .delete_message(&prompt_message.channel_id, &prompt_message.id)
            .await
        {
            debug!(error = %e, "Failed to delete query prompt");
        }
        result
    }

    async fn await_reply(
        session: &BoxedSession,
        mut replies: bridge::MessageStream,
        timeout: Duration,
    ) -> WidgetResult<Message> {
        let reply = tokio::select! {
            reply = replies.recv() => reply,
            _ = tokio::time::sleep(timeout) => return Err(WidgetError::Timeout),
        };
        replies.cancel();

        let reply = reply.ok_or(ApiError::NotConnected)?;
        if let Err(e) = session.delete_message(&reply.channel_id, &reply.id).await {
            debug!(error = %e, "Failed to delete query reply");
        }
        Ok(reply)
    }

    /// Replaces the embed of the live message.
    pub async fn update_embed(&self, embed: Embed) -> WidgetResult<Message> {
        let message = self.message().ok_or(WidgetError::NilMessage)?;
        let updated = self
            .session()
            .edit_embed(&message.channel_id, &message.id, &embed)
            .await?;
        *self.embed.write() = Some(embed);
        *self.message.write() = Some(updated.clone());
        Ok(updated)
    }
}

impl std::fmt::Debug for Widget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widget")
            .field("channel_id", &*self.channel_id.read())
            .field("message_id", &self.message.read().as_ref().map(|m| m.id.clone()))
            .field("handlers", &self.handlers.read().keys)
            .field("running", &self.running())
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`Widget`].
pub struct WidgetBuilder {
    session: BoxedSession,
    channel_id: String,
    embed: Option<Embed>,
    options: WidgetOptions,
    handlers: Handlers,
}

impl WidgetBuilder {
    pub fn embed(mut self, embed: Embed) -> Self {
        self.embed = Some(embed);
        self
    }

    /// Replaces all options, e.g. with the `[widget]` section of the config.
    pub fn options(mut self, options: WidgetOptions) -> Self {
        self.options = options;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn delete_reactions(mut self, enabled: bool) -> Self {
        self.options.delete_reactions = enabled;
        self
    }

    pub fn delete_on_timeout(mut self, enabled: bool) -> Self {
        self.options.delete_on_timeout = enabled;
        self
    }

    /// Adds a user to the allow-list.
    pub fn allow_user(mut self, user_id: impl Into<String>) -> Self {
        self.options.allowed_users.push(user_id.into());
        self
    }

    /// Binds a handler before the widget exists. Duplicates are ignored.
    pub fn handler<F, Fut>(mut self, emoji_name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<Widget>, Reaction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.handlers.insert(emoji_name.into(), into_handler(handler));
        self
    }

    pub fn build(self) -> Arc<Widget> {
        Arc::new(Widget {
            session: RwLock::new(self.session),
            channel_id: RwLock::new(self.channel_id),
            embed: RwLock::new(self.embed),
            message: RwLock::new(None),
            handlers: RwLock::new(self.handlers),
            options: RwLock::new(self.options),
            running: AtomicBool::new(false),
            run: Mutex::new(None),
            generation: AtomicU64::new(0),
            tasks: TaskTracker::new(),
            task_wait: tokio::sync::Mutex::new(()),
        })
    }
}
