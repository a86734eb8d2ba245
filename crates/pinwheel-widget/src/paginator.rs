//! Paginated embeds.
//!
//! A [`Paginator`] wraps a [`Widget`] and a list of page embeds, and binds
//! navigation buttons:
//!
//! | Button | Action |
//! |---|---|
//! | ⏮ | first page |
//! | ◀ | previous page |
//! | ▶ | next page |
//! | ⏭ | last page |
//! | 🔢 | asks the user for a page number |

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use pinwheel_core::{BoxedSession, Embed, Reaction};
use tracing::debug;

use crate::chunk::embeds_from_text;
use crate::error::{WidgetError, WidgetResult};
use crate::widget::{StopReason, Widget};

pub const NAV_BEGINNING: &str = "⏮";
pub const NAV_LEFT: &str = "◀";
pub const NAV_RIGHT: &str = "▶";
pub const NAV_END: &str = "⏭";
pub const NAV_NUMBERS: &str = "🔢";

/// How long the 🔢 button waits for a page number.
pub const PAGE_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

struct Pages {
    embeds: Vec<Embed>,
    index: usize,
    wrap: bool,
}

impl Pages {
    fn goto(&mut self, index: usize) -> WidgetResult<()> {
        if index >= self.embeds.len() {
            return Err(WidgetError::IndexOutOfBounds {
                index,
                len: self.embeds.len(),
            });
        }
        self.index = index;
        Ok(())
    }

    fn next(&mut self) -> WidgetResult<()> {
        let len = self.embeds.len();
        if self.index + 1 < len {
            self.index += 1;
            Ok(())
        } else if self.wrap && len > 0 {
            self.index = 0;
            Ok(())
        } else {
            Err(WidgetError::IndexOutOfBounds {
                index: self.index + 1,
                len,
            })
        }
    }

    fn previous(&mut self) -> WidgetResult<()> {
        let len = self.embeds.len();
        if self.index > 0 && self.index < len {
            self.index -= 1;
            Ok(())
        } else if self.wrap && len > 0 {
            self.index = len - 1;
            Ok(())
        } else {
            Err(WidgetError::IndexOutOfBounds { index: 0, len })
        }
    }

    fn current(&self) -> WidgetResult<Embed> {
        self.embeds
            .get(self.index)
            .cloned()
            .ok_or(WidgetError::IndexOutOfBounds {
                index: self.index,
                len: self.embeds.len(),
            })
    }
}

/// A widget showing one of several pages.
pub struct Paginator {
    widget: Arc<Widget>,
    pages: Mutex<Pages>,
    color_when_done: Mutex<Option<u32>>,
}

impl Paginator {
    pub fn new(session: BoxedSession, channel_id: impl Into<String>) -> Arc<Self> {
        Self::with_widget(Widget::new(session, channel_id, None))
    }

    /// Builds a paginator on top of a configured widget.
    pub fn with_widget(widget: Arc<Widget>) -> Arc<Self> {
        Arc::new(Self {
            widget,
            pages: Mutex::new(Pages {
                embeds: Vec::new(),
                index: 0,
                wrap: false,
            }),
            color_when_done: Mutex::new(None),
        })
    }

    /// The underlying widget.
    pub fn widget(&self) -> &Arc<Widget> {
        &self.widget
    }

    /// Appends pages.
    pub fn add(&self, pages: impl IntoIterator<Item = Embed>) {
        self.pages.lock().embeds.extend(pages);
    }

    /// Appends `text` split into pages of at most `chunk_len` characters.
    pub fn add_text(&self, text: &str, chunk_len: isize) {
        self.add(embeds_from_text(text, chunk_len));
    }

    pub fn len(&self) -> usize {
        self.pages.lock().embeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Zero-based index of the current page.
    pub fn index(&self) -> usize {
        self.pages.lock().index
    }

    /// Wrap around at either end instead of stopping.
    pub fn set_wrap(&self, wrap: bool) {
        self.pages.lock().wrap = wrap;
    }

    /// Color the current page takes once the widget stops.
    pub fn set_color_when_done(&self, color: Option<u32>) {
        *self.color_when_done.lock() = color;
    }

    /// Writes `#[i / n]` into every page footer.
    pub fn set_page_footers(&self) {
        let mut pages = self.pages.lock();
        let len = pages.embeds.len();
        for (i, embed) in pages.embeds.iter_mut().enumerate() {
            *embed = std::mem::take(embed).footer(format!("#[{} / {}]", i + 1, len));
        }
    }

    /// The current page.
    pub fn page(&self) -> WidgetResult<Embed> {
        self.pages.lock().current()
    }

    pub fn goto(&self, index: usize) -> WidgetResult<()> {
        self.pages.lock().goto(index)
    }

    pub fn next_page(&self) -> WidgetResult<()> {
        self.pages.lock().next()
    }

    pub fn previous_page(&self) -> WidgetResult<()> {
        self.pages.lock().previous()
    }

    /// Shows the current page on the live message.
    pub async fn update(&self) -> WidgetResult<()> {
        let page = self.page()?;
        self.widget.update_embed(page).await?;
        Ok(())
    }

    /// Sends the current page, adds the navigation buttons and listens.
    pub async fn spawn(self: &Arc<Self>) -> WidgetResult<StopReason> {
        if self.widget.running() {
            return Err(WidgetError::AlreadyRunning);
        }
        let page = self.page().map_err(|_| WidgetError::NilEmbed)?;
        self.register_navigation().await?;
        self.widget.set_embed(page);

        let reason = self.widget.spawn().await?;

        let color = *self.color_when_done.lock();
        if let Some(color) = color
            && reason != StopReason::MessageRemoved
            && let Ok(page) = self.page()
            && let Err(e) = self.widget.update_embed(page.color(color)).await
        {
            debug!(error = %e, "Failed to recolor finished paginator");
        }
        Ok(reason)
    }

    async fn register_navigation(self: &Arc<Self>) -> WidgetResult<()> {
        self.nav(NAV_BEGINNING, |p| p.goto(0)).await?;
        self.nav(NAV_LEFT, Self::previous_page).await?;
        self.nav(NAV_RIGHT, Self::next_page).await?;
        self.nav(NAV_END, |p| p.goto(p.len().saturating_sub(1))).await?;

        let this = Arc::downgrade(self);
        self.widget
            .handle(NAV_NUMBERS, move |_, reaction| {
                let this = this.clone();
                async move {
                    if let Some(this) = this.upgrade() {
                        this.ask_page(reaction).await;
                    }
                }
            })
            .await
    }

    async fn nav(
        self: &Arc<Self>,
        emoji: &str,
        step: fn(&Paginator) -> WidgetResult<()>,
    ) -> WidgetResult<()> {
        let this: Weak<Self> = Arc::downgrade(self);
        self.widget
            .handle(emoji, move |_, _| {
                let this = this.clone();
                async move {
                    let Some(this) = this.upgrade() else {
                        return;
                    };
                    if step(&this).is_ok()
                        && let Err(e) = this.update().await
                    {
                        debug!(error = %e, "Failed to show page");
                    }
                }
            })
            .await
    }

    async fn ask_page(&self, reaction: Reaction) {
        let reply = match self
            .widget
            .query_input(
                "enter the page number you would like to open",
                &reaction.user_id,
                PAGE_QUERY_TIMEOUT,
            )
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                debug!(error = %e, "No page number received");
                return;
            }
        };

        let Ok(number) = reply.content.trim().parse::<usize>() else {
            debug!(content = %reply.content, "Ignoring non-numeric page");
            return;
        };
        if number >= 1
            && self.goto(number - 1).is_ok()
            && let Err(e) = self.update().await
        {
            debug!(error = %e, "Failed to show page");
        }
    }
}

impl std::fmt::Debug for Paginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pages = self.pages.lock();
        f.debug_struct("Paginator")
            .field("pages", &pages.embeds.len())
            .field("index", &pages.index)
            .field("wrap", &pages.wrap)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinwheel_core::testing::{Call, MockSession};
    use pinwheel_core::{GatewayEvent, Message, Session, User};
    use tokio_test::{assert_err, assert_ok};

    fn pages(n: usize) -> Vec<Embed> {
        (1..=n)
            .map(|i| Embed::new().description(format!("page {i}")))
            .collect()
    }

    fn paginator(n: usize) -> (Arc<MockSession>, Arc<Paginator>) {
        let session = Arc::new(MockSession::new("bot"));
        let paginator = Paginator::new(session.clone(), "chan");
        paginator.add(pages(n));
        (session, paginator)
    }

    async fn wait_until(cond: impl Fn() -> bool) {
        for _ in 0..1000 {
            if cond() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    fn shown(session: &MockSession) -> Option<String> {
        session.calls().into_iter().rev().find_map(|c| match c {
            Call::EditEmbed { embed, .. } | Call::SendEmbed { embed, .. } => embed.description,
            _ => None,
        })
    }

    #[test]
    fn test_navigation_without_wrap() {
        let (_, p) = paginator(3);
        assert_err!(p.previous_page());
        assert_ok!(p.next_page());
        assert_ok!(p.next_page());
        assert_eq!(p.index(), 2);
        assert!(matches!(
            p.next_page(),
            Err(WidgetError::IndexOutOfBounds { index: 3, len: 3 })
        ));
        assert_eq!(p.index(), 2);
    }

    #[test]
    fn test_navigation_with_wrap() {
        let (_, p) = paginator(3);
        p.set_wrap(true);
        p.previous_page().unwrap();
        assert_eq!(p.index(), 2);
        p.next_page().unwrap();
        assert_eq!(p.index(), 0);
    }

    #[test]
    fn test_goto() {
        let (_, p) = paginator(2);
        p.goto(1).unwrap();
        assert_eq!(p.page().unwrap().description.as_deref(), Some("page 2"));
        assert!(matches!(
            p.goto(2),
            Err(WidgetError::IndexOutOfBounds { index: 2, len: 2 })
        ));
        assert_eq!(p.index(), 1);
    }

    #[test]
    fn test_page_footers() {
        let (_, p) = paginator(3);
        p.set_page_footers();
        p.goto(1).unwrap();
        assert_eq!(p.page().unwrap().footer.unwrap().text, "#[2 / 3]");
        assert_eq!(p.page().unwrap().description.as_deref(), Some("page 2"));
    }

    #[test]
    fn test_add_text() {
        let session = Arc::new(MockSession::new("bot"));
        let p = Paginator::new(session, "chan");
        p.add_text("abcdefg", 3);
        assert_eq!(p.len(), 3);
    }

    #[tokio::test]
    async fn test_spawn_without_pages() {
        let (session, p) = paginator(0);
        assert!(p.is_empty());
        assert!(matches!(assert_err!(p.spawn().await), WidgetError::NilEmbed));
        assert!(session.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_buttons_turn_pages() {
        let (session, p) = paginator(3);
        let task = tokio::spawn({
            let p = Arc::clone(&p);
            async move { p.spawn().await }
        });
        wait_until(|| session.events().handler_count() > 0).await;

        let added: Vec<String> = session
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::AddReaction { emoji, .. } => Some(emoji),
                _ => None,
            })
            .collect();
        assert_eq!(added, [NAV_BEGINNING, NAV_LEFT, NAV_RIGHT, NAV_END, NAV_NUMBERS]);
        assert_eq!(shown(&session).as_deref(), Some("page 1"));

        let message = p.widget().message().unwrap();
        let press = |emoji: &str| {
            let reaction = session.reaction(&message, "alice", emoji);
            session.events().publish(&GatewayEvent::ReactionAdd(reaction));
        };

        press(NAV_RIGHT);
        wait_until(|| shown(&session).as_deref() == Some("page 2")).await;
        press(NAV_END);
        wait_until(|| shown(&session).as_deref() == Some("page 3")).await;
        press(NAV_BEGINNING);
        wait_until(|| shown(&session).as_deref() == Some("page 1")).await;

        p.widget().wait_tasks().await;
        let edits = session.calls_matching(|c| matches!(c, Call::EditEmbed { .. }));
        press(NAV_LEFT);
        p.widget().wait_tasks().await;
        let after = session.calls_matching(|c| matches!(c, Call::EditEmbed { .. }));
        assert_eq!(edits.len(), after.len());

        p.widget().close().unwrap();
        assert_eq!(task.await.unwrap().unwrap(), StopReason::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_number_button_jumps_to_page() {
        let (session, p) = paginator(5);
        let task = tokio::spawn({
            let p = Arc::clone(&p);
            async move { p.spawn().await }
        });
        wait_until(|| session.events().handler_count() > 0).await;

        let message = p.widget().message().unwrap();
        let reaction = session.reaction(&message, "alice", NAV_NUMBERS);
        session.events().publish(&GatewayEvent::ReactionAdd(reaction));

        wait_until(|| {
            !session
                .calls_matching(|c| matches!(c, Call::SendMessage { .. }))
                .is_empty()
        })
        .await;
        session.events().publish(&GatewayEvent::MessageCreate(Message {
            id: "reply".to_string(),
            channel_id: "chan".to_string(),
            author: User::new("alice"),
            content: " 4 ".to_string(),
            ..Default::default()
        }));

        wait_until(|| p.index() == 3).await;
        wait_until(|| shown(&session).as_deref() == Some("page 4")).await;

        p.widget().close().unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_color_when_done() {
        let (session, p) = paginator(2);
        p.set_color_when_done(Some(0x808080));
        p.widget().update_options(|o| o.timeout_ms = Some(1_000));

        let reason = assert_ok!(p.spawn().await);
        assert_eq!(reason, StopReason::TimedOut);

        let last = session.calls().pop().unwrap();
        let Call::EditEmbed { embed, .. } = last else {
            panic!("Expected EditEmbed, got {last:?}");
        };
        assert_eq!(embed.color, Some(0x808080));
        assert_eq!(embed.description.as_deref(), Some("page 1"));
    }
}
