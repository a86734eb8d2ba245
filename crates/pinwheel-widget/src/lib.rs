//! # Pinwheel Widget
//!
//! Interactive message embeds driven by reactions.
//!
//! - [`Widget`]: an embed whose reactions act as buttons
//! - [`Paginator`]: a widget flipping through a list of pages
//! - [`embeds_from_text`]: splits long text into page-sized embeds
//! - [`bridge`]: awaitable channels over the session's event hub
//!
//! ## Lifecycle
//!
//! ```text
//! spawn ──▶ send embed ──▶ add buttons ──▶ listen ──┬─▶ Closed
//! hook  ──▶ fetch message ───────────────▶ listen ──┼─▶ TimedOut
//!                                                   └─▶ MessageRemoved
//! ```
//!
//! Handlers run on their own tasks, so a slow handler never blocks the
//! listen loop. Reactions are reset after a short delay when
//! `delete_reactions` is enabled.

pub mod bridge;
pub mod chunk;
pub mod error;
pub mod options;
pub mod paginator;
pub mod widget;

pub use chunk::{DEFAULT_CHUNK_LEN, embeds_from_text};
pub use error::{WidgetError, WidgetResult};
pub use options::WidgetOptions;
pub use paginator::Paginator;
pub use widget::{StopReason, Widget, WidgetBuilder, WidgetHandler, into_handler};
