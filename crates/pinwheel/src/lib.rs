//! # Pinwheel
//!
//! Interactive, reaction-driven embed widgets for chat bots.
//!
//! ## Overview
//!
//! A widget is a message embed whose reactions act as buttons. Register an
//! async handler per emoji, spawn the widget into a channel (or hook it onto
//! an existing message) and Pinwheel dispatches every click to its handler
//! until the widget is closed or times out.
//!
//! ```text
//! ┌──────────────┐ publish ┌──────────┐  reactions  ┌────────┐ handler tasks
//! │ Gateway feed │────────▶│ EventHub │────────────▶│ Widget │──────────────▶
//! └──────────────┘         └──────────┘             └───┬────┘
//!                                                      │ send / edit / react
//!                                                 ┌────▼────┐
//!                                                 │ Session │
//!                                                 └─────────┘
//! ```
//!
//! - **Core** ([`core`]): data model, gateway events, event hub, `Session` trait
//! - **Widget** ([`widget`]): widgets, paginator, text chunking
//! - **Runtime** ([`runtime`]): configuration and logging
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pinwheel::prelude::*;
//!
//! async fn poll(session: BoxedSession, channel_id: &str) -> WidgetResult<()> {
//!     let widget = Widget::builder(session, channel_id)
//!         .embed(Embed::new().title("Lunch?").description("React to vote"))
//!         .timeout(std::time::Duration::from_secs(300))
//!         .build();
//!
//!     widget
//!         .handle("🍕", |w, r| async move {
//!             let embed = Embed::new().description(format!("<@{}> wants pizza", r.user_id));
//!             w.update_embed(embed).await.ok();
//!         })
//!         .await?;
//!
//!     widget.spawn().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` (default): TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output
//! - `testing`: `MockSession`, an in-memory session for tests

pub use pinwheel_core as core;
pub use pinwheel_runtime as runtime;
pub use pinwheel_widget as widget;

/// Commonly used types.
///
/// ```rust,ignore
/// use pinwheel::prelude::*;
/// ```
pub mod prelude {
    // Platform model and client
    pub use pinwheel_core::{
        BoxedSession, Embed, Emoji, EventHub, EventKind, GatewayEvent, Message, Reaction,
        Session, User,
    };

    // Widgets
    pub use pinwheel_widget::{
        Paginator, StopReason, Widget, WidgetError, WidgetOptions, WidgetResult, embeds_from_text,
    };

    // Configuration and logging
    pub use pinwheel_runtime::{ConfigLoader, PinwheelConfig, init_from_config};
}
