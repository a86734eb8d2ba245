//! Pinwheel Runtime - configuration and logging for Pinwheel applications.
//!
//! - [`config`]: layered loading of [`PinwheelConfig`] from files and
//!   `PINWHEEL_*` environment variables
//! - [`logging`]: `tracing-subscriber` setup driven by the `[logging]` section
//!
//! ```rust,ignore
//! use pinwheel_runtime::{ConfigLoader, logging};
//!
//! let config = ConfigLoader::new().load()?;
//! logging::init_from_config(&config.logging);
//!
//! let widget = Widget::builder(session, channel_id)
//!     .options(config.widget.clone())
//!     .build();
//! ```

pub mod config;
pub mod logging;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, LogFormat, LogLevel, LogOutput, LoggingConfig,
    PinwheelConfig,
};
pub use logging::{LoggingBuilder, SpanEvents, init_from_config};

// Re-export tracing for use by applications
pub use tracing;
pub use tracing_subscriber;

/// Logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
