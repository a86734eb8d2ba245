//! Configuration for Pinwheel applications.
//!
//! Loads [`PinwheelConfig`] from TOML/YAML files and `PINWHEEL_*`
//! environment variables, then validates it.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, PinwheelConfig, SpanEventConfig,
};
pub use validation::{validate_config, validate_widget_options};
