//! Configuration validation utilities.

use pinwheel_widget::WidgetOptions;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, PinwheelConfig};

/// Upper bound for `widget.reaction_reset_delay_ms`.
pub const MAX_REACTION_RESET_DELAY_MS: u64 = 60_000;

/// Validates the entire configuration.
pub fn validate_config(config: &PinwheelConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_widget_options(&config.widget)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }

    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid log filter module name: {module:?}"
        )));
    }

    Ok(())
}

/// Validates widget options, e.g. ones built in code before passing them on.
pub fn validate_widget_options(options: &WidgetOptions) -> ConfigResult<()> {
    if options.timeout_ms == Some(0) {
        return Err(ConfigError::validation(
            "widget.timeout_ms must be greater than 0; omit it to run until closed",
        ));
    }

    if options.reaction_reset_delay_ms > MAX_REACTION_RESET_DELAY_MS {
        return Err(ConfigError::validation(format!(
            "widget.reaction_reset_delay_ms must be at most {MAX_REACTION_RESET_DELAY_MS}"
        )));
    }

    if options.allowed_users.iter().any(|u| u.is_empty()) {
        return Err(ConfigError::validation(
            "widget.allowed_users cannot contain empty ids",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&PinwheelConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = PinwheelConfig::default();
        config.widget.timeout_ms = Some(0);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_reset_delay_ceiling() {
        let mut options = WidgetOptions::default();
        options.reaction_reset_delay_ms = MAX_REACTION_RESET_DELAY_MS;
        assert!(validate_widget_options(&options).is_ok());

        options.reaction_reset_delay_ms += 1;
        assert!(validate_widget_options(&options).is_err());
    }

    #[test]
    fn test_validate_file_output_needs_path() {
        let mut config = PinwheelConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some(PathBuf::from("logs/pinwheel.log"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_allowed_user() {
        let mut config = PinwheelConfig::default();
        config.widget.allowed_users = vec!["alice".to_string(), String::new()];
        assert!(validate_config(&config).is_err());
    }
}
