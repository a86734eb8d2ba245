//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config`: enables TOML files (`pinwheel.toml`, `config.toml`)
//! - `yaml-config`: enables YAML files (`pinwheel.yaml`, `pinwheel.yml`)
//!
//! With neither feature enabled only defaults, environment variables and
//! programmatic merges are used.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic merges ([`ConfigLoader::merge`])
//! 3. Profile-specific file (`pinwheel.{profile}.toml`)
//! 4. Main file (`pinwheel.toml`)
//! 5. Environment variables (`PINWHEEL_*`)
//!
//! Files are searched in the current directory, then in `pinwheel/` under the
//! user config directory. The first directory holding a main file wins.
//!
//! # Environment Variable Mapping
//!
//! Variables use the `PINWHEEL_` prefix with `__` separating nested keys:
//!
//! - `PINWHEEL_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `PINWHEEL_WIDGET__TIMEOUT_MS=60000` → `widget.timeout_ms = 60000`
//!
//! # Example
//!
//! ```rust,ignore
//! use pinwheel_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .load()?;
//!
//! let widget = Widget::builder(session, channel_id)
//!     .options(config.widget.clone())
//!     .build();
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::PinwheelConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "PINWHEEL_";
const PROFILE_VAR: &str = "PINWHEEL_PROFILE";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name, accepting `dev` and `prod` shorthands.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `PINWHEEL_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    ///
    /// Once any path is added the default locations are no longer searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges configuration built in code on top of the defaults.
    ///
    /// Config files and environment variables still override it.
    pub fn merge(mut self, config: PinwheelConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and validates the configuration.
    pub fn load(self) -> ConfigResult<PinwheelConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: PinwheelConfig = figment.extract()?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(PinwheelConfig::default()));
        figment = figment.merge(std::mem::take(&mut self.figment));

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = merge_config_file(figment, path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(figment)
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("pinwheel"));
        }
        paths
    }

    /// Searches `search_paths × base_names`. A profile-specific variant is
    /// merged before its base file; the first base file found ends the search.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
    ) -> (Figment, bool) {
        for search_path in search_paths {
            for base_name in base_names {
                let Some((stem, ext)) = base_name.rsplit_once('.') else {
                    continue;
                };

                let profile_path =
                    search_path.join(format!("{stem}.{}.{ext}", self.profile.as_str()));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_known_format(figment, &profile_path, ext);
                }

                let base_path = search_path.join(base_name);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    return (merge_known_format(figment, &base_path, ext), true);
                }
            }
        }
        (figment, false)
    }

    fn load_config_files(&self, figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        #[allow(unused_mut)]
        let mut figment = figment;
        #[allow(unused_mut)]
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) =
                self.load_format_files(figment, &search_paths, &["pinwheel.toml", "config.toml"]);
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["pinwheel.yaml", "pinwheel.yml", "config.yaml", "config.yml"],
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!(paths = ?search_paths, "No configuration file found, using defaults");
        }
        figment
    }
}

/// Merges one file, dispatching on its extension.
fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file_exact(path))),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Ok(figment.merge(Yaml::file_exact(path))),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
fn merge_known_format(figment: Figment, path: &Path, ext: &str) -> Figment {
    match ext {
        #[cfg(feature = "toml-config")]
        "toml" => figment.merge(Toml::file_exact(path)),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => figment.merge(Yaml::file_exact(path)),
        _ => figment,
    }
}

/// Loads the configuration from the default locations.
pub fn load_config() -> ConfigResult<PinwheelConfig> {
    ConfigLoader::new().load()
}

/// Loads the configuration from `path`, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<PinwheelConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;

    /// A fresh directory under the system temp dir.
    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pinwheel-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults_without_files() {
        let dir = scratch_dir("empty");
        let config = ConfigLoader::new()
            .search_path(&dir)
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config, PinwheelConfig::default());
        assert_eq!(config.logging.level.as_str(), "info");
    }

    #[test]
    fn test_programmatic_merge() {
        let mut overrides = PinwheelConfig::default();
        overrides.logging.level = LogLevel::Debug;
        overrides.widget.timeout_ms = Some(1500);

        let config = ConfigLoader::new()
            .search_path(scratch_dir("merge"))
            .without_env()
            .merge(overrides)
            .load()
            .unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.widget.timeout_ms, Some(1500));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_files_override_programmatic_merge() {
        let dir = scratch_dir("merge-under-file");
        std::fs::write(dir.join("pinwheel.toml"), "[logging]\nlevel = \"warn\"\n").unwrap();

        let mut overrides = PinwheelConfig::default();
        overrides.logging.level = LogLevel::Debug;
        overrides.widget.timeout_ms = Some(1500);

        let config = ConfigLoader::new()
            .search_path(&dir)
            .without_env()
            .merge(overrides)
            .load()
            .unwrap();
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(config.widget.timeout_ms, Some(1500));
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = ConfigLoader::new()
            .file("/definitely/not/here/pinwheel.toml")
            .without_env()
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = scratch_dir("ext");
        let path = dir.join("pinwheel.ini");
        std::fs::write(&path, "level = debug").unwrap();

        let result = ConfigLoader::new().file(&path).without_env().load();
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"));
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("prod"), Profile::Production);
        assert_eq!(Profile::parse("DEV"), Profile::Development);
        assert_eq!(Profile::parse("staging"), Profile::Custom("staging".to_string()));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_toml_file_with_profile() {
        let dir = scratch_dir("toml");
        std::fs::write(
            dir.join("pinwheel.toml"),
            "[logging]\nlevel = \"warn\"\n\n[widget]\ndelete_on_timeout = true\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("pinwheel.staging.toml"),
            "[widget]\ntimeout_ms = 30000\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .search_path(&dir)
            .profile("staging")
            .without_env()
            .load()
            .unwrap();
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert!(config.widget.delete_on_timeout);
        assert_eq!(config.widget.timeout_ms, Some(30000));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = scratch_dir("invalid");
        let path = dir.join("pinwheel.toml");
        std::fs::write(&path, "[widget]\ntimeout_ms = 0\n").unwrap();

        let result = ConfigLoader::new().file(&path).without_env().load();
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_env_overrides() {
        // SAFETY: no other test reads or writes this variable
        unsafe {
            std::env::set_var("PINWHEEL_WIDGET__REACTION_RESET_DELAY_MS", "750");
        }
        let config = ConfigLoader::new()
            .search_path(scratch_dir("env"))
            .load()
            .unwrap();
        unsafe {
            std::env::remove_var("PINWHEEL_WIDGET__REACTION_RESET_DELAY_MS");
        }
        assert_eq!(config.widget.reaction_reset_delay_ms, 750);
    }
}
