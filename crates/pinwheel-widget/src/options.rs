//! Widget behavior options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default delay before a clicked reaction is removed again.
pub const DEFAULT_REACTION_RESET_DELAY_MS: u64 = 250;

/// Behavior flags shared by all widget kinds.
///
/// Deserializable so it can be loaded from the `[widget]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetOptions {
    /// How long the listen loop runs, in milliseconds. `None` runs until closed.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Remove a user's reaction after it was handled, resetting the button.
    #[serde(default = "default_true")]
    pub delete_reactions: bool,

    /// Delete the message when the listen loop times out.
    #[serde(default)]
    pub delete_on_timeout: bool,

    /// Delay before a handled reaction is removed, in milliseconds.
    #[serde(default = "default_reaction_reset_delay_ms")]
    pub reaction_reset_delay_ms: u64,

    /// Users allowed to press buttons. Empty allows everyone.
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            delete_reactions: true,
            delete_on_timeout: false,
            reaction_reset_delay_ms: DEFAULT_REACTION_RESET_DELAY_MS,
            allowed_users: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_reaction_reset_delay_ms() -> u64 {
    DEFAULT_REACTION_RESET_DELAY_MS
}

impl WidgetOptions {
    /// Listen loop timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Delay before a handled reaction is removed.
    pub fn reaction_reset_delay(&self) -> Duration {
        Duration::from_millis(self.reaction_reset_delay_ms)
    }

    /// Returns `true` if `user_id` may press buttons.
    pub fn is_user_allowed(&self, user_id: &str) -> bool {
        self.allowed_users.is_empty() || self.allowed_users.iter().any(|u| u == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = WidgetOptions::default();
        assert!(options.delete_reactions);
        assert!(!options.delete_on_timeout);
        assert_eq!(options.timeout(), None);
        assert_eq!(options.reaction_reset_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_empty_allow_list_permits_everyone() {
        let mut options = WidgetOptions::default();
        assert!(options.is_user_allowed("anyone"));

        options.allowed_users = vec!["alice".to_string()];
        assert!(options.is_user_allowed("alice"));
        assert!(!options.is_user_allowed("bob"));
    }

    #[test]
    fn test_deserialize_partial() {
        let options: WidgetOptions =
            serde_json::from_str(r#"{"timeout_ms": 30000, "delete_on_timeout": true}"#).unwrap();
        assert_eq!(options.timeout(), Some(Duration::from_secs(30)));
        assert!(options.delete_on_timeout);
        assert!(options.delete_reactions);
        assert_eq!(options.reaction_reset_delay_ms, 250);
    }
}
