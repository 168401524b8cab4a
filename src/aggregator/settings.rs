//! Handler settings

use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum_macros::{Display, EnumString};

/// What happens to a group that expires before it is released
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ExpiryAction {
    /// Drop the partial group, forwarding its messages to the discard channel if any
    #[default]
    Discard,
    /// Run the partial group through the processor as if it were complete
    ForceComplete,
}

/// Serializable handler configuration, the `[handler]` table of the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandlerSettings {
    /// Give up waiting for a busy group after this many milliseconds
    pub lock_timeout_ms: Option<u64>,
    pub expiry_action: ExpiryAction,
}

impl HandlerSettings {
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_expiry_action_names() {
        assert_eq!(ExpiryAction::default(), ExpiryAction::Discard);
        assert_eq!(ExpiryAction::ForceComplete.to_string(), "force-complete");
        assert_eq!(
            ExpiryAction::from_str("force-complete").unwrap(),
            ExpiryAction::ForceComplete
        );
        assert!(ExpiryAction::from_str("complete").is_err());
    }

    #[test]
    fn test_settings_from_toml() {
        let settings: HandlerSettings = toml::from_str(
            r#"
            lock_timeout_ms = 250
            expiry_action = "force-complete"
            "#,
        )
        .unwrap();
        assert_eq!(settings.lock_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(settings.expiry_action, ExpiryAction::ForceComplete);

        let settings: HandlerSettings = toml::from_str("").unwrap();
        assert_eq!(settings, HandlerSettings::default());
        assert_eq!(settings.lock_timeout(), None);

        assert!(toml::from_str::<HandlerSettings>("lock_timeout = 5").is_err());
    }
}
