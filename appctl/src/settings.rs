//! User settings: Partners endpoint, API token and validation strictness.
//!
//! Resolved from, highest first: CLI flags, environment variables, then the
//! optional user file `~/.config/appctl/config.json`.

use anyhow::{Context, Result};
use appctl_common::SubscriptionRules;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PARTNERS_URL: &str = "https://partners.shopify.com";

pub const ENV_PARTNERS_URL: &str = "APPCTL_PARTNERS_URL";
pub const ENV_TOKEN: &str = "APPCTL_TOKEN";
pub const ENV_STRICT_WEBHOOKS: &str = "APPCTL_STRICT_WEBHOOKS";

/// Contents of the user settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partners_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_webhooks: Option<bool>,
}

impl UserConfig {
    /// Location of the user settings file.
    pub fn path() -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.config_dir().join("appctl").join("config.json"))
    }

    pub fn load() -> Result<Self> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))
    }
}

/// Settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub strict_webhooks: bool,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub partners_url: String,
    pub token: Option<String>,
    pub subscription_rules: SubscriptionRules,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            partners_url: DEFAULT_PARTNERS_URL.to_string(),
            token: None,
            subscription_rules: SubscriptionRules::Disabled,
        }
    }
}

impl Settings {
    pub fn load(overrides: &SettingsOverrides) -> Result<Self> {
        let file = UserConfig::load()?;
        Ok(Self::resolve(overrides, |key| std::env::var(key).ok(), file))
    }

    pub fn resolve(
        overrides: &SettingsOverrides,
        env: impl Fn(&str) -> Option<String>,
        file: UserConfig,
    ) -> Self {
        let partners_url = env(ENV_PARTNERS_URL)
            .or(file.partners_url)
            .unwrap_or_else(|| DEFAULT_PARTNERS_URL.to_string());
        let token = env(ENV_TOKEN).or(file.token).filter(|t| !t.is_empty());
        let strict = overrides.strict_webhooks
            || env(ENV_STRICT_WEBHOOKS)
                .map(|v| is_truthy(&v))
                .or(file.strict_webhooks)
                .unwrap_or(false);

        Self {
            partners_url: partners_url.trim_end_matches('/').to_string(),
            token,
            subscription_rules: if strict {
                SubscriptionRules::Enforced
            } else {
                SubscriptionRules::Disabled
            },
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let settings = Settings::resolve(&SettingsOverrides::default(), env_of(&[]), UserConfig::default());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn env_wins_over_file() {
        let file = UserConfig {
            partners_url: Some("https://file.example".into()),
            token: Some("file-token".into()),
            strict_webhooks: Some(true),
        };
        let settings = Settings::resolve(
            &SettingsOverrides::default(),
            env_of(&[
                (ENV_PARTNERS_URL, "https://env.example/"),
                (ENV_TOKEN, "env-token"),
                (ENV_STRICT_WEBHOOKS, "0"),
            ]),
            file,
        );
        assert_eq!(settings.partners_url, "https://env.example");
        assert_eq!(settings.token.as_deref(), Some("env-token"));
        assert_eq!(settings.subscription_rules, SubscriptionRules::Disabled);
    }

    #[test]
    fn flag_enforces_subscription_rules() {
        let settings = Settings::resolve(
            &SettingsOverrides {
                strict_webhooks: true,
            },
            env_of(&[(ENV_STRICT_WEBHOOKS, "false")]),
            UserConfig::default(),
        );
        assert_eq!(settings.subscription_rules, SubscriptionRules::Enforced);
    }

    #[test]
    fn file_settings_apply_without_env() {
        let file = UserConfig {
            strict_webhooks: Some(true),
            ..UserConfig::default()
        };
        let settings = Settings::resolve(&SettingsOverrides::default(), env_of(&[]), file);
        assert_eq!(settings.subscription_rules, SubscriptionRules::Enforced);
    }

    #[test]
    fn empty_token_is_no_token() {
        let settings = Settings::resolve(
            &SettingsOverrides::default(),
            env_of(&[(ENV_TOKEN, "")]),
            UserConfig::default(),
        );
        assert!(settings.token.is_none());
    }

    #[test]
    fn load_from_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = UserConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, UserConfig::default());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"token": "t", "strict_webhooks": true}"#).unwrap();
        let config = UserConfig::load_from(&path).unwrap();
        assert_eq!(config.token.as_deref(), Some("t"));
        assert_eq!(config.strict_webhooks, Some(true));
    }
}
