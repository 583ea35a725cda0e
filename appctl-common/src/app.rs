//! The app configuration file (`shopify.app.toml`).
//!
//! Two shapes exist. Legacy files only carry scopes and directory lists;
//! current files describe the whole app (URLs, auth, webhooks, proxy, ...).
//! [`ConfigShape::detect`] picks the shape once from the raw TOML table and
//! the file is then deserialized strictly into that shape.

use crate::endpoint::{UrlPolicy, validate_url};
use crate::error::CommonError;
use crate::validation::{Issue, ValidationErrors, Validator, field, index};
use crate::webhooks::{SubscriptionRules, WebhooksConfig, validate_webhooks};
use serde::{Deserialize, Serialize};

const MAX_NAME_LENGTH: usize = 30;
const MAX_PREFERENCES_URL_LENGTH: usize = 255;

/// Keys that only exist in the current configuration shape.
const CURRENT_ONLY_KEYS: &[&str] = &["application_url", "embedded", "webhooks", "access_scopes", "auth"];

/// Legacy configuration: scopes and directory lists only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct LegacyAppConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub scopes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_directories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_directories: Option<Vec<String>>,
}

/// Current configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct CurrentAppConfiguration {
    /// App name, at most 30 characters.
    pub name: String,
    pub client_id: String,
    pub application_url: String,
    pub embedded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_scopes: Option<AccessScopes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<Auth>,
    pub webhooks: WebhooksConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_proxy: Option<AppProxy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<Pos>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_preferences: Option<AppPreferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_directories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_directories: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct AccessScopes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_legacy_install_flow: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct Auth {
    pub redirect_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct AppProxy {
    pub url: String,
    pub subpath: String,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct Pos {
    pub embedded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct AppPreferences {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct BuildOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatically_update_urls_on_dev: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_store_url: Option<String>,
}

/// Which configuration shape a file uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigShape {
    Legacy,
    Current,
}

impl ConfigShape {
    /// Decide the shape from the raw table.
    ///
    /// A file is current when it has any current-only key or a string
    /// `client_id` (legacy ids are integers).
    pub fn detect(table: &toml::Table) -> Self {
        let has_current_key = CURRENT_ONLY_KEYS.iter().any(|key| table.contains_key(*key));
        let string_client_id = matches!(table.get("client_id"), Some(toml::Value::String(_)));
        if has_current_key || string_client_id {
            ConfigShape::Current
        } else {
            ConfigShape::Legacy
        }
    }
}

/// A parsed app configuration in either shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppConfiguration {
    Legacy(LegacyAppConfiguration),
    Current(Box<CurrentAppConfiguration>),
}

/// Parse a configuration file's contents.
pub fn parse_app_configuration(source: &str) -> Result<AppConfiguration, CommonError> {
    let table: toml::Table = toml::from_str(source)?;
    let shape = ConfigShape::detect(&table);
    tracing::debug!(?shape, "detected app configuration shape");
    let value = toml::Value::Table(table);
    let config = match shape {
        ConfigShape::Legacy => AppConfiguration::Legacy(value.try_into()?),
        ConfigShape::Current => AppConfiguration::Current(Box::new(value.try_into()?)),
    };
    Ok(config)
}

impl AppConfiguration {
    pub fn shape(&self) -> ConfigShape {
        match self {
            AppConfiguration::Legacy(_) => ConfigShape::Legacy,
            AppConfiguration::Current(_) => ConfigShape::Current,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            AppConfiguration::Legacy(c) => c.name.as_deref(),
            AppConfiguration::Current(c) => Some(&c.name),
        }
    }

    /// The app's client id (API key), when the file declares one.
    pub fn client_id(&self) -> Option<String> {
        match self {
            AppConfiguration::Legacy(c) => c.client_id.map(|id| id.to_string()),
            AppConfiguration::Current(c) => Some(c.client_id.clone()),
        }
    }

    pub fn app_scopes(&self) -> &str {
        match self {
            AppConfiguration::Legacy(c) => &c.scopes,
            AppConfiguration::Current(c) => c
                .access_scopes
                .as_ref()
                .and_then(|s| s.scopes.as_deref())
                .unwrap_or(""),
        }
    }

    /// Scopes split on commas and trimmed.
    pub fn app_scopes_array(&self) -> Vec<String> {
        let scopes = self.app_scopes();
        if scopes.is_empty() {
            return Vec::new();
        }
        scopes.split(',').map(|s| s.trim().to_string()).collect()
    }

    pub fn uses_legacy_scopes_behavior(&self) -> bool {
        match self {
            AppConfiguration::Legacy(_) => true,
            AppConfiguration::Current(c) => c
                .access_scopes
                .as_ref()
                .and_then(|s| s.use_legacy_install_flow)
                .unwrap_or(false),
        }
    }

    pub fn webhooks(&self) -> Option<&WebhooksConfig> {
        match self {
            AppConfiguration::Legacy(_) => None,
            AppConfiguration::Current(c) => Some(&c.webhooks),
        }
    }

    pub fn extension_directories(&self) -> Option<&[String]> {
        match self {
            AppConfiguration::Legacy(c) => c.extension_directories.as_deref(),
            AppConfiguration::Current(c) => c.extension_directories.as_deref(),
        }
    }

    pub fn web_directories(&self) -> Option<&[String]> {
        match self {
            AppConfiguration::Legacy(c) => c.web_directories.as_deref(),
            AppConfiguration::Current(c) => c.web_directories.as_deref(),
        }
    }
}

fn check_url(path: &str, value: &str, policy: UrlPolicy) -> Option<Issue> {
    validate_url(value, policy)
        .err()
        .map(|message| Issue::new(path, message))
}

fn check_name(config: &CurrentAppConfiguration) -> Option<Issue> {
    (config.name.chars().count() > MAX_NAME_LENGTH).then(|| {
        Issue::new(
            "name",
            format!("name must be at most {MAX_NAME_LENGTH} characters"),
        )
    })
}

fn check_redirect_urls(config: &CurrentAppConfiguration) -> Vec<Issue> {
    let Some(auth) = &config.auth else {
        return Vec::new();
    };
    auth.redirect_urls
        .iter()
        .enumerate()
        .filter_map(|(i, url)| {
            check_url(&index("auth.redirect_urls", i), url, UrlPolicy::HttpOrHttps)
        })
        .collect()
}

fn check_app_preferences(config: &CurrentAppConfiguration) -> Option<Issue> {
    let prefs = config.app_preferences.as_ref()?;
    let path = field("app_preferences", "url");
    if prefs.url.chars().count() > MAX_PREFERENCES_URL_LENGTH {
        return Some(Issue::new(
            path,
            format!("url must be at most {MAX_PREFERENCES_URL_LENGTH} characters"),
        ));
    }
    check_url(&path, &prefs.url, UrlPolicy::HttpOrHttps)
}

/// Validate a parsed configuration.
///
/// Legacy files have no format constraints beyond their types.
pub fn validate_app_configuration(
    config: &AppConfiguration,
    rules: SubscriptionRules,
) -> Result<(), ValidationErrors> {
    let AppConfiguration::Current(current) = config else {
        return Ok(());
    };

    Validator::new()
        .check_one(check_name)
        .check_one(|c: &CurrentAppConfiguration| {
            check_url("application_url", &c.application_url, UrlPolicy::HttpOrHttps)
        })
        .check(check_redirect_urls)
        .check(|c: &CurrentAppConfiguration| validate_webhooks(&c.webhooks, rules))
        .check_one(|c: &CurrentAppConfiguration| {
            c.app_proxy
                .as_ref()
                .and_then(|proxy| check_url("app_proxy.url", &proxy.url, UrlPolicy::HttpsOnly))
        })
        .check_one(check_app_preferences)
        .validate(current.as_ref())
}
