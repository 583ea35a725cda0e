//! Web process configuration (`shopify.web.toml`).

use crate::error::CommonError;
use crate::preprocess::{deserialize_slash_path, ensure_path_starts_with_slash};
use crate::validation::{Issue, ValidationErrors};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const MAX_PORT: u32 = 65536;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum WebType {
    #[default]
    Frontend,
    Backend,
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(untagged)]
pub enum AuthCallbackPath {
    Single(String),
    Multiple(Vec<String>),
}

impl AuthCallbackPath {
    fn with_leading_slashes(self) -> Self {
        match self {
            AuthCallbackPath::Single(p) => {
                AuthCallbackPath::Single(ensure_path_starts_with_slash(&p).into_owned())
            }
            AuthCallbackPath::Multiple(paths) => AuthCallbackPath::Multiple(
                paths
                    .iter()
                    .map(|p| ensure_path_starts_with_slash(p).into_owned())
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct WebCommands {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    pub dev: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct HmrServer {
    pub http_paths: Vec<String>,
}

/// A web configuration as written on disk.
///
/// Declares its roles either as a `roles` list or as a single `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct WebConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_callback_path: Option<AuthCallbackPath>,
    #[serde(
        default,
        deserialize_with = "deserialize_slash_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub webhooks_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
    pub commands: WebCommands,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmr_server: Option<HmrServer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<WebType>>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub web_type: Option<WebType>,
}

/// A web configuration with roles resolved and paths normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedWebConfiguration {
    pub auth_callback_path: Option<AuthCallbackPath>,
    pub webhooks_path: Option<String>,
    pub port: Option<u32>,
    pub commands: WebCommands,
    pub name: Option<String>,
    pub hmr_server: Option<HmrServer>,
    pub roles: Vec<WebType>,
}

impl WebConfiguration {
    pub fn parse(source: &str) -> Result<Self, CommonError> {
        Ok(toml::from_str(source)?)
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self.port {
            Some(port) if port > MAX_PORT => Err(ValidationErrors::new(vec![Issue::new(
                "port",
                format!("port must be between 0 and {MAX_PORT}"),
            )])),
            _ => Ok(()),
        }
    }

    /// Resolve roles: an explicit `roles` list wins over `type`, which
    /// defaults to frontend.
    pub fn process(self) -> ProcessedWebConfiguration {
        let roles = match self.roles {
            Some(roles) => roles,
            None => vec![self.web_type.unwrap_or_default()],
        };
        ProcessedWebConfiguration {
            auth_callback_path: self.auth_callback_path.map(AuthCallbackPath::with_leading_slashes),
            webhooks_path: self.webhooks_path,
            port: self.port,
            commands: self.commands,
            name: self.name,
            hmr_server: self.hmr_server,
            roles,
        }
    }
}

/// A web process of the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Web {
    pub directory: PathBuf,
    pub configuration: ProcessedWebConfiguration,
}

impl Web {
    pub fn has_role(&self, role: WebType) -> bool {
        self.configuration.roles.contains(&role)
    }
}

/// An app can be launched when it has a frontend or backend web.
pub fn app_is_launchable(webs: &[Web]) -> bool {
    webs.iter()
        .any(|web| web.has_role(WebType::Frontend) || web.has_role(WebType::Backend))
}
